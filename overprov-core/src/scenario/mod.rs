//! Oversized-claim scenario
//!
//! Probes the Ceph cluster's raw capacity, requests a claim larger than it,
//! mounts the claim in a pod and checks the size the pod sees. Whatever the
//! run manages to create is torn down before `run` returns.

pub mod context;
pub mod error;
pub mod teardown;
pub mod verify;

use chrono::{DateTime, Utc};
use overprov_common::{InterfaceType, ScenarioState, SizeTolerance};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

use crate::ceph;
use crate::cluster::ClusterOps;
use crate::config::OverprovConfig;
use crate::kubernetes::error::K8sError;
use crate::kubernetes::types::PodExecRequest;
use crate::kubernetes::wait::WaitOptions;
use crate::provision::{oversized_request_gb, ProvisionPlan};

pub use context::ScenarioContext;
pub use error::{ScenarioError, ScenarioResult};

/// Settings for one run
#[derive(Debug, Clone)]
pub struct ScenarioOptions {
    pub namespace: String,
    pub interface: InterfaceType,
    /// Block pool (RBD) or filesystem name (CephFS)
    pub interface_name: String,
    pub data_pool: Option<String>,
    pub margin_gb: u64,
    pub pvc_base_name: String,
    pub name_prefix: String,
    pub access_mode: String,
    pub wait_for_bound: bool,
    pub mount_path: String,
    pub tolerance: SizeTolerance,
    pub pod_template: Option<PathBuf>,
    pub pod_wait: WaitOptions,
    pub bound_wait: WaitOptions,
    pub delete_wait: WaitOptions,
}

impl Default for ScenarioOptions {
    fn default() -> Self {
        let config = OverprovConfig::default();
        Self::from_config_unchecked(&config)
    }
}

impl ScenarioOptions {
    /// Options from a validated configuration
    pub fn from_config(config: &OverprovConfig) -> ScenarioResult<Self> {
        config.validate()?;
        Ok(Self::from_config_unchecked(config))
    }

    fn from_config_unchecked(config: &OverprovConfig) -> Self {
        let t = &config.timeouts;
        Self {
            namespace: config.cluster.namespace.clone(),
            interface: config.storage.interface,
            interface_name: config.storage.interface_name.clone(),
            data_pool: config.storage.data_pool.clone(),
            margin_gb: config.storage.margin_gb,
            pvc_base_name: config.storage.pvc_base_name.clone(),
            name_prefix: config.storage.name_prefix.clone(),
            access_mode: config.storage.access_mode.clone(),
            wait_for_bound: config.storage.wait_for_bound,
            mount_path: config.verify.mount_path.clone(),
            tolerance: config.verify.tolerance(),
            pod_template: config.templates.pod.clone(),
            pod_wait: WaitOptions::new(
                Duration::from_secs(t.pod_running_secs),
                Duration::from_secs(t.pod_poll_secs),
            ),
            bound_wait: WaitOptions::new(
                Duration::from_secs(t.pvc_bound_secs),
                Duration::from_secs(t.pod_poll_secs),
            ),
            delete_wait: WaitOptions::new(
                Duration::from_secs(t.delete_secs),
                Duration::from_secs(t.delete_poll_secs),
            ),
        }
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub namespace: String,
    pub interface: InterfaceType,
    pub capacity_bytes: u64,
    pub capacity_gb: u64,
    pub pvc_size: String,
    pub observed_gb: f64,
    pub lower_bound_gb: f64,
    pub upper_bound_gb: f64,
    pub secret: String,
    pub storage_class: String,
    pub pvc: String,
    pub pod: String,
    pub final_state: ScenarioState,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Names of everything a run created, captured before teardown clears them
#[derive(Debug, Default)]
struct CreatedNames {
    secret: String,
    storage_class: String,
    pvc: String,
    pod: String,
}

impl CreatedNames {
    fn from_context(ctx: &ScenarioContext) -> Self {
        let name = |h: &Option<crate::kubernetes::types::ResourceHandle>| {
            h.as_ref().map(|h| h.name.clone()).unwrap_or_default()
        };
        Self {
            secret: name(&ctx.secret),
            storage_class: name(&ctx.storage_class),
            pvc: name(&ctx.pvc),
            pod: name(&ctx.pod),
        }
    }
}

/// A single oversized-claim run against `ops`
pub struct Scenario<'a, O: ClusterOps + ?Sized> {
    ops: &'a O,
    options: ScenarioOptions,
}

impl<'a, O: ClusterOps + ?Sized> Scenario<'a, O> {
    pub fn new(ops: &'a O, options: ScenarioOptions) -> Self {
        Self { ops, options }
    }

    pub fn options(&self) -> &ScenarioOptions {
        &self.options
    }

    /// Execute the run and tear down whatever it created
    ///
    /// If both the run and teardown fail, the run's error is returned and the
    /// teardown error is logged.
    pub async fn run(&self) -> ScenarioResult<ScenarioReport> {
        let mut ctx = ScenarioContext::new();
        self.run_with_context(&mut ctx).await
    }

    /// Like `run`, leaving the final context for inspection
    pub async fn run_with_context(&self, ctx: &mut ScenarioContext) -> ScenarioResult<ScenarioReport> {
        let started_at = Utc::now();

        let body = self.execute(ctx).await;
        let names = CreatedNames::from_context(ctx);

        ctx.advance(ScenarioState::TearingDown);
        let cleanup = teardown::teardown(self.ops, ctx, &self.options).await;
        if cleanup.is_ok() {
            ctx.advance(ScenarioState::TornDown);
        }

        match (body, cleanup) {
            (Ok(()), Ok(())) => {
                let report = self.report(ctx, names, started_at);
                info!(
                    pvc_size = %report.pvc_size,
                    observed_gb = report.observed_gb,
                    "Oversized claim check passed"
                );
                Ok(report)
            }
            (Ok(()), Err(e)) => {
                error!(error = %e, "Teardown failed");
                Err(e)
            }
            (Err(e), Ok(())) => {
                error!(error = %e, state = %ctx.state(), "Run failed");
                Err(e)
            }
            (Err(e), Err(cleanup_err)) => {
                error!(error = %e, state = %ctx.state(), "Run failed");
                error!(error = %cleanup_err, "Teardown also failed; resources may remain");
                Err(e)
            }
        }
    }

    async fn execute(&self, ctx: &mut ScenarioContext) -> ScenarioResult<()> {
        let ops = self.ops;
        let options = &self.options;

        // Probe before creating anything
        let capacity = ceph::probe_capacity(ops).await?;
        ctx.capacity = Some(capacity);

        let requested_gb = oversized_request_gb(capacity.total_gb, options.margin_gb);
        let admin_key = ceph::admin_key(ops).await?;
        let plan = ProvisionPlan::build(options, requested_gb, &admin_key)?;
        ctx.pvc_size = Some(plan.pvc_size.clone());

        info!(
            capacity_gb = capacity.total_gb,
            pvc_size = %plan.pvc_size,
            interface = %options.interface,
            "Requesting claim larger than the cluster"
        );

        // Setup
        ctx.secret = Some(ops.create_secret(&plan.secret).await?);
        ctx.storage_class = Some(ops.create_storage_class(&plan.storage_class).await?);
        ctx.advance(ScenarioState::ResourcesCreated);

        // Oversized claim
        let pvc = ops.create_pvc(&plan.pvc).await?;
        ctx.pvc = Some(pvc.clone());
        ctx.advance(ScenarioState::PvcCreated);

        if options.wait_for_bound {
            ops.wait_for_pvc_bound(&pvc, &options.bound_wait).await?;
        }

        // Workload
        let pod = ops.create_pod(&plan.pod).await?;
        ctx.pod = Some(pod.clone());
        ctx.advance(ScenarioState::PodCreated);
        ops.wait_for_pod_running(&pod, &options.pod_wait).await?;

        // Verification
        let output = ops
            .exec_on_pod(&pod, &PodExecRequest::new(verify::df_command(&options.mount_path)))
            .await?;
        if !output.is_success() {
            return Err(K8sError::ExecError(format!(
                "df exited with {}: {}",
                output.exit_code,
                output.stderr.trim()
            ))
            .into());
        }

        let observed_gb = verify::parse_df_size(&output.stdout)?;
        ctx.observed_gb = Some(observed_gb);
        info!(requested_gb, observed_gb, "Mounted size");

        verify::check_size(requested_gb, observed_gb, &options.tolerance)?;
        ctx.advance(ScenarioState::Verified);

        Ok(())
    }

    fn report(&self, ctx: &ScenarioContext, names: CreatedNames, started_at: DateTime<Utc>) -> ScenarioReport {
        let capacity = ctx.capacity.unwrap_or(ceph::CapacityReport::from_bytes(0));
        let pvc_size = ctx.pvc_size.clone().unwrap_or_default();
        let (lower, upper) = self
            .options
            .tolerance
            .bounds(pvc_size.parse().unwrap_or_default());

        ScenarioReport {
            namespace: self.options.namespace.clone(),
            interface: self.options.interface,
            capacity_bytes: capacity.bytes_total,
            capacity_gb: capacity.total_gb,
            pvc_size,
            observed_gb: ctx.observed_gb.unwrap_or_default(),
            lower_bound_gb: lower,
            upper_bound_gb: upper,
            secret: names.secret,
            storage_class: names.storage_class,
            pvc: names.pvc,
            pod: names.pod,
            final_state: ctx.state(),
            started_at,
            finished_at: Utc::now(),
        }
    }
}
