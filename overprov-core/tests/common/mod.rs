//! Common test utilities and helpers

#![allow(dead_code)]

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use overprov_common::{ResourceKind, GB};
use overprov_core::cluster::ClusterOps;
use overprov_core::kubernetes::error::{K8sError, K8sResult};
use overprov_core::kubernetes::exec::ExecOutput;
use overprov_core::kubernetes::types::{
    CreatePvcRequest, CreateSecretRequest, CreateStorageClassRequest, PodExecRequest, PvInfo,
    PvcInfo, ResourceHandle,
};
use overprov_core::kubernetes::wait::WaitOptions;
use overprov_core::ScenarioOptions;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

pub const ADMIN_KEY: &str = "AQBkZmFrZS1hZG1pbi1rZXk=";

/// Operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    CephExec,
    CreateSecret,
    CreateStorageClass,
    CreatePvc,
    CreatePod,
    PodRunning,
    ExecOnPod,
    Delete(ResourceKind),
    WaitForDelete(ResourceKind),
}

#[derive(Debug, Default)]
struct FakeState {
    ceph_status: String,
    ceph_exit_code: i32,
    df_output: String,
    df_exit_code: i32,
    retained_volume: Option<String>,
    failures: HashSet<FailPoint>,
    objects: HashSet<(ResourceKind, String)>,
    pvc_volume: HashMap<String, String>,
    calls: Vec<String>,
    pvc_requests: Vec<CreatePvcRequest>,
    secret_requests: Vec<CreateSecretRequest>,
    pods: Vec<Pod>,
}

/// In-memory cluster recording every call it receives
pub struct FakeCluster {
    state: Mutex<FakeState>,
}

impl FakeCluster {
    /// Cluster of `capacity_gb` whose pods report `df_size` for the mount
    pub fn new(capacity_gb: u64, df_size: &str) -> Self {
        let status = serde_json::json!({
            "health": {"status": "HEALTH_OK"},
            "pgmap": {"bytes_total": capacity_gb * GB, "bytes_used": 0}
        });
        Self {
            state: Mutex::new(FakeState {
                ceph_status: status.to_string(),
                df_output: format!(" Size\n {}\n", df_size),
                ..Default::default()
            }),
        }
    }

    pub fn with_status(self, raw: &str) -> Self {
        self.state.lock().unwrap().ceph_status = raw.to_string();
        self
    }

    pub fn with_ceph_exit_code(self, code: i32) -> Self {
        self.state.lock().unwrap().ceph_exit_code = code;
        self
    }

    pub fn with_df_exit_code(self, code: i32) -> Self {
        self.state.lock().unwrap().df_exit_code = code;
        self
    }

    /// Bind created claims to a volume with a Retain reclaim policy
    pub fn with_retained_volume(self, name: &str) -> Self {
        self.state.lock().unwrap().retained_volume = Some(name.to_string());
        self
    }

    pub fn failing_at(self, point: FailPoint) -> Self {
        self.state.lock().unwrap().failures.insert(point);
        self
    }

    /// Add an object as if created out of band
    pub fn insert(&self, kind: ResourceKind, name: &str) {
        self.state.lock().unwrap().objects.insert((kind, name.to_string()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls that mutate the cluster or wait on deletion, in order
    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| {
                c.starts_with("create ") || c.starts_with("delete ") || c.starts_with("wait_deleted ")
            })
            .collect()
    }

    pub fn live_objects(&self) -> usize {
        self.state.lock().unwrap().objects.len()
    }

    pub fn contains(&self, kind: ResourceKind, name: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .objects
            .contains(&(kind, name.to_string()))
    }

    pub fn pvc_requests(&self) -> Vec<CreatePvcRequest> {
        self.state.lock().unwrap().pvc_requests.clone()
    }

    pub fn secret_requests(&self) -> Vec<CreateSecretRequest> {
        self.state.lock().unwrap().secret_requests.clone()
    }

    pub fn pods(&self) -> Vec<Pod> {
        self.state.lock().unwrap().pods.clone()
    }

    fn record(&self, call: String) -> std::sync::MutexGuard<'_, FakeState> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state
    }

    fn check(state: &FakeState, point: FailPoint) -> K8sResult<()> {
        if state.failures.contains(&point) {
            return Err(K8sError::Internal(format!("injected failure at {:?}", point)));
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterOps for FakeCluster {
    async fn exec_ceph_cmd(&self, argv: &[String]) -> K8sResult<ExecOutput> {
        let state = self.record(format!("ceph {}", argv.join(" ")));
        Self::check(&state, FailPoint::CephExec)?;

        if state.ceph_exit_code != 0 {
            return Ok(ExecOutput {
                stdout: String::new(),
                stderr: "error connecting to the cluster".to_string(),
                exit_code: state.ceph_exit_code,
            });
        }

        if argv.iter().any(|a| a == "get-key") {
            return Ok(ExecOutput::success(
                serde_json::json!({ "key": ADMIN_KEY }).to_string(),
            ));
        }

        Ok(ExecOutput::success(state.ceph_status.clone()))
    }

    async fn create_secret(&self, request: &CreateSecretRequest) -> K8sResult<ResourceHandle> {
        let mut state = self.record("create Secret".to_string());
        Self::check(&state, FailPoint::CreateSecret)?;
        state.secret_requests.push(request.clone());
        state.objects.insert((ResourceKind::Secret, request.name.clone()));
        Ok(ResourceHandle::namespaced(
            ResourceKind::Secret,
            &request.name,
            &request.namespace,
        ))
    }

    async fn create_storage_class(
        &self,
        request: &CreateStorageClassRequest,
    ) -> K8sResult<ResourceHandle> {
        let mut state = self.record("create StorageClass".to_string());
        Self::check(&state, FailPoint::CreateStorageClass)?;
        state.objects.insert((ResourceKind::StorageClass, request.name.clone()));
        Ok(ResourceHandle::cluster_scoped(ResourceKind::StorageClass, &request.name))
    }

    async fn create_pvc(&self, request: &CreatePvcRequest) -> K8sResult<ResourceHandle> {
        let mut state = self.record("create PersistentVolumeClaim".to_string());
        Self::check(&state, FailPoint::CreatePvc)?;
        state.pvc_requests.push(request.clone());
        state
            .objects
            .insert((ResourceKind::PersistentVolumeClaim, request.name.clone()));

        if let Some(volume) = state.retained_volume.clone() {
            state.pvc_volume.insert(request.name.clone(), volume.clone());
            state.objects.insert((ResourceKind::PersistentVolume, volume));
        }

        Ok(ResourceHandle::namespaced(
            ResourceKind::PersistentVolumeClaim,
            &request.name,
            &request.namespace,
        )
        .with_uid(Some(format!("uid-{}", request.name))))
    }

    async fn create_pod(&self, pod: &Pod) -> K8sResult<ResourceHandle> {
        let mut state = self.record("create Pod".to_string());
        Self::check(&state, FailPoint::CreatePod)?;
        let name = pod
            .metadata
            .name
            .clone()
            .ok_or_else(|| K8sError::Template("no name".to_string()))?;
        let namespace = pod.metadata.namespace.clone().unwrap_or_default();
        state.pods.push(pod.clone());
        state.objects.insert((ResourceKind::Pod, name.clone()));
        Ok(ResourceHandle::namespaced(ResourceKind::Pod, name, namespace))
    }

    async fn wait_for_pod_running(&self, pod: &ResourceHandle, options: &WaitOptions) -> K8sResult<()> {
        let state = self.record(format!("wait_running {}", pod.kind));
        if state.failures.contains(&FailPoint::PodRunning) {
            return Err(K8sError::Timeout {
                kind: pod.kind,
                name: pod.name.clone(),
                condition: "reach phase Running".to_string(),
                seconds: options.timeout.as_secs(),
            });
        }
        Ok(())
    }

    async fn wait_for_pvc_bound(&self, pvc: &ResourceHandle, _options: &WaitOptions) -> K8sResult<()> {
        let _state = self.record(format!("wait_bound {}", pvc.kind));
        Ok(())
    }

    async fn get_pvc(&self, pvc: &ResourceHandle) -> K8sResult<PvcInfo> {
        let state = self.record(format!("get {}", pvc.kind));
        if !state.objects.contains(&(pvc.kind, pvc.name.clone())) {
            return Err(K8sError::ResourceNotFound {
                kind: pvc.kind,
                name: pvc.name.clone(),
                namespace: pvc.namespace_or_empty().to_string(),
            });
        }
        let volume_name = state.pvc_volume.get(&pvc.name).cloned();
        Ok(PvcInfo {
            name: pvc.name.clone(),
            namespace: pvc.namespace_or_empty().to_string(),
            status: if volume_name.is_some() { "Bound" } else { "Pending" }.to_string(),
            volume_name,
            storage_class: None,
            capacity: None,
            requested_capacity: None,
        })
    }

    async fn get_pv(&self, name: &str) -> K8sResult<Option<PvInfo>> {
        let state = self.record("get PersistentVolume".to_string());
        if !state
            .objects
            .contains(&(ResourceKind::PersistentVolume, name.to_string()))
        {
            return Ok(None);
        }
        Ok(Some(PvInfo {
            name: name.to_string(),
            status: "Bound".to_string(),
            capacity: "600Gi".to_string(),
            reclaim_policy: "Retain".to_string(),
            storage_class: None,
        }))
    }

    async fn exec_on_pod(
        &self,
        pod: &ResourceHandle,
        request: &PodExecRequest,
    ) -> K8sResult<ExecOutput> {
        let state = self.record(format!("exec {} {}", pod.kind, request.command.join(" ")));
        Self::check(&state, FailPoint::ExecOnPod)?;
        Ok(ExecOutput {
            stdout: state.df_output.clone(),
            stderr: if state.df_exit_code == 0 {
                String::new()
            } else {
                "df: cannot access mount".to_string()
            },
            exit_code: state.df_exit_code,
        })
    }

    async fn exists(&self, handle: &ResourceHandle) -> K8sResult<bool> {
        let state = self.record(format!("exists {}", handle.kind));
        Ok(state.objects.contains(&(handle.kind, handle.name.clone())))
    }

    async fn delete(&self, handle: &ResourceHandle) -> K8sResult<()> {
        let mut state = self.record(format!("delete {}", handle.kind));
        Self::check(&state, FailPoint::Delete(handle.kind))?;
        if !state.objects.remove(&(handle.kind, handle.name.clone())) {
            return Err(K8sError::ResourceNotFound {
                kind: handle.kind,
                name: handle.name.clone(),
                namespace: handle.namespace_or_empty().to_string(),
            });
        }
        Ok(())
    }

    async fn wait_for_delete(&self, handle: &ResourceHandle, _options: &WaitOptions) -> K8sResult<()> {
        let state = self.record(format!("wait_deleted {}", handle.kind));
        Self::check(&state, FailPoint::WaitForDelete(handle.kind))?;
        Ok(())
    }
}

/// Default options with waits short enough for tests
pub fn test_options() -> ScenarioOptions {
    let quick = WaitOptions::new(Duration::from_millis(50), Duration::from_millis(5));
    ScenarioOptions {
        pod_wait: quick,
        bound_wait: quick,
        delete_wait: quick,
        ..ScenarioOptions::default()
    }
}
