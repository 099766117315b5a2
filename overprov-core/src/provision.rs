//! Manifests for the resources a run submits
//!
//! Everything here is pure: it builds requests and objects without talking
//! to the cluster, which is what lets `render` print a run's manifests.

use k8s_openapi::api::core::v1::Pod;
use overprov_common::InterfaceType;
use std::collections::BTreeMap;

use crate::kubernetes::error::{K8sError, K8sResult};
use crate::kubernetes::types::{CreatePvcRequest, CreateSecretRequest, CreateStorageClassRequest};
use crate::naming::create_unique_resource_name;
use crate::scenario::ScenarioOptions;
use crate::templating;

/// Label put on everything a run creates
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Claim size in GB for a cluster of `capacity_gb`
pub fn oversized_request_gb(capacity_gb: u64, margin_gb: u64) -> u64 {
    capacity_gb.saturating_add(margin_gb)
}

fn managed_labels() -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(MANAGED_BY_LABEL.to_string(), "overprov".to_string());
    labels
}

/// CSI credential secret for `interface`
pub fn secret_request(
    interface: InterfaceType,
    name: &str,
    namespace: &str,
    admin_key: &str,
) -> CreateSecretRequest {
    let mut string_data = BTreeMap::new();
    match interface {
        InterfaceType::CephBlockPool => {
            string_data.insert("userID".to_string(), "admin".to_string());
            string_data.insert("userKey".to_string(), admin_key.to_string());
        }
        InterfaceType::CephFileSystem => {
            string_data.insert("adminID".to_string(), "admin".to_string());
            string_data.insert("adminKey".to_string(), admin_key.to_string());
        }
    }

    CreateSecretRequest {
        name: name.to_string(),
        namespace: namespace.to_string(),
        secret_type: Some("Opaque".to_string()),
        string_data,
        labels: managed_labels(),
    }
}

/// Ceph CSI storage class bound to `secret_name`
///
/// `interface_name` is the block pool for RBD and the filesystem name for
/// CephFS. The cluster ID is the operator namespace.
pub fn storage_class_request(
    interface: InterfaceType,
    name: &str,
    namespace: &str,
    secret_name: &str,
    interface_name: &str,
    data_pool: Option<&str>,
) -> CreateStorageClassRequest {
    let mut parameters = BTreeMap::new();
    parameters.insert("clusterID".to_string(), namespace.to_string());

    match interface {
        InterfaceType::CephBlockPool => {
            parameters.insert("pool".to_string(), interface_name.to_string());
            parameters.insert("imageFormat".to_string(), "2".to_string());
            parameters.insert("imageFeatures".to_string(), "layering".to_string());
        }
        InterfaceType::CephFileSystem => {
            parameters.insert("fsName".to_string(), interface_name.to_string());
            if let Some(pool) = data_pool {
                parameters.insert("pool".to_string(), pool.to_string());
            }
        }
    }

    for role in ["provisioner", "node-stage"] {
        parameters.insert(
            format!("csi.storage.k8s.io/{}-secret-name", role),
            secret_name.to_string(),
        );
        parameters.insert(
            format!("csi.storage.k8s.io/{}-secret-namespace", role),
            namespace.to_string(),
        );
    }

    CreateStorageClassRequest {
        name: name.to_string(),
        provisioner: format!("{}.{}", namespace, interface.csi_driver()),
        reclaim_policy: Some("Delete".to_string()),
        volume_binding_mode: None,
        allow_volume_expansion: false,
        parameters,
        labels: managed_labels(),
    }
}

/// Claim for `pvc_size` gigabytes against `storage_class`
pub fn pvc_request(
    name: &str,
    namespace: &str,
    storage_class: &str,
    pvc_size: &str,
    access_mode: &str,
) -> CreatePvcRequest {
    CreatePvcRequest {
        name: name.to_string(),
        namespace: namespace.to_string(),
        storage_class: Some(storage_class.to_string()),
        access_modes: vec![access_mode.to_string()],
        storage: format!("{}Gi", pvc_size),
        labels: managed_labels(),
    }
}

/// Fill in a pod template: name, namespace, and the first volume's claim
pub fn pod_manifest(mut template: Pod, name: &str, namespace: &str, claim_name: &str) -> K8sResult<Pod> {
    template.metadata.name = Some(name.to_string());
    template.metadata.namespace = Some(namespace.to_string());
    template
        .metadata
        .labels
        .get_or_insert_with(BTreeMap::new)
        .extend(managed_labels());

    let claim = template
        .spec
        .as_mut()
        .and_then(|spec| spec.volumes.as_mut())
        .and_then(|volumes| volumes.first_mut())
        .and_then(|volume| volume.persistent_volume_claim.as_mut())
        .ok_or_else(|| {
            K8sError::Template(
                "pod template's first volume must be a persistentVolumeClaim".to_string(),
            )
        })?;
    claim.claim_name = claim_name.to_string();

    Ok(template)
}

/// Every object a run submits, in creation order
#[derive(Debug, Clone)]
pub struct ProvisionPlan {
    /// Requested claim size in GB
    pub pvc_size: String,
    pub secret: CreateSecretRequest,
    pub storage_class: CreateStorageClassRequest,
    pub pvc: CreatePvcRequest,
    pub pod: Pod,
}

impl ProvisionPlan {
    /// Plan a run requesting `requested_gb` with fresh resource names
    pub fn build(options: &ScenarioOptions, requested_gb: u64, admin_key: &str) -> K8sResult<Self> {
        let namespace = options.namespace.as_str();
        let prefix = options.name_prefix.as_str();

        let secret_name = create_unique_resource_name(prefix, "secret");
        let sc_name = create_unique_resource_name(prefix, "storageclass");
        let pvc_name = create_unique_resource_name(&options.pvc_base_name, "pvc");
        let pod_name = create_unique_resource_name(prefix, "pod");
        let pvc_size = requested_gb.to_string();

        let template = templating::pod_template(options.interface, options.pod_template.as_deref())?;

        Ok(Self {
            secret: secret_request(options.interface, &secret_name, namespace, admin_key),
            storage_class: storage_class_request(
                options.interface,
                &sc_name,
                namespace,
                &secret_name,
                &options.interface_name,
                options.data_pool.as_deref(),
            ),
            pvc: pvc_request(&pvc_name, namespace, &sc_name, &pvc_size, &options.access_mode),
            pod: pod_manifest(template, &pod_name, namespace, &pvc_name)?,
            pvc_size,
        })
    }

    /// Multi-document YAML of the plan, with the secret key redacted
    pub fn to_yaml(&self) -> K8sResult<String> {
        use crate::kubernetes::{pvcs, secrets, storageclasses};

        let mut secret = secrets::build_secret(&self.secret);
        if let Some(data) = secret.string_data.as_mut() {
            for (key, value) in data.iter_mut() {
                if key.ends_with("Key") {
                    *value = "<redacted>".to_string();
                }
            }
        }

        let docs = [
            templating::to_yaml(&secret)?,
            templating::to_yaml(&storageclasses::build_storage_class(&self.storage_class))?,
            templating::to_yaml(&pvcs::build_pvc(&self.pvc))?,
            templating::to_yaml(&self.pod)?,
        ];

        Ok(docs
            .iter()
            .map(|doc| format!("---\n{}", doc))
            .collect::<Vec<_>>()
            .concat())
    }
}
