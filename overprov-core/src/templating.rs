//! Manifest templates
//!
//! The stock pod templates are compiled into the binary. A YAML file on
//! disk can replace them.

use overprov_common::InterfaceType;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

use crate::kubernetes::error::{K8sError, K8sResult};
use k8s_openapi::api::core::v1::Pod;

/// nginx pod mounting an RBD-backed claim
pub const CSI_RBD_POD_YAML: &str = include_str!("../templates/csi-rbd-pod.yaml");

/// nginx pod mounting a CephFS-backed claim
pub const CSI_CEPHFS_POD_YAML: &str = include_str!("../templates/csi-cephfs-pod.yaml");

/// Read a YAML file into an untyped document
pub fn load_yaml_to_dict(path: &Path) -> K8sResult<serde_yaml::Value> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| K8sError::Template(format!("failed to read {}: {}", path.display(), e)))?;

    serde_yaml::from_str(&content)
        .map_err(|e| K8sError::Template(format!("failed to parse {}: {}", path.display(), e)))
}

/// Parse a YAML document into a typed object
pub fn load_template<T: DeserializeOwned>(yaml: &str) -> K8sResult<T> {
    serde_yaml::from_str(yaml).map_err(|e| K8sError::Template(e.to_string()))
}

/// Pod template for `interface`, or the file at `path` when given
pub fn pod_template(interface: InterfaceType, path: Option<&Path>) -> K8sResult<Pod> {
    match path {
        Some(path) => {
            let doc = load_yaml_to_dict(path)?;
            serde_yaml::from_value(doc).map_err(|e| {
                K8sError::Template(format!("{} is not a pod manifest: {}", path.display(), e))
            })
        }
        None => match interface {
            InterfaceType::CephBlockPool => load_template(CSI_RBD_POD_YAML),
            InterfaceType::CephFileSystem => load_template(CSI_CEPHFS_POD_YAML),
        },
    }
}

/// Render an object as YAML
pub fn to_yaml<T: Serialize>(value: &T) -> K8sResult<String> {
    serde_yaml::to_string(value).map_err(|e| K8sError::Template(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_embedded_templates_parse() {
        for interface in [InterfaceType::CephBlockPool, InterfaceType::CephFileSystem] {
            let pod = pod_template(interface, None).unwrap();
            let spec = pod.spec.unwrap();
            assert_eq!(spec.containers[0].name, "web-server");
            let mounts = spec.containers[0].volume_mounts.clone().unwrap();
            assert_eq!(mounts[0].mount_path, "/var/lib/www/html");
            let volumes = spec.volumes.unwrap();
            assert!(volumes[0].persistent_volume_claim.is_some());
        }
    }

    #[test]
    fn test_template_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "apiVersion: v1\nkind: Pod\nmetadata:\n  name: custom\nspec:\n  containers:\n    - name: app\n      image: busybox\n"
        )
        .unwrap();

        let doc = load_yaml_to_dict(file.path()).unwrap();
        assert_eq!(doc["metadata"]["name"].as_str(), Some("custom"));

        let pod = pod_template(InterfaceType::CephBlockPool, Some(file.path())).unwrap();
        assert_eq!(pod.metadata.name.as_deref(), Some("custom"));
    }

    #[test]
    fn test_missing_template_file() {
        let err = load_yaml_to_dict(Path::new("/nonexistent/pod.yaml")).unwrap_err();
        assert!(matches!(err, K8sError::Template(_)));
    }

    #[test]
    fn test_to_yaml_keeps_kind() {
        let pod = pod_template(InterfaceType::CephBlockPool, None).unwrap();
        let yaml = to_yaml(&pod).unwrap();
        assert!(yaml.contains("kind: Pod"));
        assert!(yaml.contains("claimName: rbd-pvc"));
    }
}
