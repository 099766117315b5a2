//! Ceph cluster queries
//!
//! Commands run inside the rook-ceph tools pod; nothing here shells out
//! locally. Every command is issued with `--format json` and parsed as JSON.

use overprov_common::{bytes_to_gb, GB};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};

use crate::cluster::ClusterOps;

/// Failures talking to or interpreting the Ceph backend
#[derive(Debug, Error)]
pub enum CephError {
    /// The tools pod is missing, the exec failed, or ceph exited non-zero
    #[error("Ceph backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Output arrived but does not have the expected shape
    #[error("Malformed ceph output: {0}")]
    MalformedStatus(String),
}

pub type CephResult<T> = std::result::Result<T, CephError>;

/// Raw cluster capacity as reported by `ceph status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityReport {
    pub bytes_total: u64,
    /// Whole gigabytes, truncated
    pub total_gb: u64,
}

impl CapacityReport {
    pub fn from_bytes(bytes_total: u64) -> Self {
        Self {
            bytes_total,
            total_gb: bytes_to_gb(bytes_total),
        }
    }
}

/// Build the argv for a ceph command such as `"ceph status"`
pub fn ceph_command(command: &str) -> Vec<String> {
    let mut argv: Vec<String> = command.split_whitespace().map(str::to_string).collect();
    if argv.first().map(String::as_str) != Some("ceph") {
        argv.insert(0, "ceph".to_string());
    }
    if !argv.iter().any(|arg| arg == "--format") {
        argv.push("--format".to_string());
        argv.push("json".to_string());
    }
    argv
}

/// Run a ceph command in the tools pod and parse its JSON output
pub async fn exec_ceph_cmd<O>(ops: &O, command: &str) -> CephResult<Value>
where
    O: ClusterOps + ?Sized,
{
    let argv = ceph_command(command);

    let output = ops
        .exec_ceph_cmd(&argv)
        .await
        .map_err(|e| CephError::BackendUnavailable(e.to_string()))?;

    if !output.is_success() {
        error!(command = %command, exit_code = output.exit_code, "Ceph command failed");
        return Err(CephError::BackendUnavailable(format!(
            "'{}' exited with {}: {}",
            command,
            output.exit_code,
            output.stderr.trim()
        )));
    }

    parse_json(&output.stdout)
}

/// Parse ceph's JSON output
pub fn parse_json(stdout: &str) -> CephResult<Value> {
    serde_json::from_str(stdout.trim())
        .map_err(|e| CephError::MalformedStatus(format!("output is not JSON: {}", e)))
}

/// Read `pgmap.bytes_total` out of a `ceph status` document
pub fn total_capacity_bytes(status: &Value) -> CephResult<u64> {
    let field = status
        .get("pgmap")
        .and_then(|pgmap| pgmap.get("bytes_total"))
        .ok_or_else(|| CephError::MalformedStatus("missing pgmap.bytes_total".to_string()))?;

    field.as_u64().ok_or_else(|| {
        CephError::MalformedStatus(format!(
            "pgmap.bytes_total is not a non-negative integer: {}",
            field
        ))
    })
}

/// Total raw capacity of the cluster
pub async fn probe_capacity<O>(ops: &O) -> CephResult<CapacityReport>
where
    O: ClusterOps + ?Sized,
{
    let status = exec_ceph_cmd(ops, "ceph status").await?;
    let report = CapacityReport::from_bytes(total_capacity_bytes(&status)?);

    info!(
        bytes_total = report.bytes_total,
        total_gb = report.total_gb,
        gb = GB,
        "Probed Ceph capacity"
    );

    Ok(report)
}

/// Key of the `client.admin` user, used as the CSI secret credential
pub async fn admin_key<O>(ops: &O) -> CephResult<String>
where
    O: ClusterOps + ?Sized,
{
    let value = exec_ceph_cmd(ops, "ceph auth get-key client.admin").await?;

    value
        .get("key")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CephError::MalformedStatus("auth get-key returned no key".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ceph_command_adds_format() {
        assert_eq!(ceph_command("ceph status"), vec!["ceph", "status", "--format", "json"]);
        assert_eq!(ceph_command("df"), vec!["ceph", "df", "--format", "json"]);
        assert_eq!(
            ceph_command("ceph osd df --format json-pretty"),
            vec!["ceph", "osd", "df", "--format", "json-pretty"]
        );
    }

    #[test]
    fn test_total_capacity_bytes() {
        let status = json!({"pgmap": {"bytes_total": 500u64 * GB, "bytes_used": 12}});
        assert_eq!(total_capacity_bytes(&status).unwrap(), 500 * GB);
    }

    #[test]
    fn test_capacity_truncates() {
        let report = CapacityReport::from_bytes(536_870_912_000);
        assert_eq!(report.total_gb, 500);
        assert_eq!(CapacityReport::from_bytes(GB - 1).total_gb, 0);
        assert_eq!(CapacityReport::from_bytes(0).total_gb, 0);
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let status = json!({"health": {"status": "HEALTH_OK"}});
        assert!(matches!(
            total_capacity_bytes(&status),
            Err(CephError::MalformedStatus(_))
        ));

        let status = json!({"pgmap": {"bytes_total": "lots"}});
        assert!(matches!(
            total_capacity_bytes(&status),
            Err(CephError::MalformedStatus(_))
        ));

        let status = json!({"pgmap": {"bytes_total": -1}});
        assert!(total_capacity_bytes(&status).is_err());
    }

    #[test]
    fn test_non_json_is_malformed() {
        assert!(matches!(
            parse_json("HEALTH_OK"),
            Err(CephError::MalformedStatus(_))
        ));
        assert!(parse_json("  {\"pgmap\": {}}\n").is_ok());
    }
}
