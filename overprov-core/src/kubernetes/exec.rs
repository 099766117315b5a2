//! Kubernetes exec operations
//!
//! Execute commands in containers via WebSocket-based exec.

use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, AttachParams};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::kubernetes::client::K8sClient;
use crate::kubernetes::error::{K8sError, K8sResult};
use crate::kubernetes::types::PodExecRequest;

/// Output from an exec command
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
    /// Exit code (0 for success)
    pub exit_code: i32,
}

impl ExecOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Execute a command in a container and return the output
pub async fn exec_command(
    client: &K8sClient,
    namespace: &str,
    pod_name: &str,
    request: &PodExecRequest,
) -> K8sResult<ExecOutput> {
    let pods: Api<Pod> = Api::namespaced(client.inner().clone(), namespace);

    let attach_params = AttachParams {
        container: request.container.clone(),
        tty: false,
        stdin: false,
        stdout: true,
        stderr: true,
        max_stdin_buf_size: Some(1024),
        max_stdout_buf_size: Some(1024 * 1024),
        max_stderr_buf_size: Some(1024 * 1024),
    };

    tracing::debug!(pod = %pod_name, command = ?request.command, "Exec in pod");

    let mut attached = pods
        .exec(pod_name, request.command.clone(), &attach_params)
        .await?;

    let stdout = match attached.stdout() {
        Some(reader) => read_stream(reader, "stdout").await?,
        None => String::new(),
    };

    let stderr = match attached.stderr() {
        Some(reader) => read_stream(reader, "stderr").await?,
        None => String::new(),
    };

    let status = attached
        .take_status()
        .ok_or_else(|| K8sError::ExecError("No status channel".to_string()))?
        .await
        .ok_or_else(|| K8sError::ExecError("Status channel closed".to_string()))?;

    Ok(ExecOutput {
        stdout,
        stderr,
        exit_code: exit_code_from_status(status.status.as_deref(), status.reason.as_deref()),
    })
}

/// Drain an exec output stream
async fn read_stream<R>(mut reader: R, stream: &str) -> K8sResult<String>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader
        .read_to_end(&mut buf)
        .await
        .map_err(|e| K8sError::ExecError(format!("Failed to read {}: {}", stream, e)))?;

    Ok(String::from_utf8_lossy(&buf).to_string())
}

/// Map the exec status channel's result to a process exit code
fn exit_code_from_status(status: Option<&str>, reason: Option<&str>) -> i32 {
    match status {
        Some("Success") => 0,
        Some(_) => reason
            .and_then(|r| r.strip_prefix("ExitCode:"))
            .and_then(|code| code.trim().parse().ok())
            .unwrap_or(1),
        None => 1,
    }
}
