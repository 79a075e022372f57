//! Bounded subprocess execution.
//!
//! Shared by `execute_command` and `clone_repository`. The child runs in its
//! own process group so a timeout can kill everything it spawned, and both
//! output streams are drained concurrently so neither pipe can fill and
//! stall the child.

use crate::tools::ToolError;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

/// Captured result of a process that exited within its budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, or -1 if the process was killed by a signal
    pub exit_code: i32,
    /// Whether the process exited with status zero
    pub success: bool,
    /// Captured standard output (lossy UTF-8)
    pub stdout: String,
    /// Captured standard error (lossy UTF-8)
    pub stderr: String,
    /// Whether either stream exceeded the capture limit
    pub truncated: bool,
}

/// Spawns `command` and waits for it under `limit`.
///
/// On timeout the whole process group is killed and reaped, and a timeout
/// error naming `operation` is returned. No partial output is reported.
///
/// # Errors
///
/// - `ToolError::resource` if the process cannot be spawned or waited on
/// - `ToolError::timeout` if it runs past `limit`
pub async fn run_bounded(
    mut command: Command,
    limit: Duration,
    max_output_bytes: usize,
    operation: &str,
) -> Result<ProcessOutput, ToolError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    let mut child = command
        .spawn()
        .map_err(|e| ToolError::resource(format!("failed to spawn process: {e}")))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let result = tokio::time::timeout(limit, async {
        let (out, err, status) = tokio::join!(
            read_capped(stdout, max_output_bytes),
            read_capped(stderr, max_output_bytes),
            child.wait()
        );
        Ok::<_, std::io::Error>((status?, out?, err?))
    })
    .await;

    match result {
        Ok(Ok((status, (stdout, stdout_truncated), (stderr, stderr_truncated)))) => {
            Ok(ProcessOutput {
                exit_code: status.code().unwrap_or(-1),
                success: status.success(),
                stdout: String::from_utf8_lossy(&stdout).into_owned(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
                truncated: stdout_truncated || stderr_truncated,
            })
        }
        Ok(Err(e)) => Err(ToolError::resource(format!("process error: {e}"))),
        Err(_) => {
            kill_tree(&mut child).await;
            tracing::warn!(
                operation,
                timeout_secs = limit.as_secs(),
                "subprocess exceeded its time budget and was killed"
            );
            Err(ToolError::timeout(operation, limit))
        }
    }
}

/// Reads a stream to the end, keeping at most `cap` bytes.
async fn read_capped<R>(stream: Option<R>, cap: usize) -> std::io::Result<(Vec<u8>, bool)>
where
    R: AsyncRead + Unpin,
{
    let Some(mut stream) = stream else {
        return Ok((Vec::new(), false));
    };

    let mut kept = Vec::new();
    let mut truncated = false;
    let mut buf = [0u8; 8192];
    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        let room = cap.saturating_sub(kept.len());
        if n > room {
            truncated = true;
        }
        kept.extend_from_slice(&buf[..n.min(room)]);
    }
    Ok((kept, truncated))
}

async fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Ok(pgid) = i32::try_from(pid) {
            let _ = killpg(Pid::from_raw(pgid), Signal::SIGKILL);
        }
    }
    let _ = child.kill().await;
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(script: &str) -> Command {
        let mut command = Command::new("sh");
        command.arg("-c").arg(script);
        command
    }

    #[tokio::test]
    async fn captures_stdout_stderr_and_exit_code() {
        let output = run_bounded(
            shell("echo out; echo err >&2; exit 3"),
            Duration::from_secs(10),
            1024,
            "Command",
        )
        .await
        .unwrap();

        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
        assert_eq!(output.exit_code, 3);
        assert!(!output.success);
        assert!(!output.truncated);
    }

    #[tokio::test]
    async fn timeout_kills_and_reports_no_output() {
        let started = std::time::Instant::now();
        let error = run_bounded(
            shell("echo partial; sleep 30"),
            Duration::from_secs(1),
            1024,
            "Command",
        )
        .await
        .unwrap_err();

        assert!(error.is_timeout());
        assert_eq!(error.to_string(), "Command timed out after 1 seconds");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn output_is_capped() {
        let output = run_bounded(
            shell("head -c 5000 /dev/zero | tr '\\0' 'a'"),
            Duration::from_secs(10),
            100,
            "Command",
        )
        .await
        .unwrap();

        assert_eq!(output.stdout.len(), 100);
        assert!(output.truncated);
        assert!(output.success);
    }

    #[tokio::test]
    async fn missing_program_is_resource_error() {
        let error = run_bounded(
            Command::new("definitely-not-a-real-binary-xyz"),
            Duration::from_secs(5),
            1024,
            "Command",
        )
        .await
        .unwrap_err();

        assert!(error.to_string().contains("failed to spawn"));
    }
}
