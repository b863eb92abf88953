//! Builder for executing external tool commands with timeout support.

use std::future::Future;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use rp_core::{Error, Result};
use tokio::process::Command;

/// Default command timeout: 5 minutes.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output.
    pub stdout: Vec<u8>,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use rp_av::command::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> rp_core::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffprobe"))
///     .arg("-version")
///     .execute()
///     .await?;
/// println!("{}", String::from_utf8_lossy(&output.stdout));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Arguments added so far.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// The child is killed if the timeout expires.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tool`] if spawning fails, the process exits with a
    /// non-zero status (message includes stderr), or the timeout expires.
    pub async fn execute(&self) -> Result<ToolOutput> {
        let tool = self.tool_name();

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::tool(&tool, format!("failed to spawn: {e}")))?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                if !output.status.success() {
                    return Err(Error::tool(
                        tool,
                        format!("exited with status {}: {}", output.status, stderr.trim()),
                    ));
                }
                Ok(ToolOutput {
                    status: output.status,
                    stdout: output.stdout,
                    stderr,
                })
            }
            Ok(Err(e)) => Err(Error::tool(tool, format!("I/O error waiting for process: {e}"))),
            // Dropping the wait future drops the child, which kills it.
            Err(_elapsed) => Err(Error::tool(tool, format!("timed out after {:?}", self.timeout))),
        }
    }

    /// Execute from synchronous code.
    pub fn execute_blocking(&self) -> Result<ToolOutput> {
        block_on(self.execute())
    }
}

/// Drive `fut` to completion from synchronous code.
///
/// Reuses the current tokio runtime when there is one, otherwise builds a
/// temporary current-thread runtime.
pub(crate) fn block_on<F: Future<Output = Result<T>>, T>(fut: F) -> Result<T> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => tokio::task::block_in_place(|| handle.block_on(fut)),
        Err(_) => {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| Error::Probe(format!("failed to create tokio runtime: {e}")))?;
            rt.block_on(fut)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn execute_echo() {
        let output = ToolCommand::new(PathBuf::from("echo"))
            .arg("hello")
            .execute()
            .await;

        match output {
            Ok(out) => {
                assert!(out.status.success());
                assert!(String::from_utf8_lossy(&out.stdout).contains("hello"));
            }
            Err(_) => {
                // On some minimal environments echo may not exist; skip.
            }
        }
    }

    #[tokio::test]
    async fn execute_nonexistent_tool() {
        let err = ToolCommand::new(PathBuf::from("nonexistent_tool_xyz_12345"))
            .execute()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Tool { .. }));
        assert!(err.to_string().contains("failed to spawn"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_tool_error() {
        let err = ToolCommand::new(PathBuf::from("false"))
            .execute()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exited with status"), "{err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_fires() {
        let start = std::time::Instant::now();
        let err = ToolCommand::new(PathBuf::from("sleep"))
            .arg("10")
            .timeout(Duration::from_millis(100))
            .execute()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"), "unexpected error: {err}");
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[test]
    fn blocking_without_runtime() {
        let out = ToolCommand::new(PathBuf::from("true"))
            .execute_blocking()
            .unwrap();
        assert!(out.status.success());
    }
}
