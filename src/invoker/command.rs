use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use super::callable::PipelineCallable;
use super::error::CallError;

/// Legacy zero-argument entry point run as a child process.
///
/// The row travels as command-line arguments and the result is read back from
/// the child's stdout, so no process-wide state of the caller is touched.
#[derive(Debug, Clone)]
pub struct CommandEntry {
    program: PathBuf,
    leading_args: Vec<String>,
    timeout: Duration,
}

impl CommandEntry {
    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Arguments placed before the row arguments (e.g. a subcommand).
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl PipelineCallable for CommandEntry {
    fn arity(&self) -> Option<usize> {
        Some(0)
    }

    #[instrument(skip(self, argv, stdout), fields(program = %self.program.display()))]
    async fn call_with_argv(
        &self,
        argv: &[String],
        stdout: &mut Vec<u8>,
    ) -> Result<Option<Value>, CallError> {
        let child = Command::new(&self.program)
            .args(&self.leading_args)
            .args(argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CallError::Failed(format!("failed to spawn: {e}")))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| CallError::Failed(format!("timed out after {:?}", self.timeout)))?
            .map_err(|e| CallError::Failed(format!("failed to wait: {e}")))?;

        stdout.extend_from_slice(&output.stdout);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            warn!(status = %output.status, "legacy entry point exited with failure");
            return Err(CallError::Failed(format!(
                "exited with {}: {}",
                output.status,
                tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
            )));
        }

        debug!(stdout_bytes = output.stdout.len(), "legacy entry point finished");
        Ok(None)
    }
}
