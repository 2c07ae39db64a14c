//! Bounded execution of external commands.
//!
//! Every call spawns one child, drains its stdout on a background task, and
//! races that drain against a wall-clock timer. The child is killed if the
//! timer wins.

use std::io;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::Instant;

/// Wall-clock bound applied to each command.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Command execution errors.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The process could not be launched.
    #[error("failed to start command `{program}`: {source}")]
    Start {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Reading the output stream failed.
    #[error("failed to run command `{program}`: {source}")]
    Read {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The command did not finish within the bound.
    #[error("timeout running command `{program}` after {}s", timeout.as_secs_f32())]
    Timeout { program: String, timeout: Duration },
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Everything the command wrote to stdout.
    pub stdout: Vec<u8>,
    /// Whether the command exited with status zero.
    pub success: bool,
}

impl CommandOutput {
    /// Successful output with the given stdout.
    #[must_use]
    pub fn ok(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: stdout.into(),
            success: true,
        }
    }

    /// Stdout as text, replacing invalid UTF-8.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Something that can run an external command and capture its stdout.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` and return its captured output.
    ///
    /// A non-zero exit status is reported through [`CommandOutput::success`],
    /// not as an error.
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError>;
}

/// Runs real child processes under a wall-clock bound.
#[derive(Debug, Clone, Copy)]
pub struct BoundedRunner {
    timeout: Duration,
}

impl Default for BoundedRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundedRunner {
    /// Runner with the default 5 second bound.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Runner with a custom bound.
    #[must_use]
    pub const fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl CommandRunner for BoundedRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError> {
        tracing::debug!(program = %program, args = ?args, "running command");

        let deadline = Instant::now() + self.timeout;
        let timed_out = || CommandError::Timeout {
            program: program.to_string(),
            timeout: self.timeout,
        };
        let read_failed = |source: io::Error| CommandError::Read {
            program: program.to_string(),
            source,
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CommandError::Start {
                program: program.to_string(),
                source,
            })?;

        let Some(mut stdout) = child.stdout.take() else {
            return Err(read_failed(io::Error::other("stdout was not captured")));
        };

        let mut drain = tokio::spawn(async move {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).await.map(|_| buf)
        });

        let stdout = tokio::select! {
            joined = &mut drain => match joined {
                Ok(Ok(buf)) => buf,
                Ok(Err(source)) => return Err(read_failed(source)),
                Err(join) => return Err(read_failed(io::Error::other(join))),
            },
            () = tokio::time::sleep_until(deadline) => {
                drain.abort();
                kill(&mut child, program).await;
                return Err(timed_out());
            }
        };

        // Stdout closed; the child may still linger, so reaping shares the bound.
        let status = match tokio::time::timeout_at(deadline, child.wait()).await {
            Ok(status) => status.map_err(read_failed)?,
            Err(_) => {
                kill(&mut child, program).await;
                return Err(timed_out());
            }
        };

        tracing::debug!(
            program = %program,
            bytes = stdout.len(),
            status = ?status.code(),
            "command finished"
        );

        Ok(CommandOutput {
            stdout,
            success: status.success(),
        })
    }
}

async fn kill(child: &mut tokio::process::Child, program: &str) {
    if let Err(e) = child.kill().await {
        tracing::warn!(program = %program, error = %e, "failed to kill timed out command");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout() {
        let output = BoundedRunner::new()
            .run("echo", &["hello", "world"])
            .await
            .unwrap();

        assert!(output.success);
        assert_eq!(output.text(), "hello world\n");
    }

    #[tokio::test]
    async fn non_zero_exit_is_not_an_error() {
        let output = BoundedRunner::new().run("false", &[]).await.unwrap();

        assert!(!output.success);
        assert!(output.stdout.is_empty());
    }

    #[tokio::test]
    async fn missing_program_fails_to_start() {
        let err = BoundedRunner::new()
            .run("xbi-definitely-not-a-real-program", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::Start { .. }));
    }

    #[tokio::test]
    async fn silent_hung_command_times_out() {
        let runner = BoundedRunner::with_timeout(Duration::from_millis(200));
        let started = std::time::Instant::now();

        let err = runner.run("sleep", &["30"]).await.unwrap_err();

        assert!(matches!(err, CommandError::Timeout { .. }));
        assert!(started.elapsed() >= Duration::from_millis(200));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn default_bound_is_five_seconds() {
        let started = std::time::Instant::now();

        let err = BoundedRunner::new().run("sleep", &["30"]).await.unwrap_err();

        let elapsed = started.elapsed();
        assert!(matches!(err, CommandError::Timeout { .. }));
        assert!(elapsed >= Duration::from_secs(5), "returned early: {elapsed:?}");
        assert!(elapsed < Duration::from_secs(7), "returned late: {elapsed:?}");
    }

    #[tokio::test]
    async fn lingering_child_with_closed_stdout_times_out() {
        let runner = BoundedRunner::with_timeout(Duration::from_millis(300));

        let err = runner
            .run("sh", &["-c", "exec 1>&-; sleep 30"])
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::Timeout { .. }));
    }
}
