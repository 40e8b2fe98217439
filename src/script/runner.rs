//! External script runner
//!
//! Spawns the configured command through the platform shell, reads both
//! pipes up to `max_output_bytes`, and classifies the captured output. Each call owns its own child process;
//! nothing is shared between concurrent runs.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::error::ScriptError;
use crate::config::ScriptConfig;
use crate::logger;

pub struct ScriptRunner {
    config: ScriptConfig,
}

impl ScriptRunner {
    pub const fn new(config: ScriptConfig) -> Self {
        Self { config }
    }

    /// Run the script once and return its stdout
    ///
    /// Failure order: launch, timeout, overflow, non-zero exit, then any
    /// stderr text on a clean exit.
    pub async fn run(&self) -> Result<String, ScriptError> {
        let command = self.config.command.clone();
        let started = Instant::now();

        let mut cmd = shell_command(&command);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| ScriptError::Launch {
            command: command.clone(),
            source,
        })?;
        logger::log_debug(&format!(
            "[Script] Spawned pid {:?}: {command}",
            child.id()
        ));

        let limit = self.config.max_output_bytes;
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let supervised = async {
            // The first stream past the limit ends both reads
            let (stdout, stderr) = tokio::try_join!(
                read_capped(stdout_pipe, limit, "stdout", &command),
                read_capped(stderr_pipe, limit, "stderr", &command),
            )?;
            let status = child.wait().await.map_err(|source| ScriptError::Wait {
                command: command.clone(),
                source,
            })?;
            Ok::<_, ScriptError>((status, stdout, stderr))
        };

        let finished = match self.config.timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), supervised)
                .await
                .unwrap_or_else(|_| {
                    Err(ScriptError::TimedOut {
                        command: command.clone(),
                        secs,
                    })
                }),
            None => supervised.await,
        };
        let (status, stdout, stderr) = match finished {
            Ok(output) => output,
            Err(err) => {
                if let Err(e) = child.start_kill() {
                    logger::log_debug(&format!("[Script] Kill after failure: {e}"));
                }
                return Err(err);
            }
        };

        logger::log_debug(&format!(
            "[Script] `{command}` finished with {status} in {}ms",
            started.elapsed().as_millis()
        ));

        let stderr = String::from_utf8_lossy(&stderr).into_owned();
        if !status.success() {
            return Err(ScriptError::Failed {
                command,
                status,
                stderr,
            });
        }
        if !stderr.is_empty() {
            return Err(ScriptError::Stderr(stderr));
        }

        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

/// Read a child pipe to EOF, failing once more than `limit` bytes arrive
async fn read_capped<R>(
    pipe: Option<R>,
    limit: usize,
    stream: &'static str,
    command: &str,
) -> Result<Vec<u8>, ScriptError>
where
    R: AsyncRead + Unpin,
{
    let Some(pipe) = pipe else {
        return Ok(Vec::new());
    };
    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    let mut buf = Vec::new();
    pipe.take(cap)
        .read_to_end(&mut buf)
        .await
        .map_err(|source| ScriptError::Wait {
            command: command.to_string(),
            source,
        })?;
    if buf.len() > limit {
        return Err(ScriptError::OutputOverflow { stream });
    }
    Ok(buf)
}

#[cfg(unix)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("/bin/sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn runner(command: &str) -> ScriptRunner {
        ScriptRunner::new(ScriptConfig {
            command: command.to_string(),
            working_dir: None,
            timeout_secs: None,
            max_output_bytes: 1_048_576,
        })
    }

    #[tokio::test]
    async fn test_stdout_is_returned_verbatim() {
        let out = runner("printf hello").run().await.unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn test_multiline_stdout() {
        let out = runner("echo gi=1539; echo S=0.42").run().await.unwrap();
        assert_eq!(out, "gi=1539\nS=0.42\n");
    }

    #[tokio::test]
    async fn test_stderr_on_clean_exit_is_failure() {
        let err = runner("printf ok; printf warning >&2").run().await.unwrap_err();
        assert!(matches!(err, ScriptError::Stderr(ref s) if s == "warning"));
        assert_eq!(err.to_string(), "warning");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_failure() {
        let err = runner("printf broken >&2; exit 3").run().await.unwrap_err();
        match &err {
            ScriptError::Failed { status, stderr, .. } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "Command failed: printf broken >&2; exit 3\nbroken"
        );
    }

    #[tokio::test]
    async fn test_silent_non_zero_exit_is_failure() {
        let err = runner("exit 1").run().await.unwrap_err();
        assert!(matches!(err, ScriptError::Failed { .. }));
    }

    #[tokio::test]
    async fn test_missing_working_dir_is_launch_error() {
        let runner = ScriptRunner::new(ScriptConfig {
            command: "printf hello".to_string(),
            working_dir: Some("/definitely/not/here".to_string()),
            timeout_secs: None,
            max_output_bytes: 1024,
        });
        let err = runner.run().await.unwrap_err();
        assert!(matches!(err, ScriptError::Launch { .. }));
    }

    #[tokio::test]
    async fn test_working_dir_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("results.txt"), "1539").unwrap();
        let runner = ScriptRunner::new(ScriptConfig {
            command: "cat results.txt".to_string(),
            working_dir: Some(dir.path().to_string_lossy().into_owned()),
            timeout_secs: None,
            max_output_bytes: 1024,
        });
        assert_eq!(runner.run().await.unwrap(), "1539");
    }

    #[tokio::test]
    async fn test_timeout_kills_hung_script() {
        let runner = ScriptRunner::new(ScriptConfig {
            command: "sleep 10".to_string(),
            working_dir: None,
            timeout_secs: Some(1),
            max_output_bytes: 1024,
        });
        let started = Instant::now();
        let err = runner.run().await.unwrap_err();
        assert!(matches!(err, ScriptError::TimedOut { secs: 1, .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_output_overflow() {
        let runner = ScriptRunner::new(ScriptConfig {
            command: "printf 123456789".to_string(),
            working_dir: None,
            timeout_secs: None,
            max_output_bytes: 4,
        });
        let err = runner.run().await.unwrap_err();
        assert_eq!(err.to_string(), "stdout maxBuffer length exceeded");
    }

    #[tokio::test]
    async fn test_endless_stdout_stops_at_limit() {
        let runner = ScriptRunner::new(ScriptConfig {
            command: "yes".to_string(),
            working_dir: None,
            timeout_secs: None,
            max_output_bytes: 4,
        });
        let err = tokio::time::timeout(Duration::from_secs(3), runner.run())
            .await
            .expect("run should stop at the output limit")
            .unwrap_err();
        assert_eq!(err.to_string(), "stdout maxBuffer length exceeded");
    }

    #[tokio::test]
    async fn test_endless_stderr_stops_at_limit() {
        let runner = ScriptRunner::new(ScriptConfig {
            command: "yes >&2".to_string(),
            working_dir: None,
            timeout_secs: None,
            max_output_bytes: 4,
        });
        let err = tokio::time::timeout(Duration::from_secs(3), runner.run())
            .await
            .expect("run should stop at the output limit")
            .unwrap_err();
        assert_eq!(err.to_string(), "stderr maxBuffer length exceeded");
    }

    #[tokio::test]
    async fn test_concurrent_runs_are_independent() {
        let slow = runner("sleep 1; printf slow");
        let fast = runner("printf fast");
        let started = Instant::now();
        let (a, b, c) = tokio::join!(slow.run(), slow.run(), fast.run());
        assert_eq!(a.unwrap(), "slow");
        assert_eq!(b.unwrap(), "slow");
        assert_eq!(c.unwrap(), "fast");
        // Two one-second scripts overlapped instead of queueing
        assert!(started.elapsed() < Duration::from_millis(1900));
    }
}
