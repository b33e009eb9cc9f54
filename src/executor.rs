//! Child process execution with a wall-clock timeout

use crate::error::Denial;
use crate::platform::{self, Platform};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// What to spawn, built only after validation succeeded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionPlan {
    /// Raw line handed to the platform shell (unrestricted mode)
    Shell { command_line: String },

    /// Resolved executable with a filtered argument list, no shell involved
    Direct { program: PathBuf, args: Vec<String> },
}

impl ExecutionPlan {
    /// Human-readable rendering for dry runs and logs
    pub fn describe(&self) -> String {
        match self {
            ExecutionPlan::Shell { command_line } => format!("shell: {}", command_line),
            ExecutionPlan::Direct { program, args } => {
                let mut argv = vec![program.to_string_lossy().into_owned()];
                argv.extend(args.iter().cloned());
                format!("direct: {}", shell_words::join(argv))
            }
        }
    }
}

/// Terminal state of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionOutcome {
    /// Child exited on its own; a non-zero code is still a completion
    Completed {
        stdout: String,
        stderr: String,
        exit_code: i32,
    },

    /// Child was killed after `limit_secs`; partial output is discarded
    TimedOut { limit_secs: u64 },

    /// Refused before spawning
    Denied(Denial),

    /// The OS could not start or wait on the child
    SpawnFailed { reason: String },
}

impl ExecutionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ExecutionOutcome::Completed { .. })
    }
}

/// Spawns execution plans
#[derive(Debug, Clone)]
pub struct Executor {
    platform: Platform,
    working_dir: Option<PathBuf>,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Executor {
    /// Create new executor
    pub fn new(working_dir: Option<PathBuf>) -> Self {
        Self {
            platform: Platform::current(),
            working_dir,
        }
    }

    /// Get platform info
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Run `plan` to completion or until `timeout_secs` elapses.
    ///
    /// On timeout the child and its process group are killed before this
    /// returns.
    pub async fn execute(&self, plan: &ExecutionPlan, timeout_secs: u64) -> ExecutionOutcome {
        let start_time = Instant::now();
        let mut cmd = self.build_command(plan);

        // Set working directory
        if let Some(ref wd) = self.working_dir {
            cmd.current_dir(wd);
        }

        // Configure stdio
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        platform::isolate_process_group(&mut cmd);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to spawn {}: {}", plan.describe(), e);
                return ExecutionOutcome::SpawnFailed {
                    reason: format!("Failed to spawn command: {}", e),
                };
            }
        };
        let pid = child.id();
        debug!("Spawned pid {:?} for {}", pid, plan.describe());

        match timeout(Duration::from_secs(timeout_secs), child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let exit_code = exit_code(output.status);
                info!(
                    "Command finished with exit code {} in {} ms",
                    exit_code,
                    start_time.elapsed().as_millis()
                );

                ExecutionOutcome::Completed {
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    exit_code,
                }
            }
            Ok(Err(e)) => {
                warn!("Failed to collect output: {}", e);
                if let Some(pid) = pid {
                    platform::kill_process_group(pid);
                }
                ExecutionOutcome::SpawnFailed {
                    reason: format!("Failed to collect command output: {}", e),
                }
            }
            Err(_) => {
                // the dropped future already killed the direct child
                if let Some(pid) = pid {
                    platform::kill_process_group(pid);
                }
                warn!("Command timed out after {}s", timeout_secs);
                ExecutionOutcome::TimedOut {
                    limit_secs: timeout_secs,
                }
            }
        }
    }

    fn build_command(&self, plan: &ExecutionPlan) -> TokioCommand {
        match plan {
            ExecutionPlan::Shell { command_line } => self.platform.shell_command(command_line),
            ExecutionPlan::Direct { program, args } => {
                let mut c = TokioCommand::new(program);
                c.args(args);
                c
            }
        }
    }
}

/// Exit code, or the negated signal number for a signal-terminated child
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }

    -1
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn direct(program: &str, args: &[&str]) -> ExecutionPlan {
        ExecutionPlan::Direct {
            program: which::which(program).unwrap(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn shell(line: &str) -> ExecutionPlan {
        ExecutionPlan::Shell {
            command_line: line.to_string(),
        }
    }

    #[tokio::test]
    async fn test_simple_command_echo() {
        let outcome = Executor::default()
            .execute(&direct("echo", &["Hello", "World"]), 5)
            .await;

        assert_eq!(
            outcome,
            ExecutionOutcome::Completed {
                stdout: "Hello World\n".to_string(),
                stderr: String::new(),
                exit_code: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_direct_plan_does_not_interpret_shell_syntax() {
        let outcome = Executor::default()
            .execute(&direct("echo", &["a", "|", "wc"]), 5)
            .await;

        match outcome {
            ExecutionOutcome::Completed { stdout, .. } => assert_eq!(stdout, "a | wc\n"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_shell_plan_captures_both_streams() {
        let outcome = Executor::default()
            .execute(&shell("echo out; echo err >&2; exit 3"), 5)
            .await;

        assert_eq!(
            outcome,
            ExecutionOutcome::Completed {
                stdout: "out\n".to_string(),
                stderr: "err\n".to_string(),
                exit_code: 3,
            }
        );
    }

    #[tokio::test]
    async fn test_timeout_discards_output() {
        let outcome = Executor::default()
            .execute(&shell("echo partial; sleep 5"), 1)
            .await;
        assert_eq!(outcome, ExecutionOutcome::TimedOut { limit_secs: 1 });
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let plan = ExecutionPlan::Direct {
            program: PathBuf::from("/nonexistent/binary"),
            args: vec![],
        };
        match Executor::default().execute(&plan, 5).await {
            ExecutionOutcome::SpawnFailed { reason } => {
                assert!(reason.starts_with("Failed to spawn command:"))
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_signal_exit_code_is_negated() {
        let outcome = Executor::default().execute(&shell("kill -9 $$"), 5).await;
        match outcome {
            ExecutionOutcome::Completed { exit_code, .. } => assert_eq!(exit_code, -9),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_working_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let executor = Executor::new(Some(dir.path().to_path_buf()));
        let outcome = executor.execute(&direct("pwd", &[]), 5).await;

        match outcome {
            ExecutionOutcome::Completed { stdout, .. } => {
                let reported = std::fs::canonicalize(stdout.trim()).unwrap();
                assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_plan_description() {
        let plan = ExecutionPlan::Direct {
            program: PathBuf::from("/bin/ls"),
            args: vec!["-la".to_string(), "my dir".to_string()],
        };
        assert_eq!(plan.describe(), "direct: /bin/ls -la 'my dir'");
        assert_eq!(shell("ps aux | grep x").describe(), "shell: ps aux | grep x");
    }
}
