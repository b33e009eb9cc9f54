//! Rendering of outcomes into the caller-facing result text

use crate::executor::ExecutionOutcome;

/// Render `outcome` as the single string handed back to the caller.
///
/// Pure: no logging, no state.
pub fn render(outcome: &ExecutionOutcome) -> String {
    match outcome {
        ExecutionOutcome::Completed {
            stdout,
            stderr,
            exit_code,
        } => {
            let mut blocks = Vec::with_capacity(3);

            let stdout = stdout.trim_end();
            if !stdout.is_empty() {
                blocks.push(format!("STDOUT:\n{}", stdout));
            }

            let stderr = stderr.trim_end();
            if !stderr.is_empty() {
                blocks.push(format!("STDERR:\n{}", stderr));
            }

            blocks.push(format!("RETURN CODE: {}", exit_code));
            blocks.join("\n\n")
        }
        ExecutionOutcome::TimedOut { limit_secs } => {
            format!("ERROR: Command timed out after {} seconds.", limit_secs)
        }
        ExecutionOutcome::Denied(denial) => format!("ERROR: {}", denial),
        ExecutionOutcome::SpawnFailed { reason } => format!("ERROR: {}", reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Denial;

    fn completed(stdout: &str, stderr: &str, exit_code: i32) -> ExecutionOutcome {
        ExecutionOutcome::Completed {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit_code,
        }
    }

    #[test]
    fn test_stdout_only() {
        assert_eq!(
            render(&completed("file1.txt\nfile2.txt\n", "", 0)),
            "STDOUT:\nfile1.txt\nfile2.txt\n\nRETURN CODE: 0"
        );
    }

    #[test]
    fn test_both_streams() {
        let text = render(&completed(
            "file1.txt\n",
            "ls: cannot access 'missing.txt': No such file or directory\n",
            2,
        ));
        assert_eq!(
            text,
            "STDOUT:\nfile1.txt\n\n\
             STDERR:\nls: cannot access 'missing.txt': No such file or directory\n\n\
             RETURN CODE: 2"
        );
    }

    #[test]
    fn test_empty_streams_are_omitted() {
        assert_eq!(render(&completed("", "", 1)), "RETURN CODE: 1");
        assert_eq!(render(&completed("\n  \n", "", 0)), "RETURN CODE: 0");
    }

    #[test]
    fn test_leading_whitespace_is_kept() {
        assert_eq!(
            render(&completed("  indented\n", "", 0)),
            "STDOUT:\n  indented\n\nRETURN CODE: 0"
        );
    }

    #[test]
    fn test_timeout() {
        assert_eq!(
            render(&ExecutionOutcome::TimedOut { limit_secs: 1 }),
            "ERROR: Command timed out after 1 seconds."
        );
    }

    #[test]
    fn test_denied_and_spawn_failed() {
        assert_eq!(
            render(&ExecutionOutcome::Denied(Denial::NotWhitelisted("rm".into()))),
            "ERROR: Command 'rm' is not allowed by server whitelist."
        );
        assert_eq!(
            render(&ExecutionOutcome::SpawnFailed {
                reason: "Failed to spawn command: boom".into()
            }),
            "ERROR: Failed to spawn command: boom"
        );
    }
}
