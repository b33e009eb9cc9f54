//! Request pipeline: tokenize, check policy, filter, resolve, execute, render

use crate::config::{ConfigError, GatewayConfig};
use crate::error::Denial;
use crate::executor::{ExecutionOutcome, ExecutionPlan, Executor};
use crate::filter::ArgumentFilter;
use crate::format;
use crate::policy::{self, Decision, PolicyMode};
use crate::resolver::BinaryResolver;
use crate::tokenizer;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// A single command line submitted by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Raw command line
    pub line: String,

    /// Requested timeout; `None` uses the configured default
    pub timeout_secs: Option<u64>,
}

impl CommandRequest {
    pub fn new(line: impl Into<String>) -> Self {
        Self {
            line: line.into(),
            timeout_secs: None,
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }
}

/// Validates and runs command lines under a fixed policy.
///
/// Holds no mutable state, so one instance can serve any number of
/// concurrent requests behind an `Arc`.
#[derive(Debug, Clone)]
pub struct CommandGateway {
    config: GatewayConfig,
    filter: ArgumentFilter,
    resolver: BinaryResolver,
    executor: Executor,
}

impl CommandGateway {
    /// Build a gateway from a validated configuration
    pub fn new(config: GatewayConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut resolver = match &config.search_path {
            Some(paths) => BinaryResolver::with_search_path(paths),
            None => BinaryResolver::new(),
        };
        if let Some(ref wd) = config.working_dir {
            resolver = resolver.with_cwd(wd);
        }

        Ok(Self {
            filter: ArgumentFilter::new(config.filter.clone()),
            executor: Executor::new(config.working_dir.clone()),
            resolver,
            config,
        })
    }

    pub fn unrestricted() -> Self {
        Self::from_valid(GatewayConfig::unrestricted())
    }

    pub fn whitelisted() -> Self {
        Self::from_valid(GatewayConfig::whitelisted())
    }

    // Stock configurations always validate.
    fn from_valid(config: GatewayConfig) -> Self {
        Self {
            filter: ArgumentFilter::new(config.filter.clone()),
            resolver: BinaryResolver::new(),
            executor: Executor::default(),
            config,
        }
    }

    pub fn mode(&self) -> PolicyMode {
        self.config.mode
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Validate `line` and build what would be spawned, without spawning.
    pub fn plan(&self, line: &str) -> Result<ExecutionPlan, Denial> {
        let tokens = tokenizer::tokenize(line)?;
        debug!("Tokenized into {} tokens", tokens.len());

        if let Decision::Deny(denial) =
            policy::decide(tokens.program(), self.config.mode, &self.config.whitelist)
        {
            return Err(denial);
        }

        match self.config.mode {
            PolicyMode::Unrestricted => Ok(ExecutionPlan::Shell {
                command_line: line.to_string(),
            }),
            PolicyMode::Whitelisted => {
                self.filter.check(tokens.args())?;

                // argv[0] is re-resolved from the bare name; the typed path is dropped
                let program = self.resolver.resolve(tokens.base_name())?;

                Ok(ExecutionPlan::Direct {
                    program,
                    args: tokens.into_args(),
                })
            }
        }
    }

    /// Run a request through the whole pipeline
    pub async fn handle(&self, request: &CommandRequest) -> ExecutionOutcome {
        let timeout_secs = self.config.clamp_timeout(request.timeout_secs);

        let plan = match self.plan(&request.line) {
            Ok(plan) => plan,
            Err(denial) => {
                warn!(kind = denial.kind(), "Command denied: {}", denial);
                return ExecutionOutcome::Denied(denial);
            }
        };

        info!(
            "Executing {} command with {}s timeout: {}",
            self.config.mode,
            timeout_secs,
            plan.describe()
        );

        self.executor.execute(&plan, timeout_secs).await
    }

    /// Run `command` and return the formatted result text. Never fails.
    pub async fn run_command(&self, command: &str, timeout_secs: Option<u64>) -> String {
        let request = CommandRequest {
            line: command.to_string(),
            timeout_secs,
        };
        format::render(&self.handle(&request).await)
    }

    /// Blocking variant of [`run_command`](Self::run_command) for hosts
    /// without an async runtime.
    pub fn run_command_blocking(&self, command: &str, timeout_secs: Option<u64>) -> String {
        if tokio::runtime::Handle::try_current().is_ok() {
            return format::render(&ExecutionOutcome::SpawnFailed {
                reason: "Blocking execution is not available inside an async runtime".to_string(),
            });
        }

        match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(self.run_command(command, timeout_secs)),
            Err(e) => format::render(&ExecutionOutcome::SpawnFailed {
                reason: format!("Failed to start runtime: {}", e),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ArgRule;
    use crate::policy::Whitelist;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_gateway_is_shareable() {
        assert_send_sync::<CommandGateway>();
    }

    #[test]
    fn test_unrestricted_plan_keeps_raw_line() {
        let gateway = CommandGateway::unrestricted();
        assert_eq!(
            gateway.plan("ps aux | grep init"),
            Ok(ExecutionPlan::Shell {
                command_line: "ps aux | grep init".to_string()
            })
        );
    }

    #[test]
    fn test_unrestricted_still_rejects_malformed_lines() {
        let gateway = CommandGateway::unrestricted();
        assert_eq!(gateway.plan("  "), Err(Denial::EmptyCommand));
        assert!(matches!(
            gateway.plan("echo 'open"),
            Err(Denial::MalformedCommand(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_whitelisted_plan_resolves_binary() {
        let gateway = CommandGateway::whitelisted();
        match gateway.plan("/tmp/somewhere/uname -a") {
            Ok(ExecutionPlan::Direct { program, args }) => {
                assert!(program.is_absolute());
                assert!(program.ends_with("uname"));
                assert!(!program.starts_with("/tmp/somewhere"));
                assert_eq!(args, vec!["-a".to_string()]);
            }
            other => panic!("unexpected plan: {:?}", other),
        }
    }

    #[test]
    fn test_whitelisted_denials() {
        let gateway = CommandGateway::whitelisted();

        assert_eq!(
            gateway.plan("rm -rf /"),
            Err(Denial::NotWhitelisted("rm".to_string()))
        );
        assert_eq!(
            gateway.plan("cat ../../etc/passwd"),
            Err(Denial::UnsafeArgument {
                arg: "../../etc/passwd".to_string(),
                rule: ArgRule::PathTraversal,
            })
        );
        assert_eq!(
            gateway.plan("find . -exec rm {} +"),
            Err(Denial::UnsafeArgument {
                arg: "-exec".to_string(),
                rule: ArgRule::ExecFlag,
            })
        );
    }

    #[test]
    fn test_filter_runs_before_resolution() {
        let config = GatewayConfig::whitelisted()
            .with_whitelist(Whitelist::empty().with_command("not-installed-anywhere"));
        let gateway = CommandGateway::new(config).unwrap();

        assert!(matches!(
            gateway.plan("not-installed-anywhere a;b"),
            Err(Denial::UnsafeArgument { .. })
        ));
        assert_eq!(
            gateway.plan("not-installed-anywhere ok"),
            Err(Denial::BinaryNotFound("not-installed-anywhere".to_string()))
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = GatewayConfig::whitelisted();
        config.max_timeout_secs = 0;
        assert!(CommandGateway::new(config).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_blocking_run() {
        let gateway = CommandGateway::unrestricted();
        assert_eq!(
            gateway.run_command_blocking("echo hi", None),
            "STDOUT:\nhi\n\nRETURN CODE: 0"
        );
    }

    #[tokio::test]
    async fn test_blocking_run_inside_runtime_is_reported() {
        let gateway = CommandGateway::unrestricted();
        let text = gateway.run_command_blocking("echo hi", None);
        assert!(text.starts_with("ERROR: Blocking execution is not available"));
    }

    #[tokio::test]
    async fn test_denied_request_outcome() {
        let gateway = CommandGateway::whitelisted();
        let outcome = gateway
            .handle(&CommandRequest::new("shutdown -h now").with_timeout(1))
            .await;
        assert_eq!(
            outcome,
            ExecutionOutcome::Denied(Denial::NotWhitelisted("shutdown".to_string()))
        );
    }
}
