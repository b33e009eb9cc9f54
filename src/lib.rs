//! Command Gateway - validated command execution behind a single string contract
//!
//! This crate turns one command line into one result string:
//! - Shell-style tokenization
//! - Unrestricted (shell) or whitelisted (direct exec) policy
//! - Argument filtering against shell metacharacters, traversal and `-exec`
//! - Search-path resolution of approved binaries
//! - Timeouts that kill the whole process group

pub mod config;
pub mod error;
pub mod executor;
pub mod filter;
pub mod format;
pub mod gateway;
pub mod platform;
pub mod policy;
pub mod resolver;
pub mod tokenizer;

pub use config::{ConfigError, GatewayConfig};
pub use error::Denial;
pub use executor::{ExecutionOutcome, ExecutionPlan, Executor};
pub use filter::{ArgRule, ArgumentFilter, FilterConfig};
pub use format::render;
pub use gateway::{CommandGateway, CommandRequest};
pub use platform::Platform;
pub use policy::{decide, Decision, PolicyMode, Whitelist, WhitelistEntry};
pub use resolver::BinaryResolver;
pub use tokenizer::{tokenize, TokenSequence};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging on stderr, leaving stdout to result text
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "command_gateway=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
