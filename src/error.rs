//! Denial taxonomy shared by every validation stage

use crate::filter::ArgRule;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reason a request was refused before any process was spawned.
///
/// The `Display` text is what the caller sees after the `ERROR: ` prefix.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Denial {
    #[error("No command provided.")]
    EmptyCommand,

    #[error("Malformed command line: {0}")]
    MalformedCommand(String),

    #[error("Command '{0}' is not allowed by server whitelist.")]
    NotWhitelisted(String),

    #[error("Too many arguments (limit {limit}).")]
    TooManyArguments { limit: usize },

    #[error("Unsafe argument detected: {arg} ({rule})")]
    UnsafeArgument { arg: String, rule: ArgRule },

    #[error("Command '{0}' not found on server PATH.")]
    BinaryNotFound(String),
}

impl Denial {
    /// Taxonomy class of this denial
    pub fn kind(&self) -> &'static str {
        match self {
            Denial::EmptyCommand | Denial::MalformedCommand(_) => "malformed_input",
            Denial::NotWhitelisted(_) => "policy_denied",
            Denial::TooManyArguments { .. } | Denial::UnsafeArgument { .. } => "argument_denied",
            Denial::BinaryNotFound(_) => "binary_not_found",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denial_messages() {
        assert_eq!(Denial::EmptyCommand.to_string(), "No command provided.");
        assert_eq!(
            Denial::NotWhitelisted("rm".to_string()).to_string(),
            "Command 'rm' is not allowed by server whitelist."
        );
        assert_eq!(
            Denial::TooManyArguments { limit: 30 }.to_string(),
            "Too many arguments (limit 30)."
        );
        assert_eq!(
            Denial::UnsafeArgument {
                arg: "../etc".to_string(),
                rule: ArgRule::PathTraversal,
            }
            .to_string(),
            "Unsafe argument detected: ../etc (path traversal)"
        );
    }

    #[test]
    fn test_denial_kinds() {
        assert_eq!(Denial::EmptyCommand.kind(), "malformed_input");
        assert_eq!(Denial::BinaryNotFound("ls".into()).kind(), "binary_not_found");
        assert_eq!(Denial::TooManyArguments { limit: 1 }.kind(), "argument_denied");
    }
}
