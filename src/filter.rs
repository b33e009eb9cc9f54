//! Argument filtering for whitelisted execution
//!
//! Every argument is scanned left to right against an ordered rule list. The
//! first rule that fires on the first offending argument becomes the denial.

use crate::error::Denial;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters that carry meaning to a shell
pub const DEFAULT_DENIED_CHARS: &str = ";&|<>$`\\";
pub const DEFAULT_MAX_ARGS: usize = 30;
pub const DEFAULT_MAX_ARG_LEN: usize = 1024;

// `-exec`/`--exec` as a standalone flag, also when embedded after whitespace
// inside a quoted token. `-execdir` and `foo-exec` do not match.
static EXEC_FLAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^\w-])--?exec\b").expect("exec flag pattern is valid")
});

/// Argument filter limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Maximum number of arguments after the base command
    pub max_args: usize,

    /// Maximum length of a single argument, in characters
    pub max_arg_len: usize,

    /// Any of these characters rejects the argument
    pub denied_chars: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_args: DEFAULT_MAX_ARGS,
            max_arg_len: DEFAULT_MAX_ARG_LEN,
            denied_chars: DEFAULT_DENIED_CHARS.to_string(),
        }
    }
}

/// A single per-argument safety rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgRule {
    ShellMetacharacter,
    ExecFlag,
    PathTraversal,
    MaxLength,
}

impl ArgRule {
    /// Evaluation order
    pub const ALL: [ArgRule; 4] = [
        ArgRule::ShellMetacharacter,
        ArgRule::ExecFlag,
        ArgRule::PathTraversal,
        ArgRule::MaxLength,
    ];

    /// True when `arg` breaks this rule
    pub fn violated_by(&self, arg: &str, config: &FilterConfig) -> bool {
        match self {
            ArgRule::ShellMetacharacter => contains_shell_metacharacters(arg, &config.denied_chars),
            ArgRule::ExecFlag => EXEC_FLAG.is_match(arg),
            ArgRule::PathTraversal => arg.contains(".."),
            ArgRule::MaxLength => arg.chars().count() > config.max_arg_len,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ArgRule::ShellMetacharacter => "shell metacharacter",
            ArgRule::ExecFlag => "exec flag",
            ArgRule::PathTraversal => "path traversal",
            ArgRule::MaxLength => "argument too long",
        }
    }
}

impl fmt::Display for ArgRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Check for shell metacharacters
fn contains_shell_metacharacters(s: &str, denied: &str) -> bool {
    s.chars().any(|c| denied.contains(c))
}

/// Ordered rule list plus the request-level argument count limit
#[derive(Debug, Clone)]
pub struct ArgumentFilter {
    config: FilterConfig,
    rules: Vec<ArgRule>,
}

impl Default for ArgumentFilter {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}

impl ArgumentFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            rules: ArgRule::ALL.to_vec(),
        }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// First rule `arg` violates, if any
    pub fn check_arg(&self, arg: &str) -> Option<ArgRule> {
        self.rules
            .iter()
            .copied()
            .find(|rule| rule.violated_by(arg, &self.config))
    }

    /// Accept or reject the whole argument list
    pub fn check(&self, args: &[String]) -> Result<(), Denial> {
        if args.len() > self.config.max_args {
            return Err(Denial::TooManyArguments {
                limit: self.config.max_args,
            });
        }

        for arg in args {
            if let Some(rule) = self.check_arg(arg) {
                return Err(Denial::UnsafeArgument {
                    arg: arg.clone(),
                    rule,
                });
            }
        }

        Ok(())
    }
}
