//! Shell-style word splitting of the raw command line

use crate::error::Denial;

/// Non-empty token list. The first token is the base command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSequence {
    tokens: Vec<String>,
}

impl TokenSequence {
    /// Base command as typed, directory prefix included
    pub fn program(&self) -> &str {
        &self.tokens[0]
    }

    /// Base command with any directory prefix stripped
    pub fn base_name(&self) -> &str {
        base_name(self.program())
    }

    /// Everything after the base command
    pub fn args(&self) -> &[String] {
        &self.tokens[1..]
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Always false; an empty line never produces a sequence.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn into_args(mut self) -> Vec<String> {
        self.tokens.split_off(1)
    }
}

/// Split `line` honoring single quotes, double quotes and backslash escapes.
///
/// Metacharacters such as `|` or `>` come back as ordinary tokens.
pub fn tokenize(line: &str) -> Result<TokenSequence, Denial> {
    let tokens =
        shell_words::split(line).map_err(|e| Denial::MalformedCommand(e.to_string()))?;

    if tokens.is_empty() {
        return Err(Denial::EmptyCommand);
    }

    Ok(TokenSequence { tokens })
}

/// Final `/`-separated component of a command path
pub fn base_name(program: &str) -> &str {
    program.rsplit('/').next().unwrap_or(program)
}
