//! Search-path lookup of whitelisted binaries

use crate::error::Denial;
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::debug;

/// Resolves a base command name to an absolute executable path
#[derive(Debug, Clone, Default)]
pub struct BinaryResolver {
    search_path: Option<OsString>,
    cwd: Option<PathBuf>,
}

impl BinaryResolver {
    /// Resolver over the process `PATH`
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver over an explicit `PATH`-style list of directories
    pub fn with_search_path(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(search_path.into()),
            cwd: None,
        }
    }

    /// Directory used to anchor relative search-path entries
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Locate `name` on the search path.
    ///
    /// Only bare names are looked up; the caller strips directory prefixes so a
    /// path typed by the requester is never executed as-is.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, Denial> {
        if name.is_empty() {
            return Err(Denial::BinaryNotFound(name.to_string()));
        }

        let found = match &self.search_path {
            Some(paths) => {
                let cwd = match &self.cwd {
                    Some(dir) => dir.clone(),
                    None => std::env::current_dir()
                        .map_err(|_| Denial::BinaryNotFound(name.to_string()))?,
                };
                which::which_in(name, Some(paths), cwd)
            }
            None => which::which(name),
        };

        let path = found.map_err(|_| Denial::BinaryNotFound(name.to_string()))?;
        debug!("Resolved {} to {}", name, path.display());

        // which can hand back a relative path when a search-path entry is relative
        if path.is_absolute() {
            Ok(path)
        } else {
            std::fs::canonicalize(&path).map_err(|_| Denial::BinaryNotFound(name.to_string()))
        }
    }
}
