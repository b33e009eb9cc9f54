//! Policy mode and base-command whitelist

use crate::error::Denial;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Security posture of a gateway instance, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyMode {
    /// Any command, run through the platform shell
    Unrestricted,
    /// Approved base commands only, run without a shell
    Whitelisted,
}

impl PolicyMode {
    /// Timeout applied when the caller does not supply one
    pub fn default_timeout_secs(&self) -> u64 {
        match self {
            PolicyMode::Unrestricted => 15,
            PolicyMode::Whitelisted => 10,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PolicyMode::Unrestricted => "unrestricted",
            PolicyMode::Whitelisted => "whitelisted",
        }
    }
}

impl fmt::Display for PolicyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PolicyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unrestricted" => Ok(PolicyMode::Unrestricted),
            "whitelisted" | "whitelist" => Ok(PolicyMode::Whitelisted),
            other => Err(format!("unknown policy mode: {}", other)),
        }
    }
}

/// Outcome of the policy check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

/// Whitelist entry for a command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistEntry {
    /// Command name
    pub command: String,

    /// Description
    pub description: Option<String>,
}

/// Immutable set of approved base command names
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Whitelist {
    entries: BTreeMap<String, WhitelistEntry>,
}

// (name, description) pairs for the stock whitelist
const DEFAULT_COMMANDS: &[(&str, &str)] = &[
    // File listing and reading
    ("ls", "List directory contents"),
    ("cat", "Read file contents"),
    ("head", "Show file beginning"),
    ("tail", "Show file end"),
    ("less", "Page through a file"),
    ("file", "Identify file type"),
    ("stat", "File information"),
    ("readlink", "Resolve symbolic links"),
    ("find", "Find files"),
    // Text processing
    ("grep", "Search text patterns"),
    ("egrep", "Search extended patterns"),
    ("fgrep", "Search fixed strings"),
    ("wc", "Count words/lines"),
    ("sed", "Stream editor"),
    ("awk", "Pattern scanning"),
    ("cut", "Select columns"),
    ("sort", "Sort lines"),
    ("uniq", "Filter repeated lines"),
    ("tr", "Translate characters"),
    // Disks and mounts
    ("df", "Filesystem usage"),
    ("du", "Disk usage"),
    ("mount", "Mount filesystems"),
    ("umount", "Unmount filesystems"),
    // Processes and services
    ("ps", "Process snapshot"),
    ("top", "Process monitor"),
    ("journalctl", "Query the journal"),
    ("systemctl", "Control services"),
    // System identity
    ("uname", "Kernel information"),
    ("whoami", "Current user"),
    ("id", "User and group ids"),
    ("uptime", "Time since boot"),
    ("free", "Memory usage"),
    ("env", "Environment"),
    ("date", "Show date/time"),
    ("hostname", "Host name"),
    ("which", "Locate a command"),
    ("bash", "Bourne-again shell"),
    // Networking
    ("ip", "Network configuration"),
    ("ifconfig", "Interface configuration"),
    ("ss", "Socket statistics"),
    ("netstat", "Network statistics"),
];

impl Default for Whitelist {
    fn default() -> Self {
        Self::with_default_commands()
    }
}

impl Whitelist {
    /// Create an empty whitelist that denies everything
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Create whitelist with the stock system-inspection commands
    pub fn with_default_commands() -> Self {
        DEFAULT_COMMANDS
            .iter()
            .map(|(name, description)| WhitelistEntry {
                command: name.to_string(),
                description: Some(description.to_string()),
            })
            .collect()
    }

    /// Return a copy extended with `name`
    pub fn with_command(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let description = DEFAULT_COMMANDS
            .iter()
            .find(|(stock, _)| *stock == name)
            .map(|(_, description)| description.to_string());

        self.entries.insert(
            name.clone(),
            WhitelistEntry {
                command: name,
                description,
            },
        );
        self
    }

    /// Exact, case-sensitive membership
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&WhitelistEntry> {
        self.entries.get(name)
    }

    /// Sorted command names
    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = &WhitelistEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// Descriptions are informational; two whitelists are equal when they approve
// the same names.
impl PartialEq for Whitelist {
    fn eq(&self, other: &Self) -> bool {
        self.entries.keys().eq(other.entries.keys())
    }
}

impl Eq for Whitelist {}

impl FromIterator<WhitelistEntry> for Whitelist {
    fn from_iter<I: IntoIterator<Item = WhitelistEntry>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|entry| (entry.command.clone(), entry))
                .collect(),
        }
    }
}

impl<'a> FromIterator<&'a str> for Whitelist {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::empty(), |list, name| list.with_command(name))
    }
}

impl From<Vec<String>> for Whitelist {
    fn from(names: Vec<String>) -> Self {
        names.iter().map(String::as_str).collect()
    }
}

impl From<Whitelist> for Vec<String> {
    fn from(list: Whitelist) -> Self {
        list.entries.into_keys().collect()
    }
}

/// Decide whether `program` may run. Arguments are never inspected here.
///
/// In whitelisted mode only the final path component is compared, so
/// `/usr/bin/ls` and `ls` are the same request.
pub fn decide(program: &str, mode: PolicyMode, whitelist: &Whitelist) -> Decision {
    match mode {
        PolicyMode::Unrestricted => Decision::Allow,
        PolicyMode::Whitelisted => {
            let name = crate::tokenizer::base_name(program);
            if whitelist.contains(name) {
                Decision::Allow
            } else {
                Decision::Deny(Denial::NotWhitelisted(name.to_string()))
            }
        }
    }
}
