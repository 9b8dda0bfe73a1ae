//! Mutable, user-level view of the process environment.

use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Session state shared by the prompt loop and the commands it runs.
///
/// The environment contains:
/// - `vars`: environment variables visible to executed commands.
/// - `current_dir`: the working directory for command execution.
/// - `history`: the append-only log of display-form lines, one per submitted
///   prompt cycle, never pruned during a session.
/// - `should_exit`: set by the `exit` builtin; the prompt loop checks it to
///   know when to terminate.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Key-value store of environment variables (e.g., PATH, HOME).
    pub vars: HashMap<String, String>,
    /// The current working directory for command execution.
    pub current_dir: PathBuf,
    /// Display-form lines in submission order, zero-indexed by `history`.
    pub history: Vec<String>,
    /// When set to true, indicates that the interactive loop should exit.
    pub should_exit: bool,
}

impl Environment {
    /// Capture the current process state into a new `Environment`.
    ///
    /// Variables are copied from `std::env::vars()` and `current_dir` from
    /// `std::env::current_dir()`. History starts empty.
    pub fn new() -> Self {
        let mut vars = HashMap::new();
        for (k, v) in stdenv::vars() {
            vars.insert(k, v);
        }
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars,
            current_dir,
            history: Vec::new(),
            should_exit: false,
        }
    }

    /// Get the value of an environment variable.
    ///
    /// Looks up the key in `self.vars` first, falling back to `std::env::var`.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    /// Set or override an environment variable in `self.vars`.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Append one submitted line (display form) to the history log.
    pub fn record_history(&mut self, line: impl Into<String>) {
        self.history.push(line.into());
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
