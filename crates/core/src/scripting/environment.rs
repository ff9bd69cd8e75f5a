//! Environment variables injected into every worker process.
//!
//! An [`EnvironmentContext`] is built once at startup from process-wide
//! configuration and shared read-only by all jobs. Workers inherit the
//! server's environment and additionally receive exactly these variables.

use tokio::process::Command;

/// Connection string of the movie database, read by the workers.
pub const DATABASE_URI_VAR: &str = "MONGODB_URI";

/// Name of the movie database, read by the workers.
pub const DATABASE_NAME_VAR: &str = "DB_NAME";

/// Immutable snapshot of the variables passed to worker processes.
///
/// Keys are unique and keep their insertion order. A configured variable
/// whose value is unknown is still present, mapped to the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentContext {
    vars: Vec<(String, String)>,
}

impl EnvironmentContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a variable. `None` maps to the empty string.
    pub fn with_var(mut self, key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        let key = key.into();
        let value = value.map(Into::into).unwrap_or_default();
        match self.vars.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => self.vars.push((key, value)),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Keys whose value is empty (unset in the configuration).
    pub fn empty_keys(&self) -> impl Iterator<Item = &str> {
        self.vars
            .iter()
            .filter(|(_, v)| v.is_empty())
            .map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Set every variable on `cmd`, on top of the inherited environment.
    pub fn apply(&self, cmd: &mut Command) {
        cmd.envs(self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
