//! # Environment Provider & Snapshot
//!
//! The runtime never reads the process environment directly; it goes through
//! an injectable [`EnvProvider`] so tests can supply a fixed environment
//! without mutating real global state. The provider is consulted exactly
//! once, at construction, producing an immutable [`EnvSnapshot`].

use std::collections::BTreeMap;

/// Environment variable selecting the run mode.
pub const RUN_MODE_VAR: &str = "TRAILS_ENV";

/// Run mode applied when [`RUN_MODE_VAR`] is unset at construction time.
pub const DEFAULT_RUN_MODE: &str = "development";

/// Source of environment variables for a runtime under construction.
pub trait EnvProvider: Send + Sync {
    /// Flat copy of the environment as seen right now.
    fn snapshot(&self) -> BTreeMap<String, String>;

    /// Ensures the run-mode variable has a value, returning it. Providers
    /// backed by the real process environment apply the development default
    /// as a process-wide side effect; fixed providers only report it.
    fn ensure_run_mode(&self) -> String;
}

/// Provider backed by the real process environment.
///
/// This is the one place the core mutates global state: an unset run-mode
/// variable is written back to the process environment.
pub struct SystemEnv;

impl EnvProvider for SystemEnv {
    fn snapshot(&self) -> BTreeMap<String, String> {
        std::env::vars().collect()
    }

    fn ensure_run_mode(&self) -> String {
        match std::env::var(RUN_MODE_VAR) {
            Ok(mode) if !mode.is_empty() => mode,
            _ => {
                std::env::set_var(RUN_MODE_VAR, DEFAULT_RUN_MODE);
                DEFAULT_RUN_MODE.to_string()
            }
        }
    }
}

/// Fixed provider for tests: a plain map, no global state involved.
pub struct FixedEnv {
    vars: BTreeMap<String, String>,
}

impl FixedEnv {
    pub fn new(vars: BTreeMap<String, String>) -> Self {
        Self { vars }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl EnvProvider for FixedEnv {
    fn snapshot(&self) -> BTreeMap<String, String> {
        self.vars.clone()
    }

    fn ensure_run_mode(&self) -> String {
        self.vars
            .get(RUN_MODE_VAR)
            .cloned()
            .unwrap_or_else(|| DEFAULT_RUN_MODE.to_string())
    }
}

/// Deep-copied, frozen view of the environment at construction time.
///
/// Later mutation of the real process environment is invisible through the
/// snapshot, and the snapshot itself exposes no mutation API.
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
    run_mode: String,
}

impl EnvSnapshot {
    pub fn new(vars: BTreeMap<String, String>) -> Self {
        let run_mode = vars
            .get(RUN_MODE_VAR)
            .cloned()
            .unwrap_or_else(|| DEFAULT_RUN_MODE.to_string());
        Self { vars, run_mode }
    }

    /// Captures a snapshot through a provider, fixing the run mode first so
    /// the snapshot always carries one.
    pub fn capture(provider: &dyn EnvProvider) -> Self {
        let run_mode = provider.ensure_run_mode();
        let mut vars = provider.snapshot();
        vars.entry(RUN_MODE_VAR.to_string())
            .or_insert_with(|| run_mode.clone());
        Self { vars, run_mode }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.vars.iter()
    }

    pub fn run_mode(&self) -> &str {
        &self.run_mode
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_env_reports_default_run_mode_without_side_effects() {
        let provider = FixedEnv::from_pairs([("HOME", "/home/u")]);
        let snapshot = EnvSnapshot::capture(&provider);
        assert_eq!(snapshot.run_mode(), DEFAULT_RUN_MODE);
        assert_eq!(snapshot.get(RUN_MODE_VAR), Some(DEFAULT_RUN_MODE));
        assert_eq!(snapshot.get("HOME"), Some("/home/u"));
    }

    #[test]
    fn fixed_env_respects_explicit_run_mode() {
        let provider = FixedEnv::from_pairs([(RUN_MODE_VAR, "production")]);
        let snapshot = EnvSnapshot::capture(&provider);
        assert_eq!(snapshot.run_mode(), "production");
    }
}
