//! # Configuration Assembly
//!
//! Merges the raw configuration tree supplied at construction with the
//! frozen environment snapshot, and wraps the result in [`Config`], a value
//! type that stays mutable through the `configured` lifecycle phase and is
//! sealed — structurally immutable — once every pack has reported that
//! milestone.
//!
//! Sealing is enforced, not advisory: a post-seal write returns
//! [`RuntimeError::ConfigSealed`]. The runtime never exposes a way to swap
//! the configuration reference itself.

use crate::env::EnvSnapshot;
use crate::error::RuntimeError;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// Namespace under which the environment snapshot is merged into the tree.
pub const ENV_NAMESPACE: &str = "env";

/// Structural fail-fast validation of the raw configuration tree.
///
/// Collaborator presence (logger, package metadata, api bundle) is checked
/// separately on the typed construction options; this guards the shape of
/// the tree itself.
pub fn validate_config(raw: &Value) -> Result<(), RuntimeError> {
    let tree = raw
        .as_object()
        .ok_or_else(|| RuntimeError::Lifecycle("config must be a JSON object".into()))?;
    if let Some(main) = tree.get("main") {
        if let Some(packs) = main.get("packs") {
            if !packs.is_array() {
                return Err(RuntimeError::Lifecycle(
                    "config main.packs must be an array".into(),
                ));
            }
        }
    }
    Ok(())
}

/// Produces a new tree with the environment snapshot deep-merged under the
/// [`ENV_NAMESPACE`] key. Neither input is mutated; all other fields of the
/// raw tree pass through verbatim.
pub fn build_config(raw: &Value, env: &EnvSnapshot) -> Value {
    let mut tree = raw.clone();
    if !tree.is_object() {
        tree = Value::Object(Map::new());
    }
    let mut env_tree = Map::new();
    for (key, value) in env.iter() {
        env_tree.insert(key.clone(), Value::String(value.clone()));
    }
    let slot = tree
        .as_object_mut()
        .unwrap()
        .entry(ENV_NAMESPACE.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    deep_merge(slot, Value::Object(env_tree));
    tree
}

/// Deep-merges `overlay` into `base`: objects merge key-by-key recursively,
/// anything else is replaced by the overlay.
fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => deep_merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, overlay) => *slot = overlay,
    }
}

/// The sealed-configuration value type.
///
/// Mutable through dot-path [`Config::set`] until [`Config::seal`] is
/// called; read access is unaffected by sealing.
pub struct Config {
    tree: RwLock<Value>,
    sealed: AtomicBool,
}

impl Config {
    pub fn new(tree: Value) -> Self {
        Self {
            tree: RwLock::new(tree),
            sealed: AtomicBool::new(false),
        }
    }

    /// Reads the value at a dot-separated path, e.g. `main.paths.root`.
    pub fn get(&self, path: &str) -> Option<Value> {
        let tree = self.tree.read().unwrap();
        let mut node = &*tree;
        for segment in path.split('.') {
            node = node.get(segment)?;
        }
        Some(node.clone())
    }

    /// Writes `value` at a dot-separated path, creating intermediate objects
    /// as needed. Fails once the configuration is sealed.
    pub fn set(&self, path: &str, value: Value) -> Result<(), RuntimeError> {
        if self.is_sealed() {
            return Err(RuntimeError::ConfigSealed);
        }
        let mut tree = self.tree.write().unwrap();
        let mut node = &mut *tree;
        let segments: Vec<&str> = path.split('.').collect();
        for segment in &segments[..segments.len() - 1] {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            node = node
                .as_object_mut()
                .unwrap()
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        node.as_object_mut()
            .unwrap()
            .insert(segments[segments.len() - 1].to_string(), value);
        Ok(())
    }

    /// Makes the tree structurally immutable. Idempotent.
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::SeqCst);
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::SeqCst)
    }

    /// Snapshot of the whole tree, for collaborators that take the
    /// configuration wholesale (e.g. translator initialization).
    pub fn tree(&self) -> Value {
        self.tree.read().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn snapshot(pairs: &[(&str, &str)]) -> EnvSnapshot {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvSnapshot::new(map)
    }

    #[test]
    fn build_config_merges_env_without_mutating_inputs() {
        let raw = json!({ "main": { "maxListeners": 16 }, "custom": "kept" });
        let env = snapshot(&[("TRAILS_ENV", "development"), ("HOME", "/home/u")]);
        let merged = build_config(&raw, &env);
        assert_eq!(merged["custom"], json!("kept"));
        assert_eq!(merged["main"]["maxListeners"], json!(16));
        assert_eq!(merged["env"]["TRAILS_ENV"], json!("development"));
        assert_eq!(merged["env"]["HOME"], json!("/home/u"));
        // raw tree untouched
        assert!(raw.get("env").is_none());
    }

    #[test]
    fn build_config_preserves_existing_env_fields() {
        let raw = json!({ "env": { "custom": "field" } });
        let env = snapshot(&[("TRAILS_ENV", "production")]);
        let merged = build_config(&raw, &env);
        assert_eq!(merged["env"]["custom"], json!("field"));
        assert_eq!(merged["env"]["TRAILS_ENV"], json!("production"));
    }

    #[test]
    fn validate_config_rejects_non_object_trees() {
        assert!(validate_config(&json!("nope")).is_err());
        assert!(validate_config(&json!({ "main": { "packs": "nope" } })).is_err());
        assert!(validate_config(&json!({ "main": { "packs": [] } })).is_ok());
    }

    #[test]
    fn set_creates_nested_paths_and_seal_rejects_writes() {
        let config = Config::new(json!({}));
        config.set("main.paths.root", json!("/srv/app")).unwrap();
        assert_eq!(config.get("main.paths.root"), Some(json!("/srv/app")));

        config.seal();
        let err = config.set("main.paths.root", json!("/other")).unwrap_err();
        assert!(matches!(err, RuntimeError::ConfigSealed));
        // reads survive sealing unchanged
        assert_eq!(config.get("main.paths.root"), Some(json!("/srv/app")));
    }
}
