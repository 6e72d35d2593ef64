//! Default filesystem locations seeded into the configuration before any
//! pack constructor runs, so packs may read them during construction.

use crate::config::Config;
use crate::error::RuntimeError;
use serde_json::{json, Value};
use std::path::PathBuf;

/// Computes and injects default paths under `main.paths`.
///
/// The declared `main.paths.root` wins when present; otherwise the current
/// working directory is used. A declared root that is not a string is a
/// configuration error. Mutates the configuration in place, which is legal
/// here because the tree is not yet sealed.
pub fn create_default_paths(config: &Config) -> Result<(), RuntimeError> {
    let root = match config.get("main.paths.root") {
        Some(Value::String(declared)) => PathBuf::from(declared),
        Some(_) => {
            return Err(RuntimeError::Lifecycle(
                "config main.paths.root must be a string".into(),
            ))
        }
        None => std::env::current_dir()?,
    };

    config.set("main.paths.root", json!(root.to_string_lossy()))?;
    if config.get("main.paths.temp").is_none() {
        config.set("main.paths.temp", json!(root.join(".tmp").to_string_lossy()))?;
    }
    if config.get("main.paths.sockets").is_none() {
        config.set(
            "main.paths.sockets",
            json!(root.join(".tmp").join("sockets").to_string_lossy()),
        )?;
    }
    Ok(())
}
