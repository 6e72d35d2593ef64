//! Sample packs: a datastore pack that extends the configuration, and a
//! router pack that depends on it and consumes the sealed result.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use trails_runtime::{BoxError, Pack, Runtime};

/// Writes its connection settings into the configuration during
/// `configure`, then keeps a heartbeat timer alive once initialized.
pub struct DatastorePack;

#[async_trait]
impl Pack for DatastorePack {
    fn name(&self) -> &str {
        "datastore"
    }

    async fn configure(&self, ctx: &Runtime) -> Result<(), BoxError> {
        if ctx.config().get("datastore.url").is_none() {
            ctx.config().set("datastore.url", json!("memory://local"))?;
        }
        Ok(())
    }

    async fn initialize(&self, ctx: &Runtime) -> Result<(), BoxError> {
        let url = ctx
            .config()
            .get("datastore.url")
            .ok_or("datastore.url missing after configure")?;
        debug!(%url, "datastore connected");

        ctx.register_timer(
            "datastore:heartbeat",
            tokio::spawn(async {
                let mut tick = tokio::time::interval(Duration::from_secs(30));
                loop {
                    tick.tick().await;
                    debug!("datastore heartbeat");
                }
            }),
        );
        Ok(())
    }

    async fn unload(&self, _ctx: &Runtime) -> Result<(), BoxError> {
        debug!("datastore disconnected");
        Ok(())
    }
}

/// Depends on the datastore pack: its phases run only after the
/// datastore has completed the same phase.
pub struct RouterPack;

#[async_trait]
impl Pack for RouterPack {
    fn name(&self) -> &str {
        "router"
    }

    fn dependencies(&self) -> Vec<String> {
        vec!["datastore".to_string()]
    }

    async fn validate(&self, ctx: &Runtime) -> Result<(), BoxError> {
        ctx.models()
            .get("user")
            .ok_or("router requires a 'user' model")?;
        Ok(())
    }

    async fn initialize(&self, ctx: &Runtime) -> Result<(), BoxError> {
        // the datastore settings are guaranteed sealed and present here
        let url = ctx
            .config()
            .get("datastore.url")
            .ok_or("router cannot route without a datastore")?;
        debug!(%url, "router mounted");
        Ok(())
    }
}
