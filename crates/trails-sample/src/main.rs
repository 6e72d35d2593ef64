use serde_json::json;
use std::sync::Arc;
use tracing::info;
use trails_runtime::{AppOptions, PackageMeta, Runtime, TracingLogger};
use trails_sample::api::sample_api;
use trails_sample::packs::{DatastorePack, RouterPack};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    trails_runtime::tracing::setup_tracing();

    let mut options = AppOptions::new(json!({
        "main": { "maxListeners": 64 },
        "datastore": { "pool_size": 4 },
    }));
    options.pkg = Some(PackageMeta {
        name: "trails-sample".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        description: Some("sample application for the trails runtime".into()),
    });
    options.api = Some(sample_api());
    options.logger = Some(Arc::new(TracingLogger));
    options.packs.push(Box::new(|_ctx| Ok(Arc::new(DatastorePack) as _)));
    options.packs.push(Box::new(|_ctx| Ok(Arc::new(RouterPack) as _)));

    let runtime = Runtime::build(options)?;
    runtime.start().await?;
    info!("runtime ready in {} mode", runtime.env().run_mode());

    let user = runtime
        .models()
        .get("user")
        .ok_or("user model missing")?;
    let query = user.invoke("find_query", &[json!(42)])?;
    info!("lookup for user 42: {query}");
    info!("{}", runtime.translate("ready"));

    runtime.stop(None).await?;
    Ok(())
}
