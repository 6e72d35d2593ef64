//! # Trails Runtime
//!
//! An application bootstrapping runtime: it assembles a set of pluggable
//! extension modules ("packs"), wires them into a deterministic,
//! event-synchronized startup/shutdown sequence, and exposes a shared,
//! sealed-after-activation configuration and registry surface to all of
//! them.
//!
//! ## Architecture Overview
//!
//! The crate separates concerns into three layers:
//!
//! 1. **Primitives** ([`event`], [`barrier`]) — an ordered listener bus and
//!    the `after`/`once_any` combinators that compose independently
//!    completing events into "wait for all" / "wait for any" gates.
//! 2. **Assembly** ([`config`], [`env`], [`paths`], [`registry`]) — the
//!    construction-time pipeline: environment snapshot, config merge,
//!    default paths, and the four bound operation registries.
//! 3. **Orchestration** ([`pack`], [`coordinator`], [`runtime`]) — the
//!    [`Pack`] contract, the phase coordinator that drives every pack from
//!    `validate` through `initialize` in dependency order, and the
//!    [`Runtime`] context with its `start()`/`stop()` entry points.
//!
//! ## Lifecycle
//!
//! ```text
//! Runtime::build:
//!     validate options → snapshot env → merge config → default paths
//!     → bind registries → construct packs (ordered, atomic)
//!
//! start():
//!     wire phases (cycle check) → init translator → emit trails:start
//!     → validate* → configure* → [seal config] → initialize* → trails:ready
//!
//! stop():
//!     emit trails:stop → unbind wiring → unload all packs (concurrent)
//! ```
//!
//! A stopped runtime can be started again; the coordinator re-wires from a
//! clean slate, so listeners from an earlier cycle never fire twice.
//!
//! ## Quick Start
//!
//! ```no_run
//! use serde_json::json;
//! use std::sync::Arc;
//! use trails_runtime::{ApiResources, AppOptions, PackageMeta, Runtime, TracingLogger};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut options = AppOptions::new(json!({ "main": { "maxListeners": 32 } }));
//!     options.pkg = Some(PackageMeta {
//!         name: "demo".into(),
//!         version: "0.1.0".into(),
//!         description: None,
//!     });
//!     options.api = Some(ApiResources::default());
//!     options.logger = Some(Arc::new(TracingLogger));
//!
//!     let runtime = Runtime::build(options)?;
//!     runtime.start().await?;
//!     runtime.stop(None).await?;
//!     Ok(())
//! }
//! ```

pub mod barrier;
pub mod config;
pub mod coordinator;
pub mod env;
pub mod error;
pub mod event;
pub mod logger;
pub mod pack;
pub mod paths;
pub mod registry;
pub mod runtime;
pub mod tracing;
pub mod translate;

pub use barrier::{Barrier, EventSet, Signal};
pub use config::Config;
pub use env::{EnvProvider, EnvSnapshot, FixedEnv, SystemEnv};
pub use error::{BoxError, RuntimeError};
pub use event::{EventBus, ListenerGuard, ListenerId};
pub use logger::{Logger, TracingLogger};
pub use pack::{Pack, PackConstructor, Phase};
pub use registry::{ApiResources, OperationTable, RawDefinition, Registries, Registry};
pub use runtime::{AppOptions, PackageMeta, Runtime};
pub use translate::{NoopTranslator, TranslateFn, Translator};
