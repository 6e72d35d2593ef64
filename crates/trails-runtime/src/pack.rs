//! # Pack Trait
//!
//! The contract every extension module ("pack") implements to be driven by
//! the runtime. A pack is instantiated exactly once per [`Runtime`] and then
//! progresses through the ordered lifecycle phases `validate` → `configure`
//! → `initialize`, with `unload` on shutdown.
//!
//! # Architecture Note
//! The runtime context is injected into every hook rather than stored by the
//! framework on the pack's behalf. Hooks default to `Ok(())`, so a pack only
//! implements the phases it participates in. Phase ordering across packs is
//! declared via [`Pack::dependencies`] — a pack's hook for a given phase runs
//! only after every named dependency has completed that same phase.

use crate::error::BoxError;
use crate::runtime::Runtime;
use async_trait::async_trait;
use std::sync::Arc;

/// Lifecycle phases a pack is driven through, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Validated,
    Configured,
    Initialized,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Validated, Phase::Configured, Phase::Initialized];

    /// Milestone suffix used in event names, e.g. `pack:router:configured`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Validated => "validated",
            Phase::Configured => "configured",
            Phase::Initialized => "initialized",
        }
    }
}

/// An extension module driven through ordered lifecycle phases.
#[async_trait]
pub trait Pack: Send + Sync {
    /// Unique pack name; also the key other packs use in
    /// [`Pack::dependencies`].
    fn name(&self) -> &str;

    /// Names of packs whose phase completion this pack waits for.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Sanity-check the environment and configuration.
    async fn validate(&self, _ctx: &Runtime) -> Result<(), BoxError> {
        Ok(())
    }

    /// Extend or adjust configuration. This is the last phase during which
    /// the configuration tree is still mutable.
    async fn configure(&self, _ctx: &Runtime) -> Result<(), BoxError> {
        Ok(())
    }

    /// Start the pack's runtime work. The configuration is sealed by the
    /// time this runs.
    async fn initialize(&self, _ctx: &Runtime) -> Result<(), BoxError> {
        Ok(())
    }

    /// Tear down during `stop()`. Unloading is unordered; all packs unload
    /// concurrently.
    async fn unload(&self, _ctx: &Runtime) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Constructor invoked once, synchronously, during runtime construction.
///
/// Constructors run in declaration order; later packs may assume earlier
/// ones already mutated the context. A constructor failure aborts runtime
/// construction atomically.
pub type PackConstructor = Box<dyn FnOnce(&Arc<Runtime>) -> Result<Arc<dyn Pack>, BoxError> + Send>;
