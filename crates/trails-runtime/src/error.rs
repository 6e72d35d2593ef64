//! # Runtime Errors
//!
//! This module defines the common error types used throughout the runtime.
//! Construction-time configuration errors carry exact identities so callers
//! can match on *which* required field was missing, not just "it threw".

/// Boxed error type used at the pack and collaborator seams.
///
/// Packs and collaborators (translator, pack constructors) define their own
/// error types; they cross into the runtime as trait objects, mirroring how
/// entity errors are carried rather than unified into one enum.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while assembling, starting, or stopping a runtime.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Construction input had no package metadata.
    #[error("package metadata (pkg) not defined")]
    PackageNotDefined,
    /// Construction input had no api resource bundle.
    #[error("api resource bundle not defined")]
    ApiNotDefined,
    /// Construction input had no logging collaborator.
    #[error("logger not defined in config")]
    LoggerNotDefined,
    /// The declared pack dependency graph contains a cycle.
    ///
    /// Detected at wiring time, before any lifecycle event is emitted. The
    /// payload names the packs still locked in the cycle.
    #[error("dependency cycle among packs: {0:?}")]
    DependencyCycle(Vec<String>),
    /// A pack declared a dependency on a pack that was never loaded.
    #[error("pack '{pack}' depends on unknown pack '{dependency}'")]
    UnknownDependency { pack: String, dependency: String },
    /// A pack constructor failed; runtime construction aborts atomically.
    #[error("pack '{name}' failed to construct: {source}")]
    PackConstruction {
        name: String,
        #[source]
        source: BoxError,
    },
    /// A pack lifecycle phase failed after `start()` was invoked.
    #[error("lifecycle failure: {0}")]
    Lifecycle(String),
    /// The translation collaborator failed to initialize; fatal to startup.
    #[error("translator initialization failed: {0}")]
    TranslatorInit(#[source] BoxError),
    /// A write was attempted against the configuration after it was sealed.
    #[error("configuration is sealed and can no longer be modified")]
    ConfigSealed,
    /// The event bus side of a barrier was torn down before it settled.
    #[error("event bus dropped before the barrier settled")]
    BarrierDropped,
    /// A pack's unload operation failed during `stop()`.
    #[error("pack '{name}' failed to unload: {source}")]
    PackUnload {
        name: String,
        #[source]
        source: BoxError,
    },
    /// An operation table was asked for an operation it does not expose.
    #[error("registry table '{table}' has no operation '{operation}'")]
    UnknownOperation { table: String, operation: String },
    /// Default filesystem paths could not be resolved.
    #[error("failed to resolve default paths: {0}")]
    Paths(#[from] std::io::Error),
}
