//! Logging collaborator contract.
//!
//! The runtime requires a logger before anything else runs, since later
//! failure reporting depends on it; construction fails with
//! [`RuntimeError::LoggerNotDefined`](crate::RuntimeError::LoggerNotDefined)
//! when none is supplied. [`TracingLogger`] forwards to the `tracing`
//! subscriber and is the implementation most applications want.

/// Minimal logging surface consumed by the core for lifecycle tracing and
/// failure reporting.
pub trait Logger: Send + Sync {
    fn debug(&self, msg: &str);
    fn error(&self, msg: &str);
}

/// Logger backed by the `tracing` ecosystem.
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }
}
