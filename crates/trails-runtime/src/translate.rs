//! Translation collaborator contract.
//!
//! Internationalization logic itself lives outside the core; only the
//! activation hook is here. During `start()` the runtime initializes the
//! collaborator against the assembled configuration and publishes the
//! resulting translation function onto the context. Initialization failure
//! is fatal to startup.

use crate::config::Config;
use crate::error::BoxError;
use async_trait::async_trait;
use std::sync::Arc;

/// Translation function published onto the runtime context once the
/// collaborator has initialized.
pub type TranslateFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// The translation collaborator seam.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Initializes against the merged configuration, yielding the
    /// translation function, or an error the runtime treats as fatal.
    async fn init(&self, config: &Config) -> Result<TranslateFn, BoxError>;
}

/// Identity translator used when no collaborator is supplied.
pub struct NoopTranslator;

#[async_trait]
impl Translator for NoopTranslator {
    async fn init(&self, _config: &Config) -> Result<TranslateFn, BoxError> {
        Ok(Arc::new(|key: &str| key.to_string()))
    }
}
