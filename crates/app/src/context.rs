//! Storefront Context

use std::{fmt, sync::Arc};

use thiserror::Error;

use crate::{
    api::{HttpApiConfig, HttpStorefrontApi, StorefrontApi, models::OrderUuid},
    config::StorefrontConfig,
    domain::{
        carts::CartStore,
        checkout::IdempotencyKeys,
        payments::{PaymentPoller, PollerConfig, PollerError},
    },
    storage::{FileStore, KeyValueStore, StorageError},
};

#[derive(Debug, Error)]
pub enum ContextInitError {
    #[error("failed to open local state")]
    Storage(#[from] StorageError),

    #[error("invalid payment polling settings")]
    Polling(#[from] PollerError),
}

/// Wires the backend client and the two key-value stores into the
/// storefront components.
#[derive(Clone)]
pub struct StorefrontContext {
    pub api: Arc<dyn StorefrontApi>,
    pub local: Arc<dyn KeyValueStore>,
    pub session: Arc<dyn KeyValueStore>,
    pub polling: PollerConfig,
}

impl fmt::Debug for StorefrontContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorefrontContext")
            .field("polling", &self.polling)
            .finish_non_exhaustive()
    }
}

impl StorefrontContext {
    #[must_use]
    pub fn new(
        api: Arc<dyn StorefrontApi>,
        local: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
        polling: PollerConfig,
    ) -> Self {
        Self {
            api,
            local,
            session,
            polling,
        }
    }

    /// Build context from configuration, opening the file-backed stores in
    /// the state directory.
    ///
    /// # Errors
    ///
    /// Returns an error when either state file exists but cannot be read, or
    /// when the polling settings are zero.
    pub fn from_config(config: &StorefrontConfig) -> Result<Self, ContextInitError> {
        let api = HttpStorefrontApi::new(HttpApiConfig::from(&config.api));
        let local = FileStore::open(config.storage.local_path())?;
        let session = FileStore::open(config.storage.session_path())?;

        Ok(Self::new(
            Arc::new(api),
            Arc::new(local),
            Arc::new(session),
            PollerConfig::try_from(&config.polling)?,
        ))
    }

    /// A cart store over this context's backend and local storage.
    #[must_use]
    pub fn cart_store(&self) -> CartStore {
        CartStore::new(
            Arc::clone(&self.api),
            Arc::clone(&self.local),
            IdempotencyKeys::new(Arc::clone(&self.session)),
        )
    }

    /// A poller for the payment of `order`.
    #[must_use]
    pub fn payment_poller(&self, order: OrderUuid) -> PaymentPoller {
        PaymentPoller::new(Arc::clone(&self.api), order, self.polling)
    }
}
