//! Cart store errors.

use thiserror::Error;

use crate::{api::ApiError, storage::StorageError};

#[derive(Debug, Error)]
pub enum CartStoreError {
    #[error("no cart to operate on")]
    NoCart,

    #[error("cart request failed")]
    Api(#[from] ApiError),

    #[error("cart storage failed")]
    Storage(#[from] StorageError),
}

impl CartStoreError {
    /// Message suitable for showing to a shopper.
    pub fn user_message(&self) -> String {
        match self {
            Self::NoCart => "Your cart is empty.".to_string(),
            Self::Api(source) => source.user_message(),
            Self::Storage(source) => source.to_string(),
        }
    }
}
