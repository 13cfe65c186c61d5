//! Storefront configuration module

use clap::Args;

use crate::config::{
    api::ApiConfig, logging::LoggingConfig, polling::PollingConfig, storage::StorageConfig,
};

pub mod api;
pub mod logging;
pub mod polling;
pub mod storage;

pub use logging::LogFormat;

/// Settings shared by every storefront command.
#[derive(Debug, Args)]
pub struct StorefrontConfig {
    /// Backend connection settings.
    #[command(flatten)]
    pub api: ApiConfig,

    /// Local state settings.
    #[command(flatten)]
    pub storage: StorageConfig,

    /// Payment polling settings.
    #[command(flatten)]
    pub polling: PollingConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,
}
