//! Polling Config

use std::time::Duration;

use clap::Args;

use crate::domain::payments::{PollerConfig, PollerError};

/// Payment polling settings.
#[derive(Debug, Args)]
pub struct PollingConfig {
    /// Delay between payment status checks, in milliseconds
    #[arg(
        long,
        env = "PAYMENT_POLL_INTERVAL_MS",
        default_value_t = 3_000_u64,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll_interval_ms: u64,

    /// Number of status checks before giving up
    #[arg(
        long,
        env = "PAYMENT_MAX_POLL_ATTEMPTS",
        default_value_t = 100_u32,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_poll_attempts: u32,
}

impl TryFrom<&PollingConfig> for PollerConfig {
    type Error = PollerError;

    fn try_from(config: &PollingConfig) -> Result<Self, Self::Error> {
        Self::new(
            Duration::from_millis(config.poll_interval_ms),
            config.max_poll_attempts,
        )
    }
}
