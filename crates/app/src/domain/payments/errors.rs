//! Payment poller errors.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PollerError {
    #[error("payment status is already being polled")]
    AlreadyPolling,

    #[error("a payment is being initiated")]
    Initiating,

    #[error("poll interval must be greater than zero")]
    ZeroInterval,

    #[error("at least one status check must be allowed")]
    ZeroAttempts,
}
