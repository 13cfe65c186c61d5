//! Payments

pub mod errors;
pub mod machine;
pub mod poller;

pub use errors::PollerError;
pub use machine::{PaymentFailure, PollOutcome, PollerState, StatusCheck};
pub use poller::{PaymentPoller, PollerConfig};
