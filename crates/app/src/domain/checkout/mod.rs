//! Checkout

pub mod idempotency;

pub use idempotency::{FingerprintLine, IdempotencyKeys};
