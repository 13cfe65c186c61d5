//! Idempotency keys for checkout submissions.
//!
//! A retried submission of the same logical order (same line items, same
//! customer phone) must reuse the key of the first attempt so the backend can
//! de-duplicate it. Keys live in session storage, so a fresh session starts
//! with fresh keys.

use std::{fmt::Write as _, sync::Arc};

use jiff::Timestamp;
use rand::{Rng, distributions::Alphanumeric};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::{
    api::models::CartItem,
    storage::{KeyValueStore, StorageError},
};

const STORAGE_PREFIX: &str = "idempotency_key:";
const HASH_PREFIX_LEN: usize = 32;
const SUFFIX_LEN: usize = 9;

/// One line of an order as far as de-duplication is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FingerprintLine {
    pub unit_id: u64,
    pub quantity: u32,
}

impl From<&CartItem> for FingerprintLine {
    fn from(item: &CartItem) -> Self {
        Self {
            unit_id: item.unit_id,
            quantity: item.quantity,
        }
    }
}

/// Build the fingerprint of an order. Prices are excluded and line order
/// does not matter.
pub fn fingerprint(lines: &[FingerprintLine], phone: &str) -> String {
    let mut lines = lines.to_vec();
    lines.sort_unstable();

    let mut fingerprint = String::new();

    for line in &lines {
        // Writing to a String cannot fail.
        _ = write!(fingerprint, "{}:{};", line.unit_id, line.quantity);
    }

    fingerprint.push('|');
    fingerprint.push_str(phone.trim());

    fingerprint
}

fn storage_key(fingerprint: &str) -> String {
    let digest = Sha256::digest(fingerprint.as_bytes());
    let hex = format!("{digest:x}");

    format!(
        "{STORAGE_PREFIX}{}",
        hex.get(..HASH_PREFIX_LEN).unwrap_or(&hex)
    )
}

fn generate_key() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect();

    format!("{}-{suffix}", Timestamp::now().as_millisecond())
}

/// Derives and remembers idempotency keys in session storage.
#[derive(Clone)]
pub struct IdempotencyKeys {
    session: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for IdempotencyKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdempotencyKeys").finish_non_exhaustive()
    }
}

impl IdempotencyKeys {
    #[must_use]
    pub fn new(session: Arc<dyn KeyValueStore>) -> Self {
        Self { session }
    }

    /// Return the key for this order, creating and storing one if needed.
    pub fn key_for(&self, lines: &[FingerprintLine], phone: &str) -> Result<String, StorageError> {
        let storage_key = storage_key(&fingerprint(lines, phone));

        if let Some(existing) = self.session.get(&storage_key)? {
            debug!(%storage_key, "reusing idempotency key");

            return Ok(existing);
        }

        let key = generate_key();

        self.session.set(&storage_key, &key)?;

        debug!(%storage_key, %key, "stored new idempotency key");

        Ok(key)
    }

    /// Key for the current contents of a cart.
    pub fn key_for_items(&self, items: &[CartItem], phone: &str) -> Result<String, StorageError> {
        let lines: Vec<FingerprintLine> = items.iter().map(FingerprintLine::from).collect();

        self.key_for(&lines, phone)
    }
}
