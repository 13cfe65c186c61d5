//! Storage Config

use std::path::PathBuf;

use clap::Args;

/// File name of the durable store holding the cart id and session key.
pub const LOCAL_STATE_FILE: &str = "local.json";

/// File name of the store holding checkout idempotency keys.
pub const SESSION_STATE_FILE: &str = "session.json";

/// Local state settings.
#[derive(Debug, Args)]
pub struct StorageConfig {
    /// Directory holding the storefront state files
    #[arg(long, env = "STOREFRONT_STATE_DIR", default_value = ".storefront")]
    pub state_dir: PathBuf,
}

impl StorageConfig {
    #[must_use]
    pub fn local_path(&self) -> PathBuf {
        self.state_dir.join(LOCAL_STATE_FILE)
    }

    #[must_use]
    pub fn session_path(&self) -> PathBuf {
        self.state_dir.join(SESSION_STATE_FILE)
    }
}
