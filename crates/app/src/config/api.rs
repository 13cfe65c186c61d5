//! API Config

use clap::Args;

use crate::api::HttpApiConfig;

/// Store backend settings.
#[derive(Debug, Args)]
pub struct ApiConfig {
    /// Backend base URL
    #[arg(long, env = "STOREFRONT_API_URL", default_value = "http://localhost:8000/api")]
    pub api_url: String,

    /// Brand sent with every request
    #[arg(long, env = "STOREFRONT_BRAND")]
    pub brand: String,

    /// Optional bearer token
    #[arg(long, env = "STOREFRONT_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,
}

impl From<&ApiConfig> for HttpApiConfig {
    fn from(config: &ApiConfig) -> Self {
        Self {
            base_url: config.api_url.clone(),
            brand: config.brand.clone(),
            token: config
                .api_token
                .clone()
                .filter(|token| !token.trim().is_empty()),
        }
    }
}
