//! Store backend API

pub mod client;
pub mod errors;
pub mod http;
pub mod models;

pub use client::*;
pub use errors::ApiError;
pub use http::{HttpApiConfig, HttpStorefrontApi};
