//! Storefront cart, checkout and payment coordination against a remote
//! store backend.

pub mod api;
pub mod config;
pub mod context;
pub mod domain;
pub mod storage;

#[cfg(test)]
mod test;

pub mod uuids;
