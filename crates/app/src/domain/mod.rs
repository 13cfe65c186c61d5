//! Storefront Domain Concerns

pub mod carts;
pub mod checkout;
pub mod payments;
