//! Store backend client.

use async_trait::async_trait;
use mockall::automock;

use crate::api::{
    errors::ApiError,
    models::{
        Cart, CartUuid, CheckoutPayload, NewCart, NewCartBundle, NewCartItem, OrderUuid,
        PaymentRedirect, PaymentRequest, PaymentStatus,
    },
};

#[automock]
#[async_trait]
pub trait StorefrontApi: Send + Sync {
    /// Create a cart, optionally bound to a browser session key.
    async fn create_cart(&self, cart: NewCart) -> Result<Cart, ApiError>;

    /// Retrieve a single cart.
    async fn get_cart(&self, cart: CartUuid) -> Result<Cart, ApiError>;

    /// Add a single inventory unit to the given cart.
    async fn add_item(&self, cart: CartUuid, item: NewCartItem) -> Result<(), ApiError>;

    /// Add a bundle to the given cart.
    async fn add_bundle(&self, cart: CartUuid, bundle: NewCartBundle) -> Result<(), ApiError>;

    /// Remove a line item from the given cart.
    async fn remove_item(&self, cart: CartUuid, item: u64) -> Result<(), ApiError>;

    /// Submit checkout details. The returned cart references the created lead.
    async fn checkout(
        &self,
        cart: CartUuid,
        payload: CheckoutPayload,
        idempotency_key: String,
    ) -> Result<Cart, ApiError>;

    /// Start a payment for a lead and obtain the external payment page.
    async fn initiate_payment(&self, request: PaymentRequest)
    -> Result<PaymentRedirect, ApiError>;

    /// Read the payment status of an order.
    async fn get_payment_status(&self, order: OrderUuid) -> Result<PaymentStatus, ApiError>;
}
