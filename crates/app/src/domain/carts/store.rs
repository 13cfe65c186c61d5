//! Cart store.
//!
//! Mirrors exactly one remote cart. Every mutation is a remote call followed
//! by a full refresh, so the local copy is always a snapshot the backend
//! returned and never a locally patched one.

use std::{fmt, sync::Arc};

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    api::{
        ApiError, StorefrontApi,
        models::{Cart, CartUuid, CheckoutPayload, NewCart, NewCartBundle, NewCartItem},
    },
    domain::{carts::errors::CartStoreError, checkout::IdempotencyKeys},
    storage::{KeyValueStore, StorageError},
};

/// Local storage key of the browser session key sent on cart creation.
pub const SESSION_KEY: &str = "session_key";

/// Local storage key of the current cart id.
pub const CART_ID_KEY: &str = "cart_id";

/// Local mirror of the shopper's single remote cart.
pub struct CartStore {
    api: Arc<dyn StorefrontApi>,
    local: Arc<dyn KeyValueStore>,
    idempotency: IdempotencyKeys,
    cart: Option<Cart>,
    error: Option<String>,
}

impl fmt::Debug for CartStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartStore")
            .field("cart", &self.cart)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl CartStore {
    #[must_use]
    pub fn new(
        api: Arc<dyn StorefrontApi>,
        local: Arc<dyn KeyValueStore>,
        idempotency: IdempotencyKeys,
    ) -> Self {
        Self {
            api,
            local,
            idempotency,
            cart: None,
            error: None,
        }
    }

    /// Last cart snapshot, if any.
    pub fn cart(&self) -> Option<&Cart> {
        self.cart.as_ref()
    }

    /// Message describing the last failed operation.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Sum of quantities in the current snapshot.
    pub fn item_count(&self) -> u64 {
        self.cart.as_ref().map_or(0, Cart::item_count)
    }

    /// Remote total of the current snapshot, zero without a cart.
    pub fn total(&self) -> u64 {
        self.cart.as_ref().map_or(0, Cart::total_value)
    }

    /// Reload the cart remembered in local storage.
    ///
    /// A cart that cannot be read is replaced by a fresh one, unless the
    /// backend is unreachable, in which case nothing further is attempted.
    pub async fn restore(&mut self) -> Result<(), CartStoreError> {
        self.error = None;

        let result = self.try_restore().await;

        self.settle(result)
    }

    /// Load the cart remembered in local storage without any fallback.
    ///
    /// Unlike [`restore`](Self::restore), a failed fetch never creates a new
    /// remote cart.
    pub async fn load(&mut self) -> Result<(), CartStoreError> {
        self.error = None;

        let result = self.try_load().await;

        self.settle(result)
    }

    /// Add a single inventory unit, creating the cart first if needed.
    pub async fn add_to_cart(&mut self, item: NewCartItem) -> Result<(), CartStoreError> {
        self.error = None;

        let result = self.try_add_to_cart(item).await;

        self.settle(result)
    }

    /// Add a bundle, creating the cart first if needed.
    pub async fn add_bundle_to_cart(&mut self, bundle: NewCartBundle) -> Result<(), CartStoreError> {
        self.error = None;

        let result = self.try_add_bundle_to_cart(bundle).await;

        self.settle(result)
    }

    /// Remove a line item. Without a cart this only logs.
    pub async fn remove_from_cart(&mut self, item: u64) -> Result<(), CartStoreError> {
        self.error = None;

        let Some(cart) = self.cart.as_ref().map(|cart| cart.id) else {
            error!(item, "cannot remove item without a cart");

            return Ok(());
        };

        let result = self.try_remove_from_cart(cart, item).await;

        self.settle(result)
    }

    /// Re-fetch the cart. An empty or missing remote cart clears local state.
    pub async fn update_cart(&mut self) -> Result<(), CartStoreError> {
        self.error = None;

        let result = self.refresh().await;

        self.settle(result)
    }

    /// Submit checkout details for the current cart.
    ///
    /// The cart is not cleared: it stays linked to the created lead until the
    /// backend converts that lead into an order. The returned snapshot carries
    /// the lead reference.
    pub async fn checkout(&mut self, payload: CheckoutPayload) -> Result<Cart, CartStoreError> {
        self.error = None;

        let result = self.try_checkout(payload).await;

        self.settle(result)
    }

    /// Forget the cart locally. Nothing is sent to the backend.
    pub fn clear_cart(&mut self) -> Result<(), CartStoreError> {
        self.error = None;

        let result = self.forget().map_err(CartStoreError::from);

        self.settle(result)
    }

    async fn try_load(&mut self) -> Result<(), CartStoreError> {
        let Some(stored) = self.local.get(CART_ID_KEY)? else {
            return Ok(());
        };

        let Ok(id) = stored.parse::<CartUuid>() else {
            warn!(%stored, "discarding malformed stored cart id");

            return Ok(self.forget()?);
        };

        self.cart = None;

        self.fetch(id).await?;

        if let Some(cart) = &self.cart {
            info!(cart = %id, items = cart.item_count(), "loaded cart");
        }

        Ok(())
    }

    async fn try_restore(&mut self) -> Result<(), CartStoreError> {
        match self.try_load().await {
            Err(CartStoreError::Api(error)) if !error.is_unreachable() => {
                warn!(%error, "failed to restore cart, creating a new one");

                self.forget()?;
                self.ensure_cart().await?;

                Ok(())
            }
            result => result,
        }
    }

    async fn try_add_to_cart(&mut self, item: NewCartItem) -> Result<(), CartStoreError> {
        let cart = self.ensure_cart().await?;

        match self.api.add_item(cart, item.clone()).await {
            Err(ApiError::NotFound) => {
                let cart = self.replace_vanished_cart(cart).await?;

                self.api.add_item(cart, item).await?;
            }
            result => result?,
        }

        self.refresh().await
    }

    async fn try_add_bundle_to_cart(&mut self, bundle: NewCartBundle) -> Result<(), CartStoreError> {
        let cart = self.ensure_cart().await?;

        match self.api.add_bundle(cart, bundle.clone()).await {
            Err(ApiError::NotFound) => {
                let cart = self.replace_vanished_cart(cart).await?;

                self.api.add_bundle(cart, bundle).await?;
            }
            result => result?,
        }

        self.refresh().await
    }

    async fn try_remove_from_cart(&mut self, cart: CartUuid, item: u64) -> Result<(), CartStoreError> {
        match self.api.remove_item(cart, item).await {
            Err(ApiError::NotFound) => {
                info!(%cart, item, "cart was removed by the backend, clearing");

                Ok(self.forget()?)
            }
            Err(error) => Err(error.into()),
            Ok(()) => self.refresh().await,
        }
    }

    async fn try_checkout(&mut self, payload: CheckoutPayload) -> Result<Cart, CartStoreError> {
        let cart = self.cart.as_ref().ok_or(CartStoreError::NoCart)?;
        let id = cart.id;

        let key = self
            .idempotency
            .key_for_items(&cart.items, &payload.phone)?;

        let submitted = self.api.checkout(id, payload, key).await?;

        info!(cart = %id, lead = ?submitted.lead, "checkout submitted");

        self.cart = Some(submitted.clone());

        self.refresh().await?;

        Ok(submitted)
    }

    async fn ensure_cart(&mut self) -> Result<CartUuid, CartStoreError> {
        if let Some(cart) = &self.cart {
            return Ok(cart.id);
        }

        let session_key = self.session_key()?;

        let cart = self
            .api
            .create_cart(NewCart {
                session_key: Some(session_key),
            })
            .await?;

        info!(cart = %cart.id, "created cart");

        let id = cart.id;

        self.local.set(CART_ID_KEY, &id.to_string())?;
        self.cart = Some(cart);

        Ok(id)
    }

    /// Forget a cart the backend no longer knows and create a fresh one.
    async fn replace_vanished_cart(&mut self, vanished: CartUuid) -> Result<CartUuid, CartStoreError> {
        info!(cart = %vanished, "cart was removed by the backend, starting a new one");

        self.forget()?;

        self.ensure_cart().await
    }

    async fn refresh(&mut self) -> Result<(), CartStoreError> {
        let Some(id) = self.cart.as_ref().map(|cart| cart.id) else {
            return Ok(());
        };

        self.fetch(id).await
    }

    /// Replace the snapshot with the remote cart. An empty or missing remote
    /// cart clears local state; any other failure leaves the snapshot alone.
    async fn fetch(&mut self, id: CartUuid) -> Result<(), CartStoreError> {
        match self.api.get_cart(id).await {
            Ok(cart) if cart.items.is_empty() => {
                info!(cart = %id, "cart is empty, clearing");

                self.forget()?;
            }
            Ok(cart) => self.cart = Some(cart),
            Err(ApiError::NotFound) => {
                info!(cart = %id, "cart was removed by the backend, clearing");

                self.forget()?;
            }
            Err(error) => return Err(error.into()),
        }

        Ok(())
    }

    fn session_key(&self) -> Result<String, StorageError> {
        if let Some(existing) = self.local.get(SESSION_KEY)? {
            return Ok(existing);
        }

        let generated = Uuid::new_v4().simple().to_string();

        self.local.set(SESSION_KEY, &generated)?;

        Ok(generated)
    }

    fn forget(&mut self) -> Result<(), StorageError> {
        self.cart = None;

        self.local.remove(CART_ID_KEY)
    }

    fn settle<T>(&mut self, result: Result<T, CartStoreError>) -> Result<T, CartStoreError> {
        if let Err(error) = &result {
            error!(%error, "cart operation failed");

            self.error = Some(error.user_message());
        }

        result
    }
}
