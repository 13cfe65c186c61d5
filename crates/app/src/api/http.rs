//! HTTP implementation of the store backend client.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api::{
    client::StorefrontApi,
    errors::{self, ApiError},
    models::{
        Cart, CartUuid, CheckoutPayload, NewCart, NewCartBundle, NewCartItem, OrderUuid,
        PaymentRedirect, PaymentRequest, PaymentStatus,
    },
};

const BRAND_HEADER: &str = "X-Brand";
const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Configuration for connecting to the store backend.
#[derive(Debug, Clone)]
pub struct HttpApiConfig {
    /// Backend base URL, e.g. `"http://localhost:8000/api"`.
    pub base_url: String,

    /// Brand the storefront sells under; sent with every request.
    pub brand: String,

    /// Optional bearer token.
    pub token: Option<String>,
}

/// `reqwest` backed [`StorefrontApi`].
#[derive(Debug, Clone)]
pub struct HttpStorefrontApi {
    config: HttpApiConfig,
    http: Client,
}

impl HttpStorefrontApi {
    /// Create a new client from the given configuration.
    #[must_use]
    pub fn new(config: HttpApiConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(BRAND_HEADER, &self.config.brand);

        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = self.authorize(request).send().await?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        debug!(%status, "backend rejected request");

        Err(errors::from_response(status, &body))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        Ok(self.send(request).await?.json().await?)
    }
}

#[async_trait]
impl StorefrontApi for HttpStorefrontApi {
    #[tracing::instrument(name = "api.create_cart", skip(self, cart), err)]
    async fn create_cart(&self, cart: NewCart) -> Result<Cart, ApiError> {
        self.send_json(self.http.post(self.url("carts/")).json(&cart))
            .await
    }

    async fn get_cart(&self, cart: CartUuid) -> Result<Cart, ApiError> {
        debug!(%cart, "fetching cart");

        self.send_json(self.http.get(self.url(&format!("carts/{cart}/"))))
            .await
    }

    async fn add_item(&self, cart: CartUuid, item: NewCartItem) -> Result<(), ApiError> {
        debug!(%cart, unit = item.unit_id, quantity = item.quantity.get(), "adding item");

        self.send(
            self.http
                .post(self.url(&format!("carts/{cart}/items/")))
                .json(&item),
        )
        .await?;

        Ok(())
    }

    async fn add_bundle(&self, cart: CartUuid, bundle: NewCartBundle) -> Result<(), ApiError> {
        debug!(%cart, bundle = bundle.bundle_id, "adding bundle");

        self.send(
            self.http
                .post(self.url(&format!("carts/{cart}/bundles/")))
                .json(&bundle),
        )
        .await?;

        Ok(())
    }

    async fn remove_item(&self, cart: CartUuid, item: u64) -> Result<(), ApiError> {
        debug!(%cart, item, "removing item");

        self.send(
            self.http
                .delete(self.url(&format!("carts/{cart}/items/{item}/"))),
        )
        .await?;

        Ok(())
    }

    #[tracing::instrument(
        name = "api.checkout",
        skip(self, cart, payload, idempotency_key),
        fields(cart = %cart),
        err
    )]
    async fn checkout(
        &self,
        cart: CartUuid,
        payload: CheckoutPayload,
        idempotency_key: String,
    ) -> Result<Cart, ApiError> {
        debug!(%idempotency_key, "submitting checkout");

        self.send_json(
            self.http
                .post(self.url(&format!("carts/{cart}/checkout/")))
                .header(IDEMPOTENCY_HEADER, idempotency_key)
                .json(&payload),
        )
        .await
    }

    #[tracing::instrument(
        name = "api.initiate_payment",
        skip(self, request),
        fields(lead = %request.lead),
        err
    )]
    async fn initiate_payment(
        &self,
        request: PaymentRequest,
    ) -> Result<PaymentRedirect, ApiError> {
        self.send_json(self.http.post(self.url("payments/")).json(&request))
            .await
    }

    async fn get_payment_status(&self, order: OrderUuid) -> Result<PaymentStatus, ApiError> {
        debug!(%order, "fetching payment status");

        self.send_json(
            self.http
                .get(self.url(&format!("orders/{order}/payment-status/"))),
        )
        .await
    }
}
