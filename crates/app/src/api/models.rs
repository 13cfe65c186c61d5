//! Backend Models

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::uuids::TypedUuid;

pub type CartUuid = TypedUuid<Cart>;

pub type LeadUuid = TypedUuid<Lead>;

pub type OrderUuid = TypedUuid<Order>;

/// Marker for lead identifiers.
#[derive(Debug)]
pub struct Lead;

/// Marker for order identifiers.
#[derive(Debug)]
pub struct Order;

/// Cart Model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartUuid,

    #[serde(default)]
    pub items: Vec<CartItem>,

    /// Remote aggregate in minor currency units.
    #[serde(default)]
    pub total: Option<u64>,

    /// Sales lead created by checkout, if any.
    #[serde(default)]
    pub lead: Option<LeadUuid>,
}

impl Cart {
    /// Sum of line quantities.
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Remote total, zero when the backend omits it.
    pub fn total_value(&self) -> u64 {
        self.total.unwrap_or_default()
    }
}

/// CartItem Model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: u64,
    pub unit_id: u64,
    pub quantity: u32,

    #[serde(default)]
    pub unit_price: u64,

    #[serde(default)]
    pub promotion_id: Option<u64>,

    #[serde(default)]
    pub bundle_id: Option<u64>,
}

/// NewCart Model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCart {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
}

/// NewCartItem Model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCartItem {
    pub unit_id: u64,
    pub quantity: NonZeroU32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotion_id: Option<u64>,

    /// Overrides the catalogue price, in minor units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<u64>,
}

impl NewCartItem {
    /// A single unit with no promotion or price override.
    pub fn new(unit_id: u64) -> Self {
        Self {
            unit_id,
            quantity: NonZeroU32::MIN,
            promotion_id: None,
            unit_price: None,
        }
    }

    #[must_use]
    pub fn with_quantity(mut self, quantity: NonZeroU32) -> Self {
        self.quantity = quantity;
        self
    }

    #[must_use]
    pub fn with_promotion(mut self, promotion_id: u64) -> Self {
        self.promotion_id = Some(promotion_id);
        self
    }

    #[must_use]
    pub fn with_unit_price(mut self, unit_price: u64) -> Self {
        self.unit_price = Some(unit_price);
        self
    }
}

/// NewCartBundle Model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCartBundle {
    pub bundle_id: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_unit_id: Option<u64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub item_ids: Vec<u64>,
}

/// Customer details submitted at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutPayload {
    pub name: String,
    pub phone: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Payment initiation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub lead: LeadUuid,
    pub return_url: String,
}

/// Payment initiation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRedirect {
    #[serde(default)]
    pub redirect_url: Option<String>,

    #[serde(default)]
    pub error: Option<String>,
}

/// Order status as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// Payment went through.
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Paid | Self::Delivered)
    }

    /// Payment will not go through.
    pub fn is_failed(self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Payment status of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatus {
    pub id: OrderUuid,
    pub status: OrderStatus,

    #[serde(default)]
    pub payment_reference: Option<String>,
}
