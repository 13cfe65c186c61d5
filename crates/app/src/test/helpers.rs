//! Test Helpers

use std::{
    num::NonZeroU32,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use uuid::Uuid;

use crate::api::{
    ApiError, MockStorefrontApi,
    models::{Cart, CartItem, CartUuid, LeadUuid, OrderStatus, OrderUuid, PaymentStatus},
};

const DEFAULT_UNIT_PRICE: u64 = 10_00;

pub(crate) fn quantity(value: u32) -> NonZeroU32 {
    NonZeroU32::new(value).unwrap_or(NonZeroU32::MIN)
}

pub(crate) fn make_item(id: u64, unit_id: u64, quantity: u32) -> CartItem {
    CartItem {
        id,
        unit_id,
        quantity,
        unit_price: DEFAULT_UNIT_PRICE,
        promotion_id: None,
        bundle_id: None,
    }
}

pub(crate) fn make_cart(items: Vec<CartItem>) -> Cart {
    let total = items
        .iter()
        .map(|item| u64::from(item.quantity) * item.unit_price)
        .sum();

    Cart {
        id: CartUuid::from_uuid(Uuid::now_v7()),
        items,
        total: Some(total),
        lead: None,
    }
}

pub(crate) fn make_status(order: OrderUuid, status: OrderStatus) -> PaymentStatus {
    PaymentStatus {
        id: order,
        status,
        payment_reference: None,
    }
}

pub(crate) fn unreachable_error() -> ApiError {
    ApiError::Unreachable("connection refused".to_string())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct BackendState {
    cart: Option<Cart>,
    next_item: u64,
    creates: usize,
    session_keys: Vec<Option<String>>,
    idempotency_keys: Vec<String>,
}

impl BackendState {
    fn push_line(&mut self, unit_id: u64, quantity: u32, unit_price: Option<u64>, bundle_id: Option<u64>) {
        self.next_item += 1;

        let id = self.next_item;

        if let Some(cart) = self.cart.as_mut() {
            cart.items.push(CartItem {
                id,
                unit_id,
                quantity,
                unit_price: unit_price.unwrap_or(DEFAULT_UNIT_PRICE),
                promotion_id: None,
                bundle_id,
            });
        }
    }

    fn recompute_total(&mut self) {
        if let Some(cart) = self.cart.as_mut() {
            cart.total = Some(
                cart.items
                    .iter()
                    .map(|item| u64::from(item.quantity) * item.unit_price)
                    .sum(),
            );
        }
    }
}

/// A mocked backend holding one cart in memory.
#[derive(Debug, Clone)]
pub(crate) struct FakeBackend {
    cart_id: CartUuid,
    lead: LeadUuid,
    state: Arc<Mutex<BackendState>>,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self {
            cart_id: CartUuid::from_uuid(Uuid::now_v7()),
            lead: LeadUuid::from_uuid(Uuid::now_v7()),
            state: Arc::default(),
        }
    }

    pub(crate) fn cart_id(&self) -> CartUuid {
        self.cart_id
    }

    pub(crate) fn create_count(&self) -> usize {
        lock(&self.state).creates
    }

    pub(crate) fn session_keys(&self) -> Vec<Option<String>> {
        lock(&self.state).session_keys.clone()
    }

    pub(crate) fn idempotency_keys(&self) -> Vec<String> {
        lock(&self.state).idempotency_keys.clone()
    }

    /// Mock wired to this backend's state. Payment calls are not expected.
    pub(crate) fn mock(&self) -> MockStorefrontApi {
        let mut api = MockStorefrontApi::new();

        let state = Arc::clone(&self.state);
        let id = self.cart_id;

        api.expect_create_cart().returning(move |new| {
            let mut state = lock(&state);
            let cart = Cart {
                id,
                items: Vec::new(),
                total: Some(0),
                lead: None,
            };

            state.creates += 1;
            state.session_keys.push(new.session_key);
            state.cart = Some(cart.clone());

            Ok(cart)
        });

        let state = Arc::clone(&self.state);

        api.expect_get_cart().returning(move |cart| {
            lock(&state)
                .cart
                .clone()
                .filter(|stored| stored.id == cart)
                .ok_or(ApiError::NotFound)
        });

        let state = Arc::clone(&self.state);

        api.expect_add_item().returning(move |cart, item| {
            let mut state = lock(&state);

            let Some(stored) = state.cart.as_mut().filter(|stored| stored.id == cart) else {
                return Err(ApiError::NotFound);
            };

            let existing = stored.items.iter_mut().find(|line| {
                line.unit_id == item.unit_id
                    && line.promotion_id == item.promotion_id
                    && line.bundle_id.is_none()
            });

            match existing {
                Some(line) => line.quantity += item.quantity.get(),
                None => state.push_line(item.unit_id, item.quantity.get(), item.unit_price, None),
            }

            state.recompute_total();

            Ok(())
        });

        let state = Arc::clone(&self.state);

        api.expect_add_bundle().returning(move |cart, bundle| {
            let mut state = lock(&state);

            if state.cart.as_ref().is_none_or(|stored| stored.id != cart) {
                return Err(ApiError::NotFound);
            }

            let units = bundle.main_unit_id.into_iter().chain(bundle.item_ids);

            for unit_id in units {
                state.push_line(unit_id, 1, None, Some(bundle.bundle_id));
            }

            state.recompute_total();

            Ok(())
        });

        let state = Arc::clone(&self.state);

        api.expect_remove_item().returning(move |cart, item| {
            let mut state = lock(&state);

            let Some(stored) = state.cart.as_mut().filter(|stored| stored.id == cart) else {
                return Err(ApiError::NotFound);
            };

            let before = stored.items.len();

            stored.items.retain(|line| line.id != item);

            if stored.items.len() == before {
                return Err(ApiError::NotFound);
            }

            state.recompute_total();

            Ok(())
        });

        let state = Arc::clone(&self.state);
        let lead = self.lead;

        api.expect_checkout().returning(move |cart, _payload, key| {
            let mut state = lock(&state);

            state.idempotency_keys.push(key);

            let Some(stored) = state.cart.as_mut().filter(|stored| stored.id == cart) else {
                return Err(ApiError::NotFound);
            };

            stored.lead = Some(lead);

            Ok(stored.clone())
        });

        api
    }
}
