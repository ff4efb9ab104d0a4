use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::modules::addresses::core::address::{Address, AddressBook};
use crate::modules::cart::core::cart::CartError;
use crate::modules::cart::core::ports::CartSnapshotProvider;
use crate::modules::orders::core::order::{Order, generate_order_number};
use crate::modules::orders::core::ports::{Database, PersistenceError};
use crate::modules::orders::use_cases::checkout::command::Checkout;
use crate::modules::orders::use_cases::checkout::decide::{
    CheckoutInput, DecideError, PlacedOrder, decide_checkout,
};

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("invalid user id: {0}")]
    InvalidUserId(String),

    #[error("cart unavailable: {0}")]
    CartUnavailable(#[source] CartError),

    #[error("cart is empty")]
    CartEmpty,

    #[error("invalid address reference: {0}")]
    InvalidAddressReference(String),

    #[error("checkout failed: {0}")]
    CheckoutFailed(String),
}

pub struct CheckoutHandler<TCarts, TAddresses, TDatabase>
where
    TCarts: CartSnapshotProvider + ?Sized + 'static,
    TAddresses: AddressBook + ?Sized + 'static,
    TDatabase: Database + ?Sized + 'static,
{
    carts: Arc<TCarts>,
    addresses: Arc<TAddresses>,
    database: Arc<TDatabase>,
    shipping_price: Decimal,
}

impl<TCarts, TAddresses, TDatabase> CheckoutHandler<TCarts, TAddresses, TDatabase>
where
    TCarts: CartSnapshotProvider + ?Sized + 'static,
    TAddresses: AddressBook + ?Sized + 'static,
    TDatabase: Database + ?Sized + 'static,
{
    pub fn new(
        carts: Arc<TCarts>,
        addresses: Arc<TAddresses>,
        database: Arc<TDatabase>,
        shipping_price: Decimal,
    ) -> Self {
        Self {
            carts,
            addresses,
            database,
            shipping_price,
        }
    }

    /// Place an order from the caller's cart.
    ///
    /// The order, its items and the DELETE_CART outbox event are committed together or
    /// not at all. The cart itself is left alone; it is cleared later by the consumer
    /// of the dispatched event.
    pub async fn handle(&self, user_id: &str, command: Checkout) -> Result<Order, CheckoutError> {
        let user_id = Uuid::parse_str(user_id.trim())
            .map_err(|_| CheckoutError::InvalidUserId(user_id.to_string()))?;
        let address_id = parse_address_id(command.address_id.as_deref())?;

        let cart = self.carts.detail(user_id).await.map_err(|err| {
            warn!(%user_id, error = %err, "cart snapshot unavailable");
            CheckoutError::CartUnavailable(err)
        })?;
        if cart.is_empty() {
            return Err(CheckoutError::CartEmpty);
        }

        let address = match address_id {
            Some(address_id) => Some(self.resolve_address(user_id, address_id).await?),
            None => None,
        };

        let now = Utc::now();
        let placed = decide_checkout(CheckoutInput {
            cart: &cart,
            address: address.as_ref(),
            note: command.note,
            shipping_price: self.shipping_price,
            order_number: generate_order_number(now),
            now,
        })
        .map_err(|err| match err {
            DecideError::CartEmpty => CheckoutError::CartEmpty,
            DecideError::Serialization(reason) => CheckoutError::CheckoutFailed(reason),
        })?;

        if let Err(err) = self.persist(&placed).await {
            error!(
                order_id = %placed.order.id,
                order_number = %placed.order.order_number,
                error = %err,
                "checkout transaction rolled back"
            );
            return Err(CheckoutError::CheckoutFailed(err.to_string()));
        }

        info!(
            order_id = %placed.order.id,
            order_number = %placed.order.order_number,
            %user_id,
            items = placed.items.len(),
            total_price = %placed.order.total_price,
            "order placed"
        );
        Ok(placed.order)
    }

    async fn resolve_address(&self, user_id: Uuid, address_id: Uuid) -> Result<Address, CheckoutError> {
        self.addresses
            .find(user_id, address_id)
            .await
            .map_err(|err| CheckoutError::CheckoutFailed(format!("address lookup: {err}")))?
            .ok_or_else(|| CheckoutError::InvalidAddressReference(address_id.to_string()))
    }

    // Any early return drops the transaction, which rolls it back.
    async fn persist(&self, placed: &PlacedOrder) -> Result<(), PersistenceError> {
        let mut tx = self.database.begin().await?;
        tx.insert_order(&placed.order).await?;
        tx.insert_order_items(&placed.items).await?;
        tx.insert_outbox_event(&placed.outbox_event).await?;
        tx.commit().await
    }
}

fn parse_address_id(raw: Option<&str>) -> Result<Option<Uuid>, CheckoutError> {
    match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => Uuid::parse_str(raw)
            .map(Some)
            .map_err(|_| CheckoutError::InvalidAddressReference(raw.to_string())),
        None => Ok(None),
    }
}
