use std::sync::Arc;

use axum::extract::FromRef;
use rust_decimal::Decimal;

use crate::modules::addresses::core::address::AddressBook;
use crate::modules::cart::core::ports::{CartCommands, CartSnapshotProvider};
use crate::modules::catalog::core::ports::ProductCatalog;
use crate::modules::orders::core::ports::{Database, OrderQueries};
use crate::modules::orders::use_cases::change_order_status::handler::ChangeOrderStatusHandler;
use crate::modules::orders::use_cases::checkout::handler::CheckoutHandler;
use crate::modules::orders::use_cases::list_orders::handler::ListOrdersHandler;
use crate::shared::infrastructure::http::payment_gateway::PaymentWebhookSecret;

pub type Checkout = CheckoutHandler<dyn CartSnapshotProvider, dyn AddressBook, dyn Database>;

/// Concrete adapters chosen by the composition root.
#[derive(Clone)]
pub struct Adapters {
    pub catalog: Arc<dyn ProductCatalog>,
    pub carts: Arc<dyn CartCommands>,
    pub cart_snapshots: Arc<dyn CartSnapshotProvider>,
    pub addresses: Arc<dyn AddressBook>,
    pub database: Arc<dyn Database>,
    pub order_queries: Arc<dyn OrderQueries>,
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn ProductCatalog>,
    pub carts: Arc<dyn CartCommands>,
    pub cart_snapshots: Arc<dyn CartSnapshotProvider>,
    pub checkout: Arc<Checkout>,
    pub order_status: Arc<ChangeOrderStatusHandler<dyn Database>>,
    pub orders: Arc<ListOrdersHandler<dyn OrderQueries>>,
    pub payment_webhook_secret: PaymentWebhookSecret,
}

impl AppState {
    pub fn new(
        adapters: Adapters,
        shipping_price: Decimal,
        payment_webhook_secret: PaymentWebhookSecret,
    ) -> Self {
        let Adapters {
            catalog,
            carts,
            cart_snapshots,
            addresses,
            database,
            order_queries,
        } = adapters;
        Self {
            checkout: Arc::new(CheckoutHandler::new(
                cart_snapshots.clone(),
                addresses,
                database.clone(),
                shipping_price,
            )),
            order_status: Arc::new(ChangeOrderStatusHandler::new(database)),
            orders: Arc::new(ListOrdersHandler::new(order_queries)),
            catalog,
            carts,
            cart_snapshots,
            payment_webhook_secret,
        }
    }
}

impl FromRef<AppState> for PaymentWebhookSecret {
    fn from_ref(state: &AppState) -> Self {
        state.payment_webhook_secret.clone()
    }
}
