// In-memory application wiring for HTTP and worker tests.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::modules::addresses::adapters::outbound::address_book_in_memory::InMemoryAddressBook;
use crate::modules::cart::adapters::outbound::carts_in_memory::InMemoryCarts;
use crate::modules::catalog::adapters::outbound::catalog_in_memory::InMemoryCatalog;
use crate::modules::orders::adapters::outbound::orders_in_memory::InMemoryDatabase;
use crate::shared::infrastructure::http::payment_gateway::PaymentWebhookSecret;
use crate::shell::state::{Adapters, AppState};

pub const PAYMENT_WEBHOOK_SECRET: &str = "whsec_test";

pub struct TestApp {
    pub catalog: Arc<InMemoryCatalog>,
    pub carts: Arc<InMemoryCarts>,
    pub addresses: Arc<InMemoryAddressBook>,
    pub db: Arc<InMemoryDatabase>,
}

impl TestApp {
    pub fn new() -> Self {
        let catalog = Arc::new(InMemoryCatalog::new());
        Self {
            carts: Arc::new(InMemoryCarts::new(catalog.clone())),
            catalog,
            addresses: Arc::new(InMemoryAddressBook::new()),
            db: Arc::new(InMemoryDatabase::new()),
        }
    }

    pub fn state(&self) -> AppState {
        AppState::new(
            Adapters {
                catalog: self.catalog.clone(),
                carts: self.carts.clone(),
                cart_snapshots: self.carts.clone(),
                addresses: self.addresses.clone(),
                database: self.db.clone(),
                order_queries: self.db.clone(),
            },
            Decimal::ZERO,
            self.payment_webhook_secret(),
        )
    }

    pub fn payment_webhook_secret(&self) -> PaymentWebhookSecret {
        PaymentWebhookSecret::new(Some(PAYMENT_WEBHOOK_SECRET.to_string()))
    }

    /// Signature header value for a gateway callback to `path`.
    pub fn payment_signature(&self, path: &str) -> String {
        self.payment_webhook_secret().sign(path).unwrap_or_default()
    }
}
