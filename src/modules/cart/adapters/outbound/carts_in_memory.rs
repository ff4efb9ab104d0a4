// In memory cart service.
//
// Purpose
// - Own the carts for local runs and tests, and act as the checkout's snapshot provider.
//
// Responsibilities
// - Copy name and price from the catalog when a product is added.
// - Clear carts idempotently for the order-placed consumer.

use crate::modules::cart::core::cart::{CartError, CartLine, CartSnapshot};
use crate::modules::cart::core::ports::{CartCommands, CartSnapshotProvider};
use crate::modules::catalog::core::ports::ProductCatalog;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub struct InMemoryCarts {
    catalog: Arc<dyn ProductCatalog>,
    carts: RwLock<HashMap<Uuid, Vec<CartLine>>>,
    is_offline: bool,
}

impl InMemoryCarts {
    pub fn new(catalog: Arc<dyn ProductCatalog>) -> Self {
        Self {
            catalog,
            carts: RwLock::new(HashMap::new()),
            is_offline: false,
        }
    }

    pub fn toggle_offline(&mut self) {
        self.is_offline = !self.is_offline;
    }

    fn ensure_online(&self) -> Result<(), CartError> {
        if self.is_offline {
            return Err(CartError::Backend("Cart service offline".into()));
        }
        Ok(())
    }

    async fn snapshot(&self, user_id: Uuid) -> CartSnapshot {
        CartSnapshot {
            user_id,
            items: self.carts.read().await.get(&user_id).cloned().unwrap_or_default(),
        }
    }
}

#[async_trait::async_trait]
impl CartSnapshotProvider for InMemoryCarts {
    async fn detail(&self, user_id: Uuid) -> Result<CartSnapshot, CartError> {
        self.ensure_online()?;
        Ok(self.snapshot(user_id).await)
    }

    async fn clear_cart(&self, user_id: Uuid) -> Result<(), CartError> {
        self.ensure_online()?;
        let removed = self.carts.write().await.remove(&user_id);
        tracing::debug!(%user_id, had_items = removed.is_some(), "cart cleared");
        Ok(())
    }
}

#[async_trait::async_trait]
impl CartCommands for InMemoryCarts {
    async fn add_item(&self, user_id: Uuid, product_id: Uuid, quantity: u32) -> Result<CartSnapshot, CartError> {
        self.ensure_online()?;
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        let product = self
            .catalog
            .get(product_id)
            .await
            .map_err(|err| CartError::Backend(err.to_string()))?
            .filter(|product| product.is_active)
            .ok_or(CartError::ProductNotFound(product_id))?;

        {
            let mut carts = self.carts.write().await;
            let lines = carts.entry(user_id).or_default();
            match lines.iter_mut().find(|line| line.product_id == product_id) {
                Some(line) => {
                    line.quantity = line.quantity.saturating_add(quantity);
                    line.name = product.name;
                    line.price = product.price;
                }
                None => lines.push(CartLine {
                    product_id,
                    name: product.name,
                    quantity,
                    price: product.price,
                }),
            }
        }
        Ok(self.snapshot(user_id).await)
    }

    async fn update_quantity(&self, user_id: Uuid, product_id: Uuid, quantity: u32) -> Result<CartSnapshot, CartError> {
        self.ensure_online()?;
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        {
            let mut carts = self.carts.write().await;
            let line = carts
                .get_mut(&user_id)
                .and_then(|lines| lines.iter_mut().find(|line| line.product_id == product_id))
                .ok_or(CartError::ProductNotFound(product_id))?;
            line.quantity = quantity;
        }
        Ok(self.snapshot(user_id).await)
    }

    async fn remove_item(&self, user_id: Uuid, product_id: Uuid) -> Result<CartSnapshot, CartError> {
        self.ensure_online()?;
        {
            let mut carts = self.carts.write().await;
            if let Some(lines) = carts.get_mut(&user_id) {
                lines.retain(|line| line.product_id != product_id);
                if lines.is_empty() {
                    carts.remove(&user_id);
                }
            }
        }
        Ok(self.snapshot(user_id).await)
    }
}
