// In memory product catalog.
//
// Purpose
// - Feed the cart with live product prices in tests and local runs.

use crate::modules::catalog::core::ports::ProductCatalog;
use crate::modules::catalog::core::product::Product;
use crate::shared::core::money;
use crate::shared::core::pagination::Page;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<Uuid, Product>>,
    is_offline: bool,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_offline(&mut self) {
        self.is_offline = !self.is_offline;
    }

    pub async fn upsert(&self, mut product: Product) {
        product.price = money::normalize(product.price);
        self.products.write().await.insert(product.id, product);
    }

    /// Returns false when the product is unknown.
    pub async fn set_price(&self, product_id: Uuid, price: Decimal) -> bool {
        match self.products.write().await.get_mut(&product_id) {
            Some(product) => {
                product.price = money::normalize(price);
                true
            }
            None => false,
        }
    }
}

#[async_trait::async_trait]
impl ProductCatalog for InMemoryCatalog {
    async fn get(&self, product_id: Uuid) -> anyhow::Result<Option<Product>> {
        if self.is_offline {
            return Err(anyhow::anyhow!("Catalog offline"));
        }
        Ok(self.products.read().await.get(&product_id).cloned())
    }

    async fn list_active(&self, page: Page) -> anyhow::Result<Vec<Product>> {
        if self.is_offline {
            return Err(anyhow::anyhow!("Catalog offline"));
        }
        let guard = self.products.read().await;
        let mut items: Vec<Product> = guard.values().filter(|p| p.is_active).cloned().collect();
        items.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(page.apply(&items))
    }
}
