use crate::modules::catalog::core::product::Product;
use crate::shared::core::pagination::Page;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn get(&self, product_id: Uuid) -> anyhow::Result<Option<Product>>;
    async fn list_active(&self, page: Page) -> anyhow::Result<Vec<Product>>;
}
