// Ports the cart module offers to the rest of the system.
//
// - CartSnapshotProvider: read-only snapshot for checkout plus the idempotent clear used by
//   the order-placed consumer.
// - CartCommands: customer-facing mutations.

use crate::modules::cart::core::cart::{CartError, CartSnapshot};
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait CartSnapshotProvider: Send + Sync {
    async fn detail(&self, user_id: Uuid) -> Result<CartSnapshot, CartError>;

    /// Clearing an already empty cart is a no-op.
    async fn clear_cart(&self, user_id: Uuid) -> Result<(), CartError>;
}

#[async_trait]
pub trait CartCommands: Send + Sync {
    async fn add_item(&self, user_id: Uuid, product_id: Uuid, quantity: u32) -> Result<CartSnapshot, CartError>;
    async fn update_quantity(&self, user_id: Uuid, product_id: Uuid, quantity: u32) -> Result<CartSnapshot, CartError>;
    async fn remove_item(&self, user_id: Uuid, product_id: Uuid) -> Result<CartSnapshot, CartError>;
}
