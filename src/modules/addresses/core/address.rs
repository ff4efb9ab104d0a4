use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: Uuid,
    pub user_id: Uuid,
    pub recipient: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

#[async_trait]
pub trait AddressBook: Send + Sync {
    /// Only returns the address when it belongs to `user_id`.
    async fn find(&self, user_id: Uuid, address_id: Uuid) -> anyhow::Result<Option<Address>>;
}
