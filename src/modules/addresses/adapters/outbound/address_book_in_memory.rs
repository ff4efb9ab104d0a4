use crate::modules::addresses::core::address::{Address, AddressBook};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryAddressBook {
    addresses: RwLock<HashMap<Uuid, Address>>,
    is_offline: bool,
}

impl InMemoryAddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_offline(&mut self) {
        self.is_offline = !self.is_offline;
    }

    pub async fn save(&self, address: Address) {
        self.addresses.write().await.insert(address.id, address);
    }
}

#[async_trait::async_trait]
impl AddressBook for InMemoryAddressBook {
    async fn find(&self, user_id: Uuid, address_id: Uuid) -> anyhow::Result<Option<Address>> {
        if self.is_offline {
            return Err(anyhow::anyhow!("Address book offline"));
        }
        Ok(self
            .addresses
            .read()
            .await
            .get(&address_id)
            .filter(|address| address.user_id == user_id)
            .cloned())
    }
}
