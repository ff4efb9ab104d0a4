// Startup data for the in-memory catalog and address book.
//
// The file holds `products` and `addresses` arrays; either may be omitted.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::modules::addresses::adapters::outbound::address_book_in_memory::InMemoryAddressBook;
use crate::modules::addresses::core::address::Address;
use crate::modules::catalog::adapters::outbound::catalog_in_memory::InMemoryCatalog;
use crate::modules::catalog::core::product::Product;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("reading seed file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing seed file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub addresses: Vec<Address>,
}

impl SeedData {
    pub fn load(path: &Path) -> Result<Self, SeedError> {
        let text = std::fs::read_to_string(path).map_err(|source| SeedError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| SeedError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub async fn apply(self, catalog: &InMemoryCatalog, address_book: &InMemoryAddressBook) {
        let products = self.products.len();
        let addresses = self.addresses.len();
        for product in self.products {
            catalog.upsert(product).await;
        }
        for address in self.addresses {
            address_book.save(address).await;
        }
        tracing::info!(products, addresses, "seed data loaded");
    }
}
