// Shared test fixture for catalog products.
// Defaults come from json/product.json; every build gets a fresh id.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;
use uuid::Uuid;

use crate::modules::catalog::core::product::Product;

#[derive(Debug, Clone, Deserialize)]
pub struct ProductDto {
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub price: Decimal,
    pub is_active: bool,
}

pub struct ProductBuilder {
    inner: Product,
}

impl Default for ProductBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
impl ProductBuilder {
    pub fn new() -> Self {
        let json_str = fs::read_to_string("./src/test_support/fixtures/json/product.json").unwrap();
        let dto: ProductDto = serde_json::from_str(&json_str).unwrap();

        Self {
            inner: Product {
                id: Uuid::now_v7(),
                name: dto.name,
                brand: dto.brand,
                category: dto.category,
                price: dto.price,
                is_active: dto.is_active,
            },
        }
    }

    pub fn id(mut self, v: Uuid) -> Self {
        self.inner.id = v;
        self
    }

    pub fn name(mut self, v: impl Into<String>) -> Self {
        self.inner.name = v.into();
        self
    }

    pub fn brand(mut self, v: impl Into<String>) -> Self {
        self.inner.brand = Some(v.into());
        self
    }

    pub fn category(mut self, v: impl Into<String>) -> Self {
        self.inner.category = Some(v.into());
        self
    }

    pub fn price(mut self, v: Decimal) -> Self {
        self.inner.price = v;
        self
    }

    pub fn is_active(mut self, v: bool) -> Self {
        self.inner.is_active = v;
        self
    }

    pub fn build(self) -> Product {
        self.inner
    }
}

#[cfg(test)]
mod product_builder_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn default_delegates_to_new_and_parses_json() {
        let built = ProductBuilder::default().build();
        assert_eq!(built.name, "Stoneware mug");
        assert_eq!(built.brand.as_deref(), Some("Kiln & Co"));
        assert_eq!(built.category.as_deref(), Some("Kitchen"));
        assert_eq!(built.price, Decimal::new(2495, 2));
        assert!(built.is_active);
    }

    #[rstest]
    fn setters_override_fields_and_ids_are_fresh() {
        let first = ProductBuilder::new().build();
        let custom = ProductBuilder::new()
            .name("Teapot")
            .brand("Other")
            .category("Tea")
            .price(Decimal::from(30))
            .is_active(false)
            .build();

        assert_ne!(first.id, custom.id);
        assert_eq!(custom.name, "Teapot");
        assert_eq!(custom.brand.as_deref(), Some("Other"));
        assert_eq!(custom.category.as_deref(), Some("Tea"));
        assert_eq!(custom.price, Decimal::from(30));
        assert!(!custom.is_active);
    }
}
