// Process configuration, read once at startup.
//
// Every key is optional. Without DATABASE_URL the service runs on the in-memory store.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub http_addr: SocketAddr,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub order_events_topic: String,
    pub cart_consumer_group: String,
    pub outbox_poll_interval: Duration,
    pub outbox_batch_size: usize,
    pub outbox_max_attempts: i32,
    pub consumer_retry_backoff: Duration,
    pub channel_poll_interval: Duration,
    pub shipping_price: Decimal,
    pub catalog_seed_path: PathBuf,
    pub payment_webhook_secret: Option<String>,
    pub log_filter: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let text = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Ok(Self {
            http_addr: parse(&lookup, "HTTP_ADDR", "0.0.0.0:8080")?,
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            database_max_connections: positive(&lookup, "DATABASE_MAX_CONNECTIONS", "10")?,
            order_events_topic: text("ORDER_EVENTS_TOPIC", "order-events"),
            cart_consumer_group: text("CART_CONSUMER_GROUP", "cart-service"),
            outbox_poll_interval: Duration::from_millis(positive(&lookup, "OUTBOX_POLL_INTERVAL_MS", "5000")?),
            outbox_batch_size: positive(&lookup, "OUTBOX_BATCH_SIZE", "100")?,
            outbox_max_attempts: positive(&lookup, "OUTBOX_MAX_ATTEMPTS", "5")?,
            consumer_retry_backoff: Duration::from_millis(parse(&lookup, "CONSUMER_RETRY_BACKOFF_MS", "1000")?),
            channel_poll_interval: Duration::from_millis(positive(&lookup, "CHANNEL_POLL_INTERVAL_MS", "500")?),
            shipping_price: shipping_price(&lookup)?,
            catalog_seed_path: PathBuf::from(text("CATALOG_SEED_PATH", "seed/storefront.json")),
            payment_webhook_secret: lookup("PAYMENT_WEBHOOK_SECRET").filter(|secret| !secret.trim().is_empty()),
            log_filter: text("LOG_FILTER", "info"),
        })
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError> {
    let value = lookup(key)
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string());
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}

fn positive<T: FromStr + PartialOrd + Default>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError> {
    let parsed: T = parse(lookup, key, default)?;
    if parsed <= T::default() {
        return Err(ConfigError::Invalid {
            key,
            value: lookup(key).unwrap_or_default(),
        });
    }
    Ok(parsed)
}

fn shipping_price(lookup: &impl Fn(&str) -> Option<String>) -> Result<Decimal, ConfigError> {
    let price: Decimal = parse(lookup, "SHIPPING_PRICE", "0")?;
    if price.is_sign_negative() {
        return Err(ConfigError::Invalid {
            key: "SHIPPING_PRICE",
            value: price.to_string(),
        });
    }
    Ok(price)
}
