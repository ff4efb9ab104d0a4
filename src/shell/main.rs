use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{EnvFilter, fmt};

use storefront::modules::addresses::adapters::outbound::address_book_in_memory::InMemoryAddressBook;
use storefront::modules::cart::adapters::outbound::carts_in_memory::InMemoryCarts;
use storefront::modules::catalog::adapters::outbound::catalog_in_memory::InMemoryCatalog;
use storefront::modules::orders::adapters::outbound::orders_in_memory::InMemoryDatabase;
use storefront::modules::orders::adapters::outbound::orders_postgres::PostgresDatabase;
use storefront::modules::orders::core::ports::{Database, OrderQueries, OutboxStore};
use storefront::shared::infrastructure::http::payment_gateway::PaymentWebhookSecret;
use storefront::shared::infrastructure::message_channel::in_memory::InMemoryMessageChannel;
use storefront::shared::infrastructure::message_channel::postgres::PostgresMessageChannel;
use storefront::shared::infrastructure::message_channel::{EventPublisher, MessageSubscriber};
use storefront::shell::config::AppConfig;
use storefront::shell::http::router;
use storefront::shell::seed::SeedData;
use storefront::shell::state::{Adapters, AppState};
use storefront::shell::workers::{BackgroundWorkers, WorkerPorts};

struct OrderStorage {
    database: Arc<dyn Database>,
    order_queries: Arc<dyn OrderQueries>,
    outbox: Arc<dyn OutboxStore>,
    publisher: Arc<dyn EventPublisher>,
    subscriber: Arc<dyn MessageSubscriber>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("loading configuration")?;
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .init();

    let OrderStorage {
        database,
        order_queries,
        outbox,
        publisher,
        subscriber,
    } = order_storage(&config).await?;
    let catalog = Arc::new(InMemoryCatalog::new());
    let carts = Arc::new(InMemoryCarts::new(catalog.clone()));
    let addresses = Arc::new(InMemoryAddressBook::new());
    seed(&config, &catalog, &addresses).await?;
    if config.payment_webhook_secret.is_none() {
        tracing::warn!("PAYMENT_WEBHOOK_SECRET not set, payment callbacks will be refused");
    }

    let workers = BackgroundWorkers::spawn(
        &config,
        WorkerPorts {
            outbox,
            publisher,
            subscriber,
            carts: carts.clone(),
        },
    );

    let state = AppState::new(
        Adapters {
            catalog,
            carts: carts.clone(),
            cart_snapshots: carts,
            addresses,
            database,
            order_queries,
        },
        config.shipping_price,
        PaymentWebhookSecret::new(config.payment_webhook_secret.clone()),
    );

    let listener = tokio::net::TcpListener::bind(config.http_addr)
        .await
        .with_context(|| format!("binding {}", config.http_addr))?;
    tracing::info!(addr = %config.http_addr, "storefront listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("http server stopped, stopping workers");
    workers.shutdown().await;
    Ok(())
}

async fn order_storage(config: &AppConfig) -> anyhow::Result<OrderStorage> {
    match &config.database_url {
        Some(url) => {
            let postgres = Arc::new(
                PostgresDatabase::connect(url, config.database_max_connections)
                    .await
                    .context("connecting to PostgreSQL")?,
            );
            postgres.migrate().await.context("running migrations")?;
            let channel = PostgresMessageChannel::new(postgres.pool(), config.channel_poll_interval);
            tracing::info!("using PostgreSQL order store and message channel");
            Ok(OrderStorage {
                database: postgres.clone(),
                order_queries: postgres.clone(),
                outbox: postgres,
                publisher: Arc::new(channel.clone()),
                subscriber: Arc::new(channel.subscribe(&config.order_events_topic, &config.cart_consumer_group)),
            })
        }
        None => {
            let memory = Arc::new(InMemoryDatabase::new());
            let channel = InMemoryMessageChannel::new();
            tracing::warn!("DATABASE_URL not set, orders and order events are kept in memory");
            Ok(OrderStorage {
                database: memory.clone(),
                order_queries: memory.clone(),
                outbox: memory,
                publisher: Arc::new(channel.clone()),
                subscriber: Arc::new(channel.subscribe(&config.order_events_topic, &config.cart_consumer_group)),
            })
        }
    }
}

async fn seed(
    config: &AppConfig,
    catalog: &InMemoryCatalog,
    addresses: &InMemoryAddressBook,
) -> anyhow::Result<()> {
    let path = &config.catalog_seed_path;
    if !path.exists() {
        tracing::warn!(path = %path.display(), "seed file not found, catalog starts empty");
        return Ok(());
    }
    SeedData::load(path)?.apply(catalog, addresses).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "listening for ctrl-c failed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
