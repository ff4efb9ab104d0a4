// Background workers started next to the HTTP server.
//
// - Outbox dispatcher: moves committed outbox rows onto the order events topic.
// - Cart clearing consumer: empties the cart once an order has been placed.
//
// Both share one cancellation token; `shutdown` cancels it and waits for them.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::modules::cart::core::ports::CartSnapshotProvider;
use crate::modules::cart::use_cases::clear_cart_on_order_placed::consumer::CartClearingConsumer;
use crate::modules::orders::core::ports::OutboxStore;
use crate::modules::orders::use_cases::relay_outbox::runner::{DispatcherSettings, OutboxDispatcher};
use crate::shared::infrastructure::message_channel::{EventPublisher, MessageSubscriber};
use crate::shell::config::AppConfig;

pub struct WorkerPorts {
    pub outbox: Arc<dyn OutboxStore>,
    pub publisher: Arc<dyn EventPublisher>,
    pub subscriber: Arc<dyn MessageSubscriber>,
    pub carts: Arc<dyn CartSnapshotProvider>,
}

pub struct BackgroundWorkers {
    shutdown: CancellationToken,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl BackgroundWorkers {
    pub fn spawn(config: &AppConfig, ports: WorkerPorts) -> Self {
        let shutdown = CancellationToken::new();

        let dispatcher = OutboxDispatcher::new(
            ports.outbox,
            ports.publisher,
            DispatcherSettings {
                topic: config.order_events_topic.clone(),
                poll_interval: config.outbox_poll_interval,
                batch_size: config.outbox_batch_size,
                max_attempts: config.outbox_max_attempts,
            },
        );
        let consumer = CartClearingConsumer::new(ports.subscriber, ports.carts, config.consumer_retry_backoff);

        let handles = vec![
            ("outbox_dispatcher", tokio::spawn(dispatcher.run(shutdown.clone()))),
            ("cart_clearing_consumer", tokio::spawn(consumer.run(shutdown.clone()))),
        ];
        Self { shutdown, handles }
    }

    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for (name, handle) in self.handles {
            if let Err(err) = handle.await {
                tracing::error!(worker = name, error = %err, "worker ended abnormally");
            }
        }
    }
}
