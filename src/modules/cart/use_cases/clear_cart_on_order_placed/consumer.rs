// Consumer that empties a customer's cart once their order has been placed.
//
// Purpose
// - React to DELETE_CART events published by the outbox dispatcher.
//
// Responsibilities
// - Acknowledge unknown event types straight away.
// - Clear the cart, then acknowledge. A failed clear is left unacknowledged so the
//   message comes back; clearing is idempotent, so a repeat is harmless.
// - Back off after a failure and stop cleanly on cancellation.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::modules::cart::core::cart::CartError;
use crate::modules::cart::core::ports::CartSnapshotProvider;
use crate::modules::orders::core::outbox_event::{DeleteCartPayload, EVENT_DELETE_CART};
use crate::shared::infrastructure::message_channel::{
    ChannelError, Delivery, HEADER_EVENT_TYPE, MessageSubscriber,
};

#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("clearing cart failed: {0}")]
    Cart(#[from] CartError),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    CartCleared,
    Skipped,
    Discarded,
}

pub struct CartClearingConsumer<TSubscriber, TCarts>
where
    TSubscriber: MessageSubscriber + ?Sized + 'static,
    TCarts: CartSnapshotProvider + ?Sized + 'static,
{
    subscriber: Arc<TSubscriber>,
    carts: Arc<TCarts>,
    retry_backoff: Duration,
}

impl<TSubscriber, TCarts> CartClearingConsumer<TSubscriber, TCarts>
where
    TSubscriber: MessageSubscriber + ?Sized + 'static,
    TCarts: CartSnapshotProvider + ?Sized + 'static,
{
    pub fn new(subscriber: Arc<TSubscriber>, carts: Arc<TCarts>, retry_backoff: Duration) -> Self {
        Self {
            subscriber,
            carts,
            retry_backoff,
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        info!("cart clearing consumer started");
        loop {
            let fetched = tokio::select! {
                _ = shutdown.cancelled() => break,
                fetched = self.subscriber.fetch() => fetched,
            };

            let failed = match fetched {
                Ok(delivery) => self
                    .handle_delivery(delivery)
                    .await
                    .inspect_err(|err| warn!(error = %err, "message left for redelivery"))
                    .is_err(),
                Err(err) => {
                    error!(error = %err, "fetching message failed");
                    true
                }
            };

            if failed && !self.back_off(&shutdown).await {
                break;
            }
        }
        info!("cart clearing consumer stopped");
    }

    /// Process one delivery. The delivery is committed on success; on error it is
    /// dropped uncommitted and will be handed out again.
    pub async fn handle_delivery(&self, delivery: Box<dyn Delivery>) -> Result<Outcome, ConsumerError> {
        let message = delivery.message();
        let outcome = match message.header(HEADER_EVENT_TYPE) {
            Some(EVENT_DELETE_CART) => match DeleteCartPayload::from_bytes(&message.payload) {
                Ok(payload) => {
                    self.carts.clear_cart(payload.user_id).await?;
                    info!(user_id = %payload.user_id, order_id = %payload.order_id, "cart cleared after order placed");
                    Outcome::CartCleared
                }
                Err(err) => {
                    // Redelivering a payload that cannot be parsed would never succeed.
                    error!(offset = message.offset, key = %message.key, error = %err, "discarding malformed DELETE_CART payload");
                    Outcome::Discarded
                }
            },
            other => {
                debug!(event_type = ?other, offset = message.offset, "skipping event");
                Outcome::Skipped
            }
        };
        delivery.commit().await?;
        Ok(outcome)
    }

    async fn back_off(&self, shutdown: &CancellationToken) -> bool {
        tokio::select! {
            _ = shutdown.cancelled() => false,
            _ = tokio::time::sleep(self.retry_backoff) => true,
        }
    }
}
