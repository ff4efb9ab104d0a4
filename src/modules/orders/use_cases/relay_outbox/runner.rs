// Outbox dispatcher.
//
// Purpose
// - Move committed outbox events onto the message channel.
//
// Responsibilities
// - Each tick: requeue FAILED events that still have attempts left, then publish up to
//   `batch_size` PENDING events oldest first.
// - Mark each event SENT or FAILED on its own; one bad event never stops the batch.
// - Keep looping until cancelled. A tick in progress is always finished.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::modules::orders::core::outbox_event::OutboxEvent;
use crate::modules::orders::core::ports::{OutboxStore, PersistenceError};
use crate::shared::infrastructure::message_channel::{
    EventPublisher, HEADER_AGGREGATE_TYPE, HEADER_EVENT_TYPE, OutboundMessage,
};

#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub topic: String,
    pub poll_interval: Duration,
    pub batch_size: usize,
    pub max_attempts: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub requeued: u64,
    pub sent: usize,
    pub failed: usize,
}

pub struct OutboxDispatcher<TStore, TPublisher>
where
    TStore: OutboxStore + ?Sized + 'static,
    TPublisher: EventPublisher + ?Sized + 'static,
{
    store: Arc<TStore>,
    publisher: Arc<TPublisher>,
    settings: DispatcherSettings,
}

impl<TStore, TPublisher> OutboxDispatcher<TStore, TPublisher>
where
    TStore: OutboxStore + ?Sized + 'static,
    TPublisher: EventPublisher + ?Sized + 'static,
{
    pub fn new(store: Arc<TStore>, publisher: Arc<TPublisher>, settings: DispatcherSettings) -> Self {
        Self {
            store,
            publisher,
            settings,
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            topic = %self.settings.topic,
            interval_ms = self.settings.poll_interval.as_millis() as u64,
            "outbox dispatcher started"
        );
        let mut interval = tokio::time::interval(self.settings.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    match self.tick().await {
                        Ok(report) if report != TickReport::default() => {
                            debug!(sent = report.sent, failed = report.failed, requeued = report.requeued, "outbox tick");
                        }
                        Ok(_) => {}
                        Err(err) => error!(error = %err, "outbox poll failed"),
                    }
                }
            }
        }

        info!("outbox dispatcher stopped");
    }

    /// One polling pass. Only a failure to read the outbox is returned; per-event
    /// failures are recorded on the event and logged.
    pub async fn tick(&self) -> Result<TickReport, PersistenceError> {
        let mut report = TickReport::default();

        match self.store.requeue_failed(self.settings.max_attempts).await {
            Ok(requeued) => report.requeued = requeued,
            Err(err) => warn!(error = %err, "requeueing failed outbox events failed"),
        }

        let events = self.store.list_pending(self.settings.batch_size).await?;
        for event in events {
            if self.dispatch(&event).await {
                report.sent += 1;
            } else {
                report.failed += 1;
            }
        }
        Ok(report)
    }

    async fn dispatch(&self, event: &OutboxEvent) -> bool {
        let message = OutboundMessage::new(event.aggregate_id.to_string(), event.payload.clone())
            .with_header(HEADER_EVENT_TYPE, event.event_type.as_str())
            .with_header(HEADER_AGGREGATE_TYPE, event.aggregate_type.as_str());

        match self.publisher.publish(&self.settings.topic, message).await {
            Ok(()) => {
                if let Err(err) = self.store.mark_sent(event.id).await {
                    // Published but not recorded; the event goes out again on a later tick.
                    error!(event_id = %event.id, aggregate_id = %event.aggregate_id, error = %err, "marking outbox event sent failed");
                }
                true
            }
            Err(publish_err) => {
                let attempts = event.attempts + 1;
                if let Err(err) = self.store.mark_failed(event.id, &publish_err.to_string()).await {
                    error!(event_id = %event.id, error = %err, "marking outbox event failed failed");
                } else if attempts >= self.settings.max_attempts {
                    error!(
                        event_id = %event.id,
                        aggregate_id = %event.aggregate_id,
                        event_type = %event.event_type,
                        attempts,
                        error = %publish_err,
                        "outbox event dead-lettered"
                    );
                } else {
                    warn!(
                        event_id = %event.id,
                        aggregate_id = %event.aggregate_id,
                        attempts,
                        error = %publish_err,
                        "publishing outbox event failed"
                    );
                }
                false
            }
        }
    }
}
