// PostgreSQL implementation of the message channel ports.
//
// Responsibilities
// - Append published messages to `channel_messages`; the row id is the offset.
// - Record group acknowledgements in `channel_acks`.
// - Hand out the oldest unacknowledged message per group inside a transaction that holds
//   its row lock (`FOR UPDATE SKIP LOCKED`), so concurrent members skip it.
// - Commit inserts the acknowledgement; a delivery dropped before that rolls back and
//   the message becomes visible again, also after a restart.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use crate::shared::infrastructure::message_channel::{
    ChannelError, Delivery, EventPublisher, Message, MessageSubscriber, OutboundMessage,
};

fn backend(err: sqlx::Error) -> ChannelError {
    ChannelError::Backend(err.to_string())
}

#[derive(FromRow)]
struct MessageRow {
    id: i64,
    topic: String,
    key: String,
    headers: serde_json::Value,
    payload: Vec<u8>,
}

impl TryFrom<MessageRow> for Message {
    type Error = ChannelError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let headers: BTreeMap<String, String> = serde_json::from_value(row.headers)
            .map_err(|err| ChannelError::Backend(format!("message {} headers: {err}", row.id)))?;
        let offset = u64::try_from(row.id)
            .map_err(|_| ChannelError::Backend(format!("negative message id {}", row.id)))?;
        Ok(Message {
            topic: row.topic,
            offset,
            key: row.key,
            headers,
            payload: row.payload,
        })
    }
}

#[derive(Clone)]
pub struct PostgresMessageChannel {
    pool: PgPool,
    poll_interval: Duration,
}

impl PostgresMessageChannel {
    pub fn new(pool: PgPool, poll_interval: Duration) -> Self {
        Self { pool, poll_interval }
    }

    pub fn subscribe(&self, topic: impl Into<String>, group: impl Into<String>) -> PostgresSubscription {
        PostgresSubscription {
            pool: self.pool.clone(),
            topic: topic.into(),
            group: group.into(),
            poll_interval: self.poll_interval,
        }
    }
}

#[async_trait]
impl EventPublisher for PostgresMessageChannel {
    async fn publish(&self, topic: &str, message: OutboundMessage) -> Result<(), ChannelError> {
        let headers = serde_json::to_value(&message.headers)
            .map_err(|err| ChannelError::Backend(format!("headers: {err}")))?;
        sqlx::query("INSERT INTO channel_messages (topic, key, headers, payload) VALUES ($1, $2, $3, $4)")
            .bind(topic)
            .bind(&message.key)
            .bind(headers)
            .bind(&message.payload)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

pub struct PostgresSubscription {
    pool: PgPool,
    topic: String,
    group: String,
    poll_interval: Duration,
}

impl PostgresSubscription {
    async fn try_take(&self) -> Result<Option<PostgresDelivery>, ChannelError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let row: Option<MessageRow> = sqlx::query_as(
            "SELECT m.id, m.topic, m.key, m.headers, m.payload FROM channel_messages m \
             WHERE m.topic = $1 \
               AND NOT EXISTS (SELECT 1 FROM channel_acks a WHERE a.group_name = $2 AND a.message_id = m.id) \
             ORDER BY m.id LIMIT 1 FOR UPDATE OF m SKIP LOCKED",
        )
        .bind(&self.topic)
        .bind(&self.group)
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?;

        match row {
            Some(row) => Ok(Some(PostgresDelivery {
                tx,
                group: self.group.clone(),
                message: Message::try_from(row)?,
            })),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl MessageSubscriber for PostgresSubscription {
    async fn fetch(&self) -> Result<Box<dyn Delivery>, ChannelError> {
        loop {
            if let Some(delivery) = self.try_take().await? {
                return Ok(Box::new(delivery));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

pub struct PostgresDelivery {
    tx: Transaction<'static, Postgres>,
    group: String,
    message: Message,
}

#[async_trait]
impl Delivery for PostgresDelivery {
    fn message(&self) -> &Message {
        &self.message
    }

    async fn commit(self: Box<Self>) -> Result<(), ChannelError> {
        let PostgresDelivery { mut tx, group, message } = *self;
        let message_id = i64::try_from(message.offset)
            .map_err(|_| ChannelError::Backend(format!("offset {} out of range", message.offset)))?;
        sqlx::query("INSERT INTO channel_acks (group_name, message_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(&group)
            .bind(message_id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        tx.commit().await.map_err(backend)
    }
}

#[cfg(test)]
mod postgres_message_channel_tests {
    use super::*;
    use crate::modules::orders::adapters::outbound::orders_postgres::PostgresDatabase;
    use rstest::rstest;
    use tokio::time::timeout;
    use uuid::Uuid;

    async fn pool() -> PgPool {
        dotenvy::dotenv().ok();
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");
        let database = PostgresDatabase::connect(&url, 2).await.expect("connect failed");
        database.migrate().await.expect("migrate failed");
        database.pool()
    }

    fn message(key: &str) -> OutboundMessage {
        OutboundMessage::new(key, key.as_bytes().to_vec()).with_header("event_type", "DELETE_CART")
    }

    #[rstest]
    #[tokio::test]
    #[ignore]
    async fn integration_should_redeliver_to_a_fresh_subscriber_until_committed() {
        let pool = pool().await;
        let topic = format!("order-events-{}", Uuid::now_v7());
        let channel = PostgresMessageChannel::new(pool.clone(), Duration::from_millis(20));
        channel.publish(&topic, message("a")).await.unwrap();

        let first = channel.subscribe(&topic, "cart").fetch().await.unwrap();
        assert_eq!(first.message().key, "a");
        assert_eq!(first.message().header("event_type"), Some("DELETE_CART"));
        drop(first);

        let restarted = PostgresMessageChannel::new(pool, Duration::from_millis(20));
        let subscription = restarted.subscribe(&topic, "cart");
        let again = subscription.fetch().await.unwrap();
        assert_eq!(again.message().key, "a");
        again.commit().await.unwrap();

        let nothing = timeout(Duration::from_millis(200), subscription.fetch()).await;
        assert!(nothing.is_err(), "no message should be left for the group");

        let audit = restarted.subscribe(&topic, "audit").fetch().await.unwrap();
        assert_eq!(audit.message().key, "a");
    }

    #[rstest]
    #[tokio::test]
    #[ignore]
    async fn integration_should_hand_a_locked_message_to_only_one_member() {
        let pool = pool().await;
        let topic = format!("order-events-{}", Uuid::now_v7());
        let channel = PostgresMessageChannel::new(pool, Duration::from_millis(20));
        channel.publish(&topic, message("a")).await.unwrap();
        channel.publish(&topic, message("b")).await.unwrap();

        let one = channel.subscribe(&topic, "cart").fetch().await.unwrap();
        let two = channel.subscribe(&topic, "cart").fetch().await.unwrap();
        assert_ne!(one.message().offset, two.message().offset);
        one.commit().await.unwrap();
        two.commit().await.unwrap();
    }
}
