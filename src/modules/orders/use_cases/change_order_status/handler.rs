// Applies one order status transition inside a single transaction.
//
// Responsibilities
// - Lock the order row, decide the transition against its current status, write the new
//   status and commit.
// - Leave the order untouched on every error path; dropping the transaction rolls back.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::modules::orders::core::order::Order;
use crate::modules::orders::core::ports::{Database, PersistenceError};
use crate::modules::orders::core::status::{TransitionError, decide_transition};
use crate::modules::orders::use_cases::change_order_status::command::ChangeOrderStatus;

#[derive(Debug, Error)]
pub enum OrderStatusError {
    #[error("order {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

pub struct ChangeOrderStatusHandler<TDatabase>
where
    TDatabase: Database + ?Sized + 'static,
{
    database: Arc<TDatabase>,
}

impl<TDatabase> ChangeOrderStatusHandler<TDatabase>
where
    TDatabase: Database + ?Sized + 'static,
{
    pub fn new(database: Arc<TDatabase>) -> Self {
        Self { database }
    }

    pub async fn handle(&self, command: ChangeOrderStatus) -> Result<Order, OrderStatusError> {
        let ChangeOrderStatus {
            order_id,
            actor,
            target,
            receipt_number,
        } = command;

        let mut tx = self.database.begin().await?;
        let mut order = tx
            .lock_order(order_id)
            .await?
            .ok_or(OrderStatusError::NotFound(order_id))?;

        let transition = decide_transition(
            order.user_id,
            order.status,
            actor,
            target,
            receipt_number.as_deref(),
        )
        .inspect_err(|err| {
            warn!(%order_id, current = %order.status, %target, ?actor, error = %err, "status transition rejected");
        })?;

        let now = Utc::now();
        tx.update_order_status(order_id, transition.to, transition.receipt_number.as_deref(), now)
            .await?;
        tx.commit().await?;

        info!(
            %order_id,
            order_number = %order.order_number,
            from = %transition.from,
            to = %transition.to,
            "order status changed"
        );

        order.status = transition.to;
        if transition.receipt_number.is_some() {
            order.receipt_number = transition.receipt_number;
        }
        order.updated_at = now;
        Ok(order)
    }
}

#[cfg(test)]
mod change_order_status_handler_tests {
    use std::sync::Arc;

    use rstest::{fixture, rstest};
    use uuid::Uuid;

    use crate::modules::orders::adapters::outbound::orders_in_memory::InMemoryDatabase;
    use crate::modules::orders::core::order::Order;
    use crate::modules::orders::core::ports::OrderQueries;
    use crate::modules::orders::core::status::{OrderStatus, TransitionError};
    use crate::modules::orders::use_cases::change_order_status::command::ChangeOrderStatus;
    use crate::modules::orders::use_cases::change_order_status::handler::{
        ChangeOrderStatusHandler, OrderStatusError,
    };
    use crate::test_support::fixtures::orders::{make_order, seed_order};

    type BeforeEachReturn = (Order, Arc<InMemoryDatabase>, ChangeOrderStatusHandler<InMemoryDatabase>);

    async fn with_order_in(status: OrderStatus) -> BeforeEachReturn {
        let db = Arc::new(InMemoryDatabase::new());
        let mut order = make_order(Uuid::now_v7());
        order.status = status;
        seed_order(&db, &order).await;
        let handler = ChangeOrderStatusHandler::new(db.clone());
        (order, db, handler)
    }

    #[fixture]
    async fn before_each() -> BeforeEachReturn {
        with_order_in(OrderStatus::Pending).await
    }

    async fn stored_status(db: &InMemoryDatabase, order_id: Uuid) -> OrderStatus {
        db.get_by_id(order_id).await.unwrap().unwrap().status
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_cancel_a_pending_order_only_once(#[future] before_each: BeforeEachReturn) {
        let (order, db, handler) = before_each.await;

        let cancelled = handler
            .handle(ChangeOrderStatus::cancel(order.id, order.user_id))
            .await
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(stored_status(&db, order.id).await, OrderStatus::Cancelled);

        let again = handler
            .handle(ChangeOrderStatus::cancel(order.id, order.user_id))
            .await;
        assert!(matches!(
            again,
            Err(OrderStatusError::Transition(TransitionError::CannotCancel(OrderStatus::Cancelled)))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_refuse_a_customer_who_does_not_own_the_order(
        #[future] before_each: BeforeEachReturn,
    ) {
        let (order, db, handler) = before_each.await;

        let result = handler
            .handle(ChangeOrderStatus::cancel(order.id, Uuid::now_v7()))
            .await;

        assert!(matches!(
            result,
            Err(OrderStatusError::Transition(TransitionError::Unauthorized))
        ));
        assert_eq!(stored_status(&db, order.id).await, OrderStatus::Pending);
    }

    #[rstest]
    #[case::missing(None)]
    #[case::blank(Some("   "))]
    #[tokio::test]
    async fn it_should_require_a_receipt_to_ship(#[case] receipt_number: Option<&str>) {
        let (order, db, handler) = with_order_in(OrderStatus::Processing).await;

        let result = handler
            .handle(ChangeOrderStatus::admin_update(
                order.id,
                OrderStatus::Shipped,
                receipt_number.map(str::to_string),
            ))
            .await;

        assert!(matches!(
            result,
            Err(OrderStatusError::Transition(TransitionError::ReceiptRequired))
        ));
        assert_eq!(stored_status(&db, order.id).await, OrderStatus::Processing);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_walk_an_order_through_its_lifecycle(#[future] before_each: BeforeEachReturn) {
        let (order, db, handler) = before_each.await;

        handler
            .handle(ChangeOrderStatus::confirm_payment(order.id))
            .await
            .unwrap();
        handler
            .handle(ChangeOrderStatus::admin_update(order.id, OrderStatus::Processing, None))
            .await
            .unwrap();
        let shipped = handler
            .handle(ChangeOrderStatus::admin_update(
                order.id,
                OrderStatus::Shipped,
                Some(" TRK-0042 ".into()),
            ))
            .await
            .unwrap();
        assert_eq!(shipped.receipt_number.as_deref(), Some("TRK-0042"));

        handler
            .handle(ChangeOrderStatus::admin_update(order.id, OrderStatus::Delivered, None))
            .await
            .unwrap();
        let completed = handler
            .handle(ChangeOrderStatus::complete(order.id, order.user_id))
            .await
            .unwrap();

        assert_eq!(completed.status, OrderStatus::Completed);
        let stored = db.get_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Completed);
        assert_eq!(stored.receipt_number.as_deref(), Some("TRK-0042"));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_not_skip_payment(#[future] before_each: BeforeEachReturn) {
        let (order, db, handler) = before_each.await;

        let result = handler
            .handle(ChangeOrderStatus::admin_update(order.id, OrderStatus::Processing, None))
            .await;

        assert!(matches!(
            result,
            Err(OrderStatusError::Transition(TransitionError::InvalidStatusTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Processing
            }))
        ));
        assert_eq!(stored_status(&db, order.id).await, OrderStatus::Pending);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_report_unknown_orders(#[future] before_each: BeforeEachReturn) {
        let (_, _, handler) = before_each.await;
        let missing = Uuid::now_v7();

        let result = handler.handle(ChangeOrderStatus::confirm_payment(missing)).await;

        assert!(matches!(result, Err(OrderStatusError::NotFound(id)) if id == missing));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_surface_storage_failures() {
        let mut db = InMemoryDatabase::new();
        db.toggle_offline();
        let handler = ChangeOrderStatusHandler::new(Arc::new(db));

        let result = handler
            .handle(ChangeOrderStatus::confirm_payment(Uuid::now_v7()))
            .await;

        assert!(matches!(result, Err(OrderStatusError::Persistence(_))));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_let_only_one_of_two_concurrent_cancels_win(
        #[future] before_each: BeforeEachReturn,
    ) {
        let (order, _, handler) = before_each.await;
        let (order_id, user_id) = (order.id, order.user_id);
        let handler = Arc::new(handler);

        let first = tokio::spawn({
            let handler = handler.clone();
            async move { handler.handle(ChangeOrderStatus::cancel(order_id, user_id)).await }
        });
        let second = tokio::spawn({
            let handler = handler.clone();
            async move { handler.handle(ChangeOrderStatus::cancel(order_id, user_id)).await }
        });

        let results = [first.await.unwrap(), second.await.unwrap()];
        assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
        assert!(results.iter().any(|result| matches!(
            result,
            Err(OrderStatusError::Transition(TransitionError::CannotCancel(_)))
        )));
    }
}
