use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::modules::orders::core::order::{Order, OrderDetail};
use crate::modules::orders::core::ports::{OrderFilter, OrderQueries};
use crate::shared::core::pagination::Page;

#[derive(Debug, Error)]
pub enum ListOrdersError {
    #[error("order {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Who is reading. Customers only ever see their own orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: Uuid,
    pub is_admin: bool,
}

pub struct ListOrdersHandler<TQueries>
where
    TQueries: OrderQueries + ?Sized + 'static,
{
    queries: Arc<TQueries>,
}

impl<TQueries> ListOrdersHandler<TQueries>
where
    TQueries: OrderQueries + ?Sized + 'static,
{
    pub fn new(queries: Arc<TQueries>) -> Self {
        Self { queries }
    }

    pub async fn list_mine(&self, user_id: Uuid, page: Page) -> Result<Vec<Order>, ListOrdersError> {
        Ok(self.queries.list_by_user(user_id, page).await?)
    }

    pub async fn list_all(&self, filter: OrderFilter, page: Page) -> Result<Vec<Order>, ListOrdersError> {
        Ok(self.queries.list_all(filter, page).await?)
    }

    /// Someone else's order reads as not found rather than forbidden.
    pub async fn detail(&self, order_id: Uuid, viewer: Viewer) -> Result<OrderDetail, ListOrdersError> {
        let order = self
            .queries
            .get_by_id(order_id)
            .await?
            .filter(|order| viewer.is_admin || order.user_id == viewer.user_id)
            .ok_or(ListOrdersError::NotFound(order_id))?;
        let items = self.queries.items_for_order(order_id).await?;
        Ok(OrderDetail { order, items })
    }
}
