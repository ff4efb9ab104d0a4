use axum::{
    Json,
    extract::{Path, Query, State, rejection::PathRejection},
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::modules::orders::core::ports::OrderFilter;
use crate::modules::orders::core::status::OrderStatus;
use crate::modules::orders::use_cases::list_orders::handler::{ListOrdersError, Viewer};
use crate::shared::core::pagination::{Page, PageParams};
use crate::shared::infrastructure::http::api_error::{ApiError, path_id};
use crate::shared::infrastructure::http::current_user::{AdminUser, CurrentUser};
use crate::shell::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AdminListParams {
    pub status: Option<String>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl From<ListOrdersError> for ApiError {
    fn from(err: ListOrdersError) -> Self {
        match err {
            ListOrdersError::NotFound(_) => ApiError::not_found("ORDER_NOT_FOUND", err.to_string()),
            ListOrdersError::Backend(reason) => {
                tracing::error!(reason = %reason, "order query failed");
                ApiError::internal()
            }
        }
    }
}

pub async fn list_mine(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let orders = state.orders.list_mine(user.user_id, params.into()).await?;
    Ok(Json(orders))
}

pub async fn detail(
    State(state): State<AppState>,
    user: CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let order_id = path_id(path, "INVALID_ORDER_ID")?;
    let viewer = Viewer {
        user_id: user.user_id,
        is_admin: user.is_admin,
    };
    let detail = state.orders.detail(order_id, viewer).await?;
    Ok(Json(detail))
}

pub async fn list_all(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(params): Query<AdminListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let status = params
        .status
        .as_deref()
        .filter(|status| !status.trim().is_empty())
        .map(str::parse::<OrderStatus>)
        .transpose()
        .map_err(|err| ApiError::bad_request("INVALID_STATUS", err.to_string()))?;
    let orders = state
        .orders
        .list_all(OrderFilter { status }, Page::new(params.offset, params.limit))
        .await?;
    Ok(Json(orders))
}
