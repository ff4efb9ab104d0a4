use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::modules::orders::core::status::{OrderStatus, TransitionError};
use crate::modules::orders::use_cases::change_order_status::command::ChangeOrderStatus;
use crate::modules::orders::use_cases::change_order_status::handler::OrderStatusError;
use crate::shared::infrastructure::http::api_error::{ApiError, path_id};
use crate::shared::infrastructure::http::current_user::{AdminUser, CurrentUser};
use crate::shared::infrastructure::http::payment_gateway::PaymentGateway;
use crate::shell::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    pub status: String,
    pub receipt_number: Option<String>,
}

impl From<OrderStatusError> for ApiError {
    fn from(err: OrderStatusError) -> Self {
        match err {
            OrderStatusError::NotFound(_) => ApiError::not_found("ORDER_NOT_FOUND", err.to_string()),
            OrderStatusError::Transition(ref transition) => {
                let (status, code) = match transition {
                    TransitionError::Unauthorized => (StatusCode::FORBIDDEN, "UNAUTHORIZED"),
                    TransitionError::CannotCancel(_) => (StatusCode::CONFLICT, "CANNOT_CANCEL"),
                    TransitionError::InvalidStatusTransition { .. } => {
                        (StatusCode::CONFLICT, "INVALID_STATUS_TRANSITION")
                    }
                    TransitionError::ReceiptRequired => (StatusCode::BAD_REQUEST, "RECEIPT_REQUIRED"),
                };
                ApiError::new(status, code, err.to_string())
            }
            OrderStatusError::Persistence(reason) => {
                tracing::error!(%reason, "order status change failed");
                ApiError::internal()
            }
        }
    }
}

pub async fn cancel(
    State(state): State<AppState>,
    user: CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let order_id = path_id(path, "INVALID_ORDER_ID")?;
    let order = state
        .order_status
        .handle(ChangeOrderStatus::cancel(order_id, user.user_id))
        .await?;
    Ok(Json(order))
}

pub async fn complete(
    State(state): State<AppState>,
    user: CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let order_id = path_id(path, "INVALID_ORDER_ID")?;
    let order = state
        .order_status
        .handle(ChangeOrderStatus::complete(order_id, user.user_id))
        .await?;
    Ok(Json(order))
}

pub async fn admin_update(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateStatusBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let order_id = path_id(path, "INVALID_ORDER_ID")?;
    let Json(body) = body.map_err(|_| {
        ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "INVALID_BODY",
            "request body is not valid",
        )
    })?;
    let target = body
        .status
        .parse::<OrderStatus>()
        .map_err(|err| ApiError::bad_request("INVALID_STATUS_TRANSITION", err.to_string()))?;
    let order = state
        .order_status
        .handle(ChangeOrderStatus::admin_update(order_id, target, body.receipt_number))
        .await?;
    Ok(Json(order))
}

/// Payment gateway callback, signed with the shared webhook secret.
pub async fn confirm_payment(
    State(state): State<AppState>,
    _gateway: PaymentGateway,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let order_id = path_id(path, "INVALID_ORDER_ID")?;
    let order = state
        .order_status
        .handle(ChangeOrderStatus::confirm_payment(order_id))
        .await?;
    Ok(Json(order))
}
