use axum::{
    Json,
    extract::{Path, Query, State, rejection::PathRejection},
    response::IntoResponse,
};
use uuid::Uuid;

use crate::shared::core::pagination::PageParams;
use crate::shared::infrastructure::http::api_error::{ApiError, path_id};
use crate::shell::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let products = state.catalog.list_active(params.into()).await.map_err(|err| {
        tracing::error!(error = %err, "listing products failed");
        ApiError::internal()
    })?;
    Ok(Json(products))
}

pub async fn detail(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let product_id = path_id(path, "INVALID_PRODUCT_ID")?;
    let product = state.catalog.get(product_id).await.map_err(|err| {
        tracing::error!(error = %err, %product_id, "loading product failed");
        ApiError::internal()
    })?;
    match product {
        Some(product) if product.is_active => Ok(Json(product)),
        _ => Err(ApiError::not_found("PRODUCT_NOT_FOUND", "product not found")),
    }
}
