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

use crate::modules::cart::core::cart::CartError;
use crate::shared::infrastructure::http::api_error::{ApiError, path_id};
use crate::shared::infrastructure::http::current_user::CurrentUser;
use crate::shell::state::AppState;

#[derive(Deserialize)]
pub struct AddItemBody {
    pub product_id: Uuid,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateQuantityBody {
    pub quantity: u32,
}

impl From<CartError> for ApiError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::ProductNotFound(_) => ApiError::not_found("PRODUCT_NOT_FOUND", err.to_string()),
            CartError::InvalidQuantity => ApiError::bad_request("INVALID_QUANTITY", err.to_string()),
            CartError::Backend(reason) => {
                tracing::error!(%reason, "cart backend failure");
                ApiError::internal()
            }
        }
    }
}

fn unprocessable() -> ApiError {
    ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "INVALID_BODY", "request body is not valid")
}

pub async fn detail(State(state): State<AppState>, user: CurrentUser) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.cart_snapshots.detail(user.user_id).await?;
    Ok(Json(snapshot))
}

pub async fn add_item(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Result<Json<AddItemBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body.map_err(|_| unprocessable())?;
    let snapshot = state
        .carts
        .add_item(user.user_id, body.product_id, body.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

pub async fn update_quantity(
    State(state): State<AppState>,
    user: CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateQuantityBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let product_id = path_id(path, "INVALID_PRODUCT_ID")?;
    let Json(body) = body.map_err(|_| unprocessable())?;
    let snapshot = state
        .carts
        .update_quantity(user.user_id, product_id, body.quantity)
        .await?;
    Ok(Json(snapshot))
}

pub async fn remove_item(
    State(state): State<AppState>,
    user: CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let product_id = path_id(path, "INVALID_PRODUCT_ID")?;
    let snapshot = state.carts.remove_item(user.user_id, product_id).await?;
    Ok(Json(snapshot))
}

#[cfg(test)]
mod manage_cart_http_inbound_tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        routing::{get, patch, post},
    };
    use http_body_util::BodyExt;
    use rust_decimal::Decimal;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::modules::cart::core::ports::CartCommands;
    use crate::shared::infrastructure::http::current_user::HEADER_USER_ID;
    use crate::shell::state::AppState;
    use crate::test_support::fixtures::catalog::ProductBuilder;
    use crate::test_support::fixtures::state::TestApp;

    use super::{add_item, detail, remove_item, update_quantity};

    fn app(state: AppState) -> Router {
        Router::new()
            .route("/cart", get(detail))
            .route("/cart/items", post(add_item))
            .route("/cart/items/{product_id}", patch(update_quantity).delete(remove_item))
            .with_state(state)
    }

    #[tokio::test]
    async fn it_should_add_an_item_and_return_the_cart() {
        let test_app = TestApp::new();
        let product = ProductBuilder::new().price(Decimal::from(5000)).build();
        test_app.catalog.upsert(product.clone()).await;
        let user_id = Uuid::now_v7();
        let body = format!(r#"{{"product_id":"{}","quantity":2}}"#, product.id);

        let response = app(test_app.state())
            .oneshot(
                Request::post("/cart/items")
                    .header("content-type", "application/json")
                    .header(HEADER_USER_ID, user_id.to_string())
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["items"][0]["quantity"], 2);
        assert_eq!(json["items"][0]["price"], "5000.00");
    }

    #[tokio::test]
    async fn it_should_return_404_when_adding_an_unknown_product() {
        let body = format!(r#"{{"product_id":"{}","quantity":1}}"#, Uuid::now_v7());
        let response = app(TestApp::new().state())
            .oneshot(
                Request::post("/cart/items")
                    .header("content-type", "application/json")
                    .header(HEADER_USER_ID, Uuid::now_v7().to_string())
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn it_should_return_401_without_an_identity() {
        let response = app(TestApp::new().state())
            .oneshot(Request::get("/cart").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn it_should_return_400_on_a_zero_quantity_update() {
        let test_app = TestApp::new();
        let product = ProductBuilder::new().build();
        test_app.catalog.upsert(product.clone()).await;
        let user_id = Uuid::now_v7();
        test_app.carts.add_item(user_id, product.id, 1).await.unwrap();

        let response = app(test_app.state())
            .oneshot(
                Request::patch(format!("/cart/items/{}", product.id))
                    .header("content-type", "application/json")
                    .header(HEADER_USER_ID, user_id.to_string())
                    .body(Body::from(r#"{"quantity":0}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
