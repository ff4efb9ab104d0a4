use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::modules::orders::use_cases::checkout::command::Checkout;
use crate::modules::orders::use_cases::checkout::handler::CheckoutError;
use crate::shared::infrastructure::http::api_error::ApiError;
use crate::shared::infrastructure::http::current_user::CurrentUser;
use crate::shell::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CheckoutBody {
    pub address_id: Option<String>,
    pub note: Option<String>,
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::InvalidUserId(_) => ApiError::bad_request("INVALID_USER_ID", err.to_string()),
            CheckoutError::CartEmpty => ApiError::bad_request("CART_EMPTY", err.to_string()),
            CheckoutError::InvalidAddressReference(_) => {
                ApiError::bad_request("INVALID_ADDRESS_REFERENCE", err.to_string())
            }
            CheckoutError::CartUnavailable(_) => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "CART_UNAVAILABLE",
                "cart is temporarily unavailable",
            ),
            CheckoutError::CheckoutFailed(_) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "CHECKOUT_FAILED",
                "checkout failed, please try again",
            ),
        }
    }
}

pub async fn handle(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Result<Json<CheckoutBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = match body {
        Ok(Json(body)) => body,
        Err(JsonRejection::MissingJsonContentType(_)) => CheckoutBody::default(),
        Err(_) => {
            return Err(ApiError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_BODY",
                "request body is not valid",
            ));
        }
    };
    let command = Checkout {
        address_id: body.address_id,
        note: body.note,
    };
    let order = state
        .checkout
        .handle(&user.user_id.to_string(), command)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[cfg(test)]
mod checkout_http_inbound_tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
        routing::post,
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

    use super::handle;

    fn app(state: AppState) -> Router {
        Router::new()
            .route("/orders/checkout", post(handle))
            .with_state(state)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn it_should_place_an_order_from_the_cart() {
        let test_app = TestApp::new();
        let product = ProductBuilder::new().price(Decimal::from(5000)).build();
        test_app.catalog.upsert(product.clone()).await;
        let user_id = Uuid::now_v7();
        test_app.carts.add_item(user_id, product.id, 2).await.unwrap();

        let response = app(test_app.state())
            .oneshot(
                Request::post("/orders/checkout")
                    .header(HEADER_USER_ID, user_id.to_string())
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"note":"gift wrap"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["total_price"], "10000.00");
        assert_eq!(json["note"], "gift wrap");
        assert_eq!(test_app.db.outbox_events().await.len(), 1);
    }

    #[tokio::test]
    async fn it_should_accept_a_request_without_a_body() {
        let test_app = TestApp::new();
        let product = ProductBuilder::new().build();
        test_app.catalog.upsert(product.clone()).await;
        let user_id = Uuid::now_v7();
        test_app.carts.add_item(user_id, product.id, 1).await.unwrap();

        let response = app(test_app.state())
            .oneshot(
                Request::post("/orders/checkout")
                    .header(HEADER_USER_ID, user_id.to_string())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn it_should_answer_400_cart_empty() {
        let response = app(TestApp::new().state())
            .oneshot(
                Request::post("/orders/checkout")
                    .header(HEADER_USER_ID, Uuid::now_v7().to_string())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "CART_EMPTY");
    }

    #[tokio::test]
    async fn it_should_answer_400_for_an_unknown_address() {
        let test_app = TestApp::new();
        let product = ProductBuilder::new().build();
        test_app.catalog.upsert(product.clone()).await;
        let user_id = Uuid::now_v7();
        test_app.carts.add_item(user_id, product.id, 1).await.unwrap();

        let response = app(test_app.state())
            .oneshot(
                Request::post("/orders/checkout")
                    .header(HEADER_USER_ID, user_id.to_string())
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(format!(r#"{{"address_id":"{}"}}"#, Uuid::now_v7())))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"]["code"],
            "INVALID_ADDRESS_REFERENCE"
        );
        assert!(test_app.db.orders().await.is_empty());
    }

    #[tokio::test]
    async fn it_should_answer_401_without_an_identity() {
        let response = app(TestApp::new().state())
            .oneshot(Request::post("/orders/checkout").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
