use axum::{
    Json, Router,
    routing::{get, patch, post},
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::modules::cart::use_cases::manage_cart::inbound::http as cart_http;
use crate::modules::catalog::use_cases::browse_products::inbound::http as catalog_http;
use crate::modules::orders::use_cases::change_order_status::inbound::http as status_http;
use crate::modules::orders::use_cases::checkout::inbound::http as checkout_http;
use crate::modules::orders::use_cases::list_orders::inbound::http as list_http;
use crate::shell::state::AppState;

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/products", get(catalog_http::list))
        .route("/products/{product_id}", get(catalog_http::detail))
        .route("/cart", get(cart_http::detail))
        .route("/cart/items", post(cart_http::add_item))
        .route(
            "/cart/items/{product_id}",
            patch(cart_http::update_quantity).delete(cart_http::remove_item),
        )
        .route("/orders", get(list_http::list_mine))
        .route("/orders/checkout", post(checkout_http::handle))
        .route("/orders/{order_id}", get(list_http::detail))
        .route("/orders/{order_id}/cancel", post(status_http::cancel))
        .route("/orders/{order_id}/complete", post(status_http::complete))
        .route("/admin/orders", get(list_http::list_all))
        .route("/admin/orders/{order_id}/status", patch(status_http::admin_update))
        .route("/payments/{order_id}/confirm", post(status_http::confirm_payment))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
