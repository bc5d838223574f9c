//! HTTP route wiring

pub mod payments;
pub mod subscriptions;

use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/payments/checkout", post(payments::create_checkout))
        .route("/payments/portal", post(payments::create_portal))
        .route(
            "/payments/webhook",
            post(payments::handle_webhook).get(payments::simulate_webhook),
        )
        .route("/subscriptions/{user_id}", get(subscriptions::get_status))
        .route(
            "/subscriptions/{user_id}/cancel",
            post(subscriptions::cancel),
        )
        .route(
            "/subscriptions/{user_id}/reactivate",
            post(subscriptions::reactivate),
        )
        .route(
            "/subscriptions/{user_id}/events",
            post(subscriptions::register_event),
        )
        .route(
            "/subscriptions/{user_id}/highlights",
            post(subscriptions::register_highlight),
        )
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
