#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Eventos Locais API Server
//!
//! HTTP surface for subscriptions and payments: checkout and portal
//! session creation, the webhook receiver, and subscription status
//! and lifecycle endpoints.

mod config;
mod error;
mod routes;
mod state;

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eventos_shared::MemoryStore;

use crate::config::Config;
use crate::routes::create_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,eventos_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Eventos Locais API v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    tracing::info!(provider = %config.payment_provider, "Configuration loaded");

    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(config.clone(), store)?;

    let cors = if config.allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    tracing::info!(address = %config.bind_address, "Listening");
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::extract::{Path, Query, State};
    use axum::Json;
    use time::OffsetDateTime;

    use eventos_shared::{collections, set_typed, SubscriptionPlan, UserDocument};

    use crate::error::ApiError;
    use crate::routes::payments::{
        self, CheckoutRequest, PortalRequest, SimulateQuery,
    };
    use crate::routes::subscriptions;

    const USER: &str = "ana@example.com";

    fn test_config() -> Config {
        Config {
            bind_address: "127.0.0.1:0".to_string(),
            app_url: "https://eventos.local".to_string(),
            payment_provider: "mock".to_string(),
            payment_webhook_secret: "whsec_test".to_string(),
            allowed_origins: vec![],
        }
    }

    async fn test_state() -> AppState {
        let store = Arc::new(MemoryStore::new());
        let user = UserDocument::new(USER, "Ana", OffsetDateTime::now_utc());
        set_typed(store.as_ref(), collections::USERS, USER, &user)
            .await
            .unwrap();
        AppState::new(test_config(), store).unwrap()
    }

    #[tokio::test]
    async fn checkout_requires_a_user_id() {
        let state = test_state().await;
        let err = payments::create_checkout(
            State(state),
            Json(CheckoutRequest {
                user_id: None,
                plan: "MONTHLY".to_string(),
                event_id: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[tokio::test]
    async fn checkout_rejects_unknown_user_and_plan() {
        let state = test_state().await;

        let err = payments::create_checkout(
            State(state.clone()),
            Json(CheckoutRequest {
                user_id: Some("ghost@example.com".to_string()),
                plan: "MONTHLY".to_string(),
                event_id: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err = payments::create_checkout(
            State(state),
            Json(CheckoutRequest {
                user_id: Some(USER.to_string()),
                plan: "LIFETIME".to_string(),
                event_id: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn checkout_returns_session_with_redirect() {
        let state = test_state().await;
        let Json(session) = payments::create_checkout(
            State(state),
            Json(CheckoutRequest {
                user_id: Some(USER.to_string()),
                plan: "MONTHLY".to_string(),
                event_id: None,
            }),
        )
        .await
        .unwrap();

        assert!(session.session_id.starts_with("mock_cs_"));
        assert!(session
            .url
            .starts_with("https://eventos.local/subscription/success"));
        assert_eq!(session.metadata.user_id, USER);
    }

    #[tokio::test]
    async fn portal_requires_a_billing_customer() {
        let state = test_state().await;
        let err = payments::create_portal(
            State(state),
            Json(PortalRequest {
                user_id: Some(USER.to_string()),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn simulation_activates_subscription_end_to_end() {
        let state = test_state().await;

        let Json(session) = payments::create_checkout(
            State(state.clone()),
            Json(CheckoutRequest {
                user_id: Some(USER.to_string()),
                plan: "MONTHLY".to_string(),
                event_id: None,
            }),
        )
        .await
        .unwrap();

        let Json(body) = payments::simulate_webhook(
            State(state.clone()),
            Query(SimulateQuery {
                action: "simulate_complete".to_string(),
                session_id: session.session_id,
                user_id: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(body["received"], true);

        let Json(status) =
            subscriptions::get_status(State(state), Path(USER.to_string()))
                .await
                .unwrap();
        let sub = status.subscription.unwrap();
        assert_eq!(sub.plan, SubscriptionPlan::Monthly);
        assert!(status.entitlements.can_create_event.allowed);
        assert!(status.entitlements.is_premium);
    }

    #[tokio::test]
    async fn simulation_rejects_unknown_action_and_session() {
        let state = test_state().await;

        let err = payments::simulate_webhook(
            State(state.clone()),
            Query(SimulateQuery {
                action: "simulate_refund".to_string(),
                session_id: "mock_cs_1".to_string(),
                user_id: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err = payments::simulate_webhook(
            State(state),
            Query(SimulateQuery {
                action: "simulate_complete".to_string(),
                session_id: "mock_cs_missing".to_string(),
                user_id: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn event_registration_is_gated_by_plan() {
        let state = test_state().await;

        // Visitor plan: denied outright, with the remediation action.
        let err = subscriptions::register_event(State(state.clone()), Path(USER.to_string()))
            .await
            .unwrap_err();
        match err {
            ApiError::Denied(decision) => {
                assert!(!decision.allowed);
                assert!(decision.action.is_some());
            }
            other => panic!("wrong error: {other:?}"),
        }

        // Activate Monthly via the simulated checkout flow, then the
        // quota applies.
        let Json(session) = payments::create_checkout(
            State(state.clone()),
            Json(CheckoutRequest {
                user_id: Some(USER.to_string()),
                plan: "MONTHLY".to_string(),
                event_id: None,
            }),
        )
        .await
        .unwrap();
        payments::simulate_webhook(
            State(state.clone()),
            Query(SimulateQuery {
                action: "simulate_complete".to_string(),
                session_id: session.session_id,
                user_id: None,
            }),
        )
        .await
        .unwrap();

        for _ in 0..8 {
            subscriptions::register_event(State(state.clone()), Path(USER.to_string()))
                .await
                .unwrap();
        }
        let err = subscriptions::register_event(State(state), Path(USER.to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Denied(_)));
    }

    #[tokio::test]
    async fn cancel_and_reactivate_round_trip() {
        let state = test_state().await;

        subscriptions::cancel(State(state.clone()), Path(USER.to_string()))
            .await
            .unwrap();
        let Json(status) =
            subscriptions::get_status(State(state.clone()), Path(USER.to_string()))
                .await
                .unwrap();
        let sub = status.subscription.unwrap();
        assert!(sub.grace_period_end.is_some());

        subscriptions::reactivate(State(state.clone()), Path(USER.to_string()))
            .await
            .unwrap();
        let Json(status) = subscriptions::get_status(State(state), Path(USER.to_string()))
            .await
            .unwrap();
        assert!(status.subscription.unwrap().grace_period_end.is_none());
    }
}
