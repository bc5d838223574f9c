//! Payment endpoints: checkout, billing portal, webhooks

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use eventos_billing::{CheckoutParams, CheckoutSessionInfo, PortalSession};
use eventos_shared::{collections, get_typed, SubscriptionPlan, UserDocument};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub user_id: Option<String>,
    pub plan: String,
    pub event_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalRequest {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SimulateQuery {
    pub action: String,
    pub session_id: String,
    pub user_id: Option<String>,
}

async fn load_user(state: &AppState, user_id: Option<&str>) -> ApiResult<(String, UserDocument)> {
    let user_id = user_id
        .filter(|id| !id.is_empty())
        .ok_or(ApiError::Unauthorized)?;
    let user = get_typed::<UserDocument>(state.store.as_ref(), collections::USERS, user_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?
        .ok_or_else(|| ApiError::NotFound(format!("user not found: {user_id}")))?;
    Ok((user_id.to_string(), user))
}

pub async fn create_checkout(
    State(state): State<AppState>,
    Json(req): Json<CheckoutRequest>,
) -> ApiResult<Json<CheckoutSessionInfo>> {
    let (user_id, user) = load_user(&state, req.user_id.as_deref()).await?;

    let plan = SubscriptionPlan::from_checkout_code(&req.plan)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid plan: {}", req.plan)))?;

    let session = state
        .provider
        .create_checkout_session(CheckoutParams {
            user_id,
            user_email: user.email.clone(),
            user_name: user.display_name.clone(),
            plan,
            event_id: req.event_id,
            success_url: state.config.checkout_success_url(),
            cancel_url: state.config.checkout_cancel_url(),
        })
        .await?;

    Ok(Json(session))
}

pub async fn create_portal(
    State(state): State<AppState>,
    Json(req): Json<PortalRequest>,
) -> ApiResult<Json<PortalSession>> {
    let (user_id, user) = load_user(&state, req.user_id.as_deref()).await?;

    let customer_id = user
        .subscription
        .as_ref()
        .and_then(|sub| sub.customer_id.as_deref())
        .ok_or_else(|| ApiError::NotFound(format!("no billing customer for user: {user_id}")))?;

    let return_url = format!("{}/profile", state.config.app_url);
    let portal = state
        .provider
        .create_portal_session(customer_id, &return_url)
        .await?;
    Ok(Json(portal))
}

/// POST webhook receiver. Signature validation happens before any
/// JSON parsing; handler failures surface as 500 so the provider
/// retries delivery.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<serde_json::Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("missing signature header".to_string()))?;

    let event = state.provider.validate_webhook(&body, signature)?;
    tracing::info!(event_type = %event.event_type(), "Webhook received");

    state
        .billing
        .webhooks
        .handle_event(event)
        .await
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?;

    Ok(Json(json!({ "received": true })))
}

/// Development-only simulation endpoint. Synthesizes the signed
/// completion event for a known checkout session and runs it through
/// the normal webhook path.
pub async fn simulate_webhook(
    State(state): State<AppState>,
    Query(query): Query<SimulateQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let Some(mock) = state.mock_provider.as_ref() else {
        return Err(ApiError::Forbidden(
            "simulation is only available with the mock provider".to_string(),
        ));
    };

    if query.action != "simulate_complete" {
        return Err(ApiError::BadRequest(format!(
            "unknown action: {}",
            query.action
        )));
    }

    let (payload, signature) = mock
        .simulate_checkout_completed(&query.session_id, query.user_id.as_deref())
        .await?;
    let event = state.provider.validate_webhook(&payload, &signature)?;

    state
        .billing
        .webhooks
        .handle_event(event)
        .await
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?;

    Ok(Json(json!({
        "received": true,
        "sessionId": query.session_id,
    })))
}
