//! Subscription status and lifecycle endpoints

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use eventos_billing::entitlement;
use eventos_billing::{BillingError, EntitlementDecision, UsageSummary};
use eventos_shared::{Subscription, SubscriptionPlan};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatusResponse {
    pub subscription: Option<Subscription>,
    pub usage: UsageSummary,
    pub entitlements: Entitlements,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entitlements {
    pub can_create_event: EntitlementDecision,
    pub can_highlight_event: EntitlementDecision,
    pub can_create_recurring_event: EntitlementDecision,
    pub can_access_analytics: bool,
    pub can_customize_branding: bool,
    pub is_premium: bool,
}

pub async fn get_status(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<SubscriptionStatusResponse>> {
    let subscription = state.billing.subscriptions.get_subscription(&user_id).await?;
    let sub = subscription.as_ref();

    Ok(Json(SubscriptionStatusResponse {
        usage: entitlement::usage_summary(sub),
        entitlements: Entitlements {
            can_create_event: entitlement::can_create_event(sub),
            can_highlight_event: entitlement::can_highlight_event(sub),
            can_create_recurring_event: entitlement::can_create_recurring_event(sub),
            can_access_analytics: entitlement::can_access_analytics(sub),
            can_customize_branding: entitlement::can_customize_branding(sub),
            is_premium: entitlement::is_premium(sub),
        },
        subscription,
    }))
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    // Tell the provider first when a remote subscription exists, then
    // move local state into the grace period.
    let subscription = state.billing.subscriptions.get_subscription(&user_id).await?;
    if let Some(subscription_id) = subscription
        .as_ref()
        .filter(|sub| sub.plan != SubscriptionPlan::Visitor)
        .and_then(|sub| sub.subscription_id.as_deref())
    {
        if !state.provider.cancel_subscription(subscription_id).await? {
            tracing::warn!(
                user_id = %user_id,
                subscription_id = %subscription_id,
                "Provider had no subscription to cancel"
            );
        }
    }

    state.billing.subscriptions.cancel_subscription(&user_id).await?;
    Ok(Json(json!({ "status": "grace_period" })))
}

pub async fn reactivate(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state
        .billing
        .subscriptions
        .reactivate_subscription(&user_id)
        .await?;
    Ok(Json(json!({ "status": "active" })))
}

/// Register a created event against the monthly quota. The increment
/// re-validates the entitlement, so a denied request returns the
/// decision the UI can surface.
pub async fn register_event(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    match state.billing.subscriptions.increment_event_count(&user_id).await {
        Ok(count) => Ok(Json(json!({ "eventsCreatedThisMonth": count }))),
        Err(BillingError::LimitExceeded(_)) => {
            let subscription = state.billing.subscriptions.get_subscription(&user_id).await?;
            Err(ApiError::Denied(entitlement::can_create_event(
                subscription.as_ref(),
            )))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn register_highlight(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    match state
        .billing
        .subscriptions
        .increment_highlight_count(&user_id)
        .await
    {
        Ok(count) => Ok(Json(json!({ "highlightsUsedThisMonth": count }))),
        Err(BillingError::LimitExceeded(_)) => {
            let subscription = state.billing.subscriptions.get_subscription(&user_id).await?;
            Err(ApiError::Denied(entitlement::can_highlight_event(
                subscription.as_ref(),
            )))
        }
        Err(e) => Err(e.into()),
    }
}
