//! Payment provider abstraction
//!
//! Everything the platform needs from a payment backend sits behind
//! [`PaymentProvider`]: checkout session creation, a billing portal,
//! webhook validation and subscription lifecycle calls. Providers are
//! constructed at startup and injected where needed; nothing in this
//! crate reaches for a global instance.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use eventos_shared::SubscriptionPlan;

use crate::error::{BillingError, BillingResult};

/// Inputs for creating a checkout session
#[derive(Debug, Clone)]
pub struct CheckoutParams {
    pub user_id: String,
    pub user_email: String,
    pub user_name: String,
    pub plan: SubscriptionPlan,
    /// Set for per-event purchases
    pub event_id: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

/// Metadata attached to a checkout session and echoed back in the
/// completion webhook. This is how the webhook resolves which user
/// and plan a session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutMetadata {
    pub user_id: String,
    /// Plan checkout code, e.g. `MONTHLY`
    pub plan: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

/// A created checkout session, ready for client redirect
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionInfo {
    pub session_id: String,
    pub url: String,
    pub metadata: CheckoutMetadata,
}

/// A billing portal session
#[derive(Debug, Clone, Serialize)]
pub struct PortalSession {
    pub url: String,
}

/// Provider-side view of a subscription
#[derive(Debug, Clone)]
pub struct ProviderSubscription {
    pub subscription_id: String,
    pub customer_id: String,
    pub status: String,
    pub plan: Option<SubscriptionPlan>,
    pub current_period_end: Option<time::OffsetDateTime>,
}

/// Payment backend interface.
///
/// `validate_webhook` is synchronous: signature verification and
/// payload parsing need no I/O.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn create_checkout_session(
        &self,
        params: CheckoutParams,
    ) -> BillingResult<CheckoutSessionInfo>;

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> BillingResult<PortalSession>;

    fn validate_webhook(&self, payload: &[u8], signature: &str) -> BillingResult<WebhookEvent>;

    async fn cancel_subscription(&self, subscription_id: &str) -> BillingResult<bool>;

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> BillingResult<Option<ProviderSubscription>>;
}

/// Payload of a `checkout.session.completed` event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutCompletedData {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub metadata: Option<CheckoutMetadata>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub amount_centavos: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Payload of the `customer.subscription.*` lifecycle events
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionEventData {
    #[serde(default)]
    pub subscription_id: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
}

/// A validated webhook event.
///
/// Parsing is where shape errors surface; handlers downstream match
/// on variants and never re-inspect raw JSON. Event types the
/// platform does not act on land in `Unhandled` and are logged and
/// dropped.
#[derive(Debug, Clone)]
pub enum WebhookEvent {
    CheckoutSessionCompleted(CheckoutCompletedData),
    SubscriptionCreated(SubscriptionEventData),
    SubscriptionUpdated(SubscriptionEventData),
    SubscriptionDeleted(SubscriptionEventData),
    Unhandled { event_type: String },
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: serde_json::Value,
}

impl WebhookEvent {
    /// Parse a raw webhook body into a typed event.
    ///
    /// Known event types must carry a well-formed `data` object;
    /// unknown types parse to `Unhandled` without inspecting `data`.
    pub fn parse(payload: &[u8]) -> BillingResult<Self> {
        let raw: RawEvent = serde_json::from_slice(payload)
            .map_err(|e| BillingError::WebhookPayloadInvalid(e.to_string()))?;

        let event = match raw.event_type.as_str() {
            "checkout.session.completed" => WebhookEvent::CheckoutSessionCompleted(
                serde_json::from_value(raw.data)
                    .map_err(|e| BillingError::WebhookPayloadInvalid(e.to_string()))?,
            ),
            "subscription.created" => WebhookEvent::SubscriptionCreated(
                serde_json::from_value(raw.data)
                    .map_err(|e| BillingError::WebhookPayloadInvalid(e.to_string()))?,
            ),
            "subscription.updated" => WebhookEvent::SubscriptionUpdated(
                serde_json::from_value(raw.data)
                    .map_err(|e| BillingError::WebhookPayloadInvalid(e.to_string()))?,
            ),
            "subscription.deleted" => WebhookEvent::SubscriptionDeleted(
                serde_json::from_value(raw.data)
                    .map_err(|e| BillingError::WebhookPayloadInvalid(e.to_string()))?,
            ),
            _ => WebhookEvent::Unhandled {
                event_type: raw.event_type,
            },
        };
        Ok(event)
    }

    pub fn event_type(&self) -> &str {
        match self {
            WebhookEvent::CheckoutSessionCompleted(_) => "checkout.session.completed",
            WebhookEvent::SubscriptionCreated(_) => "subscription.created",
            WebhookEvent::SubscriptionUpdated(_) => "subscription.updated",
            WebhookEvent::SubscriptionDeleted(_) => "subscription.deleted",
            WebhookEvent::Unhandled { event_type } => event_type,
        }
    }

    /// Serialize back to the wire shape (used by the mock provider to
    /// emit events it signs itself).
    pub fn to_payload(&self) -> BillingResult<Vec<u8>> {
        let data = match self {
            WebhookEvent::CheckoutSessionCompleted(data) => serde_json::to_value(data),
            WebhookEvent::SubscriptionCreated(data)
            | WebhookEvent::SubscriptionUpdated(data)
            | WebhookEvent::SubscriptionDeleted(data) => serde_json::to_value(data),
            WebhookEvent::Unhandled { .. } => Ok(serde_json::Value::Null),
        }
        .map_err(|e| BillingError::WebhookPayloadInvalid(e.to_string()))?;

        let body = serde_json::json!({
            "type": self.event_type(),
            "data": data,
        });
        serde_json::to_vec(&body).map_err(|e| BillingError::WebhookPayloadInvalid(e.to_string()))
    }
}
