//! Mock payment provider
//!
//! Production-shaped stand-in for a real billing backend. Sessions,
//! customers and subscriptions live in process memory; webhook
//! signatures are real HMAC-SHA256 so the verification path exercised
//! in development is the same one a live provider would hit. The
//! `simulate_checkout_completed` hook mints the signed event a real
//! provider would deliver after payment.

use std::collections::HashMap;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use async_trait::async_trait;

use eventos_shared::SubscriptionPlan;

use crate::error::{BillingError, BillingResult};
use crate::provider::{
    CheckoutCompletedData, CheckoutMetadata, CheckoutParams, CheckoutSessionInfo, PaymentProvider,
    PortalSession, ProviderSubscription, WebhookEvent,
};

type HmacSha256 = Hmac<Sha256>;

const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone)]
struct MockSession {
    metadata: CheckoutMetadata,
    customer_id: String,
}

#[derive(Debug, Clone)]
struct MockSubscription {
    customer_id: String,
    plan: SubscriptionPlan,
    status: String,
    current_period_end: OffsetDateTime,
}

#[derive(Default)]
struct MockState {
    sessions: HashMap<String, MockSession>,
    customers: HashMap<String, String>,
    subscriptions: HashMap<String, MockSubscription>,
}

pub struct MockPaymentProvider {
    webhook_secret: String,
    state: Mutex<MockState>,
}

impl MockPaymentProvider {
    pub fn new(webhook_secret: impl Into<String>) -> Self {
        Self {
            webhook_secret: webhook_secret.into(),
            state: Mutex::new(MockState::default()),
        }
    }

    fn new_session_id() -> String {
        let ts = OffsetDateTime::now_utc().unix_timestamp();
        let rand = Uuid::new_v4().simple().to_string();
        format!("mock_cs_{}_{}", ts, &rand[..9])
    }

    fn customer_id_for(user_id: &str) -> String {
        let sanitized: String = user_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!("mock_cus_{sanitized}")
    }

    /// Sign a payload the way a real provider would, producing a
    /// `t=<unix>,v1=<hex>` header value.
    pub fn sign_payload(&self, payload: &[u8]) -> BillingResult<String> {
        let timestamp = OffsetDateTime::now_utc().unix_timestamp();
        let signature = self.compute_signature(timestamp, payload)?;
        Ok(format!("t={timestamp},v1={signature}"))
    }

    fn compute_signature(&self, timestamp: i64, payload: &[u8]) -> BillingResult<String> {
        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|_| BillingError::Provider("invalid webhook secret".to_string()))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Deliverable event for a completed checkout, as (payload,
    /// signature header). Fails loudly on a session id the mock never
    /// issued; `user_override` substitutes the metadata user id for
    /// testing unresolvable-user handling.
    pub async fn simulate_checkout_completed(
        &self,
        session_id: &str,
        user_override: Option<&str>,
    ) -> BillingResult<(Vec<u8>, String)> {
        let mut state = self.state.lock().await;
        let session = state
            .sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| BillingError::SessionNotFound(session_id.to_string()))?;

        let mut metadata = session.metadata.clone();
        if let Some(user_id) = user_override {
            metadata.user_id = user_id.to_string();
        }

        let plan = SubscriptionPlan::from_checkout_code(&metadata.plan)
            .ok_or_else(|| BillingError::InvalidPlan(metadata.plan.clone()))?;

        let subscription_id = match plan {
            SubscriptionPlan::Monthly | SubscriptionPlan::Annual => {
                let id = format!("mock_sub_{}", Uuid::new_v4().simple());
                let period_end = OffsetDateTime::now_utc()
                    + plan.validity().unwrap_or(time::Duration::days(30));
                state.subscriptions.insert(
                    id.clone(),
                    MockSubscription {
                        customer_id: session.customer_id.clone(),
                        plan,
                        status: "active".to_string(),
                        current_period_end: period_end,
                    },
                );
                Some(id)
            }
            SubscriptionPlan::PerEvent | SubscriptionPlan::Visitor => None,
        };
        drop(state);

        let event = WebhookEvent::CheckoutSessionCompleted(CheckoutCompletedData {
            session_id: session_id.to_string(),
            metadata: Some(metadata),
            customer_id: Some(session.customer_id),
            subscription_id,
            amount_centavos: Some(plan.price_centavos()),
            currency: Some("BRL".to_string()),
        });

        let payload = event.to_payload()?;
        let signature = self.sign_payload(&payload)?;

        tracing::info!(session_id = %session_id, plan = %plan, "Simulated checkout completion");
        Ok((payload, signature))
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_checkout_session(
        &self,
        params: CheckoutParams,
    ) -> BillingResult<CheckoutSessionInfo> {
        let plan_code = params
            .plan
            .checkout_code()
            .ok_or_else(|| BillingError::InvalidPlan(params.plan.to_string()))?;

        let session_id = Self::new_session_id();
        let customer_id = Self::customer_id_for(&params.user_id);

        let metadata = CheckoutMetadata {
            user_id: params.user_id.clone(),
            plan: plan_code.to_string(),
            event_id: params.event_id.clone(),
        };

        {
            let mut state = self.state.lock().await;
            state
                .customers
                .insert(params.user_id.clone(), customer_id.clone());
            state.sessions.insert(
                session_id.clone(),
                MockSession {
                    metadata: metadata.clone(),
                    customer_id,
                },
            );
        }

        // The redirect lands on the real success page with mock
        // markers instead of going through an external checkout.
        let base = params
            .success_url
            .split('?')
            .next()
            .unwrap_or(&params.success_url);
        let url = format!("{base}?mock_session={session_id}&mock_success=true");

        tracing::info!(
            session_id = %session_id,
            user_id = %params.user_id,
            plan = %params.plan,
            "Mock checkout session created"
        );

        Ok(CheckoutSessionInfo {
            session_id,
            url,
            metadata,
        })
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> BillingResult<PortalSession> {
        tracing::info!(customer_id = %customer_id, "Mock portal session created");
        Ok(PortalSession {
            url: format!("{return_url}?mock_portal=true&customer={customer_id}"),
        })
    }

    fn validate_webhook(&self, payload: &[u8], signature: &str) -> BillingResult<WebhookEvent> {
        // Header format: t=timestamp,v1=signature
        let mut timestamp: Option<i64> = None;
        let mut v1_signature: Option<&str> = None;
        for part in signature.split(',') {
            match part.split_once('=') {
                Some(("t", value)) => timestamp = value.parse().ok(),
                Some(("v1", value)) => v1_signature = Some(value),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(BillingError::WebhookSignatureInvalid)?;
        let v1_signature = v1_signature.ok_or(BillingError::WebhookSignatureInvalid)?;

        let now = OffsetDateTime::now_utc().unix_timestamp();
        if (now - timestamp).abs() > TIMESTAMP_TOLERANCE_SECS {
            tracing::warn!(
                timestamp = timestamp,
                diff = (now - timestamp).abs(),
                "Webhook timestamp outside tolerance"
            );
            return Err(BillingError::WebhookSignatureInvalid);
        }

        let computed = self.compute_signature(timestamp, payload)?;
        if computed != v1_signature {
            tracing::warn!("Webhook signature mismatch");
            return Err(BillingError::WebhookSignatureInvalid);
        }

        WebhookEvent::parse(payload)
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> BillingResult<bool> {
        let mut state = self.state.lock().await;
        match state.subscriptions.get_mut(subscription_id) {
            Some(sub) => {
                sub.status = "cancelled".to_string();
                tracing::info!(subscription_id = %subscription_id, "Mock subscription cancelled");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> BillingResult<Option<ProviderSubscription>> {
        let state = self.state.lock().await;
        Ok(state
            .subscriptions
            .get(subscription_id)
            .map(|sub| ProviderSubscription {
                subscription_id: subscription_id.to_string(),
                customer_id: sub.customer_id.clone(),
                status: sub.status.clone(),
                plan: Some(sub.plan),
                current_period_end: Some(sub.current_period_end),
            }))
    }
}
