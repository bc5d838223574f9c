// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Eventos Locais Billing Module
//!
//! Subscription entitlements and payments for the local-events
//! platform.
//!
//! ## Features
//!
//! - **Entitlement Evaluation**: Pure plan/usage checks for event
//!   creation, highlights, recurring series, analytics and branding
//! - **Subscription Management**: Activate, cancel (7-day grace
//!   period), reactivate, monthly counter resets
//! - **Payment Providers**: Backend-agnostic checkout/portal/webhook
//!   interface, with a signed-webhook mock for development
//! - **Payment Ledger**: Append-only payment records plus a
//!   lifetime-spend rollup per user
//! - **Webhooks**: Apply provider events to subscription state

pub mod entitlement;
pub mod error;
pub mod mock;
pub mod payments;
pub mod provider;
pub mod subscriptions;
pub mod webhooks;

#[cfg(test)]
mod edge_case_tests;

pub use entitlement::{EntitlementDecision, RemediationAction, UsageSummary};
pub use error::{BillingError, BillingResult};
pub use mock::MockPaymentProvider;
pub use payments::{NewPayment, PaymentLedger};
pub use provider::{
    CheckoutMetadata, CheckoutParams, CheckoutSessionInfo, PaymentProvider, PortalSession,
    ProviderSubscription, WebhookEvent,
};
pub use subscriptions::{ActivateSubscription, SubscriptionService, GRACE_PERIOD};
pub use webhooks::WebhookHandler;

use std::sync::Arc;

use eventos_shared::DocumentStore;

/// Aggregated billing services sharing one document store
#[derive(Clone)]
pub struct BillingService {
    pub subscriptions: SubscriptionService,
    pub ledger: PaymentLedger,
    pub webhooks: WebhookHandler,
}

impl BillingService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let subscriptions = SubscriptionService::new(store.clone());
        let ledger = PaymentLedger::new(store);
        let webhooks = WebhookHandler::new(subscriptions.clone(), ledger.clone());
        Self {
            subscriptions,
            ledger,
            webhooks,
        }
    }
}
