//! Webhook event handling
//!
//! Takes events already validated by a provider and applies them to
//! subscription state and the payment ledger. Activation failures are
//! fatal (the provider retries on 5xx); ledger failures after a
//! successful activation are logged and swallowed so the user is
//! never left paying for an inactive plan.

use uuid::Uuid;

use eventos_shared::{PaymentKind, PaymentStatus, SubscriptionPlan, SubscriptionStatus};

use crate::error::{BillingError, BillingResult};
use crate::payments::{NewPayment, PaymentLedger};
use crate::provider::{CheckoutCompletedData, SubscriptionEventData, WebhookEvent};
use crate::subscriptions::{ActivateSubscription, SubscriptionService};

#[derive(Clone)]
pub struct WebhookHandler {
    subscriptions: SubscriptionService,
    ledger: PaymentLedger,
}

impl WebhookHandler {
    pub fn new(subscriptions: SubscriptionService, ledger: PaymentLedger) -> Self {
        Self {
            subscriptions,
            ledger,
        }
    }

    pub async fn handle_event(&self, event: WebhookEvent) -> BillingResult<()> {
        match event {
            WebhookEvent::CheckoutSessionCompleted(data) => {
                self.handle_checkout_completed(data).await
            }
            WebhookEvent::SubscriptionCreated(data) | WebhookEvent::SubscriptionUpdated(data) => {
                self.handle_subscription_update(data).await
            }
            WebhookEvent::SubscriptionDeleted(data) => self.handle_subscription_deleted(data).await,
            WebhookEvent::Unhandled { event_type } => {
                tracing::info!(event_type = %event_type, "Ignoring unhandled webhook event");
                Ok(())
            }
        }
    }

    async fn handle_checkout_completed(&self, data: CheckoutCompletedData) -> BillingResult<()> {
        let metadata = data
            .metadata
            .ok_or(BillingError::WebhookUserUnresolvable)?;
        if metadata.user_id.is_empty() || metadata.user_id == "unknown" {
            tracing::error!(
                session_id = %data.session_id,
                "Checkout completed with no resolvable user"
            );
            return Err(BillingError::WebhookUserUnresolvable);
        }

        let plan = SubscriptionPlan::from_checkout_code(&metadata.plan)
            .ok_or_else(|| BillingError::InvalidPlan(metadata.plan.clone()))?;

        self.subscriptions
            .activate_subscription(ActivateSubscription {
                user_id: metadata.user_id.clone(),
                plan,
                status: SubscriptionStatus::Active,
                subscription_id: data.subscription_id.clone(),
                customer_id: data.customer_id.clone(),
            })
            .await?;

        let amount_centavos = data.amount_centavos.unwrap_or_else(|| plan.price_centavos());
        let kind = if plan == SubscriptionPlan::PerEvent {
            PaymentKind::PerEvent
        } else {
            PaymentKind::Subscription
        };
        let payment_intent_id = data
            .subscription_id
            .clone()
            .unwrap_or_else(|| format!("mock_pi_{}", Uuid::new_v4().simple()));
        let mut description = format!("Pagamento {}", metadata.plan);
        if let Some(event_id) = &metadata.event_id {
            description.push_str(&format!(" - Evento {event_id}"));
        }

        let entry = NewPayment {
            user_id: metadata.user_id.clone(),
            kind,
            payment_intent_id,
            invoice_id: None,
            event_id: metadata.event_id.clone(),
            amount_centavos,
            currency: data.currency.unwrap_or_else(|| "BRL".to_string()),
            status: PaymentStatus::Succeeded,
            description,
            receipt_url: None,
        };

        // Subscription is already active at this point; a ledger
        // failure must not fail the webhook and trigger a re-delivery
        // that would double-activate.
        if let Err(e) = self.ledger.record_payment(entry).await {
            tracing::warn!(
                user_id = %metadata.user_id,
                session_id = %data.session_id,
                error = %e,
                "Payment recording failed after activation"
            );
        }

        tracing::info!(
            user_id = %metadata.user_id,
            plan = %plan,
            session_id = %data.session_id,
            "Checkout completion processed"
        );
        Ok(())
    }

    async fn handle_subscription_update(&self, data: SubscriptionEventData) -> BillingResult<()> {
        let Some(user_id) = data.user_id.as_deref() else {
            tracing::warn!(
                subscription_id = %data.subscription_id,
                "Subscription event without user id; skipped"
            );
            return Ok(());
        };

        let status = data.status.as_deref().and_then(SubscriptionStatus::parse);
        let plan = data.plan.as_deref().and_then(SubscriptionPlan::parse);
        self.subscriptions
            .sync_remote_status(user_id, status, plan)
            .await
    }

    async fn handle_subscription_deleted(&self, data: SubscriptionEventData) -> BillingResult<()> {
        let Some(user_id) = data.user_id.as_deref() else {
            tracing::warn!(
                subscription_id = %data.subscription_id,
                "Subscription deletion without user id; skipped"
            );
            return Ok(());
        };

        self.subscriptions.cancel_subscription(user_id).await
    }
}
