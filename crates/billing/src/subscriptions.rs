//! Subscription state management
//!
//! The only component that mutates the subscription embedded in a
//! user document. Every operation is a single read-then-write against
//! one document: no retries, no cross-document transactions, and
//! nothing is left partially applied beyond what a single document
//! write guarantees.

use std::sync::Arc;

use time::{Duration, OffsetDateTime};

use eventos_shared::{
    collections, get_typed, set_typed, DocumentStore, Subscription, SubscriptionPlan,
    SubscriptionStatus, UserDocument,
};

use crate::entitlement;
use crate::error::{BillingError, BillingResult};

/// Length of the post-cancellation grace window
pub const GRACE_PERIOD: Duration = Duration::days(7);

/// Parameters for activating a subscription after payment
#[derive(Debug, Clone)]
pub struct ActivateSubscription {
    pub user_id: String,
    pub plan: SubscriptionPlan,
    pub status: SubscriptionStatus,
    pub subscription_id: Option<String>,
    pub customer_id: Option<String>,
}

/// Subscription service over the user document store
#[derive(Clone)]
pub struct SubscriptionService {
    store: Arc<dyn DocumentStore>,
}

impl SubscriptionService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    async fn load_user(&self, user_id: &str) -> BillingResult<UserDocument> {
        get_typed::<UserDocument>(self.store.as_ref(), collections::USERS, user_id)
            .await?
            .ok_or_else(|| BillingError::UserNotFound(user_id.to_string()))
    }

    async fn save_user(&self, user: &mut UserDocument) -> BillingResult<()> {
        user.updated_at = OffsetDateTime::now_utc();
        set_typed(self.store.as_ref(), collections::USERS, &user.email, user).await?;
        Ok(())
    }

    /// Current subscription state for a user
    pub async fn get_subscription(&self, user_id: &str) -> BillingResult<Option<Subscription>> {
        Ok(self.load_user(user_id).await?.subscription)
    }

    /// Activate a plan after a completed checkout.
    ///
    /// Sets the validity window from the plan (visitor keeps whatever
    /// was there) and resets the monthly event counter, so a fresh
    /// activation always starts with a clean quota.
    pub async fn activate_subscription(
        &self,
        params: ActivateSubscription,
    ) -> BillingResult<Subscription> {
        let mut user = self.load_user(&params.user_id).await?;
        let now = OffsetDateTime::now_utc();

        let sub = user
            .subscription
            .get_or_insert_with(|| Subscription::visitor(now));

        sub.plan = params.plan;
        sub.status = params.status;
        sub.start_date = Some(now);
        if let Some(validity) = params.plan.validity() {
            let end = now + validity;
            sub.end_date = Some(end);
            sub.renewal_date = Some(end);
        }
        if params.subscription_id.is_some() {
            sub.subscription_id = params.subscription_id.clone();
        }
        if params.customer_id.is_some() {
            sub.customer_id = params.customer_id.clone();
        }
        sub.events_created_this_month = 0;
        sub.last_event_count_reset = now;

        let activated = sub.clone();
        self.save_user(&mut user).await?;

        tracing::info!(
            user_id = %params.user_id,
            plan = %params.plan,
            status = %params.status,
            "Subscription activated"
        );
        Ok(activated)
    }

    /// Increment the monthly event counter.
    ///
    /// Re-validates the create-event entitlement against the stored
    /// subscription before writing, so a caller that skipped (or
    /// raced past) the entitlement check gets a `LimitExceeded` error
    /// instead of a counter above the plan limit.
    pub async fn increment_event_count(&self, user_id: &str) -> BillingResult<u32> {
        let mut user = self.load_user(user_id).await?;

        let decision = entitlement::can_create_event(user.subscription.as_ref());
        if !decision.allowed {
            return Err(BillingError::LimitExceeded(
                decision
                    .reason
                    .unwrap_or_else(|| "limite atingido".to_string()),
            ));
        }

        let sub = user
            .subscription
            .as_mut()
            .ok_or_else(|| BillingError::UserNotFound(user_id.to_string()))?;
        sub.events_created_this_month += 1;
        let count = sub.events_created_this_month;

        self.save_user(&mut user).await?;
        tracing::info!(user_id = %user_id, count = count, "Event counter incremented");
        Ok(count)
    }

    /// Increment the monthly highlight counter, re-validating the
    /// highlight entitlement first.
    pub async fn increment_highlight_count(&self, user_id: &str) -> BillingResult<u32> {
        let mut user = self.load_user(user_id).await?;

        let decision = entitlement::can_highlight_event(user.subscription.as_ref());
        if !decision.allowed {
            return Err(BillingError::LimitExceeded(
                decision
                    .reason
                    .unwrap_or_else(|| "limite atingido".to_string()),
            ));
        }

        let sub = user
            .subscription
            .as_mut()
            .ok_or_else(|| BillingError::UserNotFound(user_id.to_string()))?;
        sub.highlights_used_this_month += 1;
        let count = sub.highlights_used_this_month;

        self.save_user(&mut user).await?;
        tracing::info!(user_id = %user_id, count = count, "Highlight counter incremented");
        Ok(count)
    }

    /// Move the subscription into its grace period.
    ///
    /// Access is not revoked here; the grace window ends exactly
    /// seven days after the cancellation request. The transition from
    /// GracePeriod to Cancelled is driven externally when the billing
    /// provider confirms termination.
    pub async fn cancel_subscription(&self, user_id: &str) -> BillingResult<()> {
        let mut user = self.load_user(user_id).await?;
        let now = OffsetDateTime::now_utc();
        let grace_period_end = now + GRACE_PERIOD;

        let sub = user
            .subscription
            .get_or_insert_with(|| Subscription::visitor(now));
        sub.status = SubscriptionStatus::GracePeriod;
        sub.cancelled_at = Some(now);
        sub.grace_period_end = Some(grace_period_end);

        self.save_user(&mut user).await?;
        tracing::info!(
            user_id = %user_id,
            grace_period_end = %grace_period_end,
            "Subscription cancelled (grace period)"
        );
        Ok(())
    }

    /// Undo a cancellation while still inside the grace window
    pub async fn reactivate_subscription(&self, user_id: &str) -> BillingResult<()> {
        let mut user = self.load_user(user_id).await?;
        let now = OffsetDateTime::now_utc();

        let sub = user
            .subscription
            .get_or_insert_with(|| Subscription::visitor(now));
        sub.status = SubscriptionStatus::Active;
        sub.cancelled_at = None;
        sub.grace_period_end = None;

        self.save_user(&mut user).await?;
        tracing::info!(user_id = %user_id, "Subscription reactivated");
        Ok(())
    }

    /// Zero the monthly usage counters.
    ///
    /// Invoked once per user per calendar month by the worker; this
    /// service owns no scheduling.
    pub async fn reset_monthly_counters(&self, user_id: &str) -> BillingResult<()> {
        let mut user = self.load_user(user_id).await?;
        let now = OffsetDateTime::now_utc();

        let sub = user
            .subscription
            .get_or_insert_with(|| Subscription::visitor(now));
        sub.events_created_this_month = 0;
        sub.highlights_used_this_month = 0;
        sub.last_event_count_reset = now;

        self.save_user(&mut user).await?;
        tracing::info!(user_id = %user_id, "Monthly counters reset");
        Ok(())
    }

    /// Re-sync status and plan from a provider-side subscription
    /// update event.
    pub async fn sync_remote_status(
        &self,
        user_id: &str,
        status: Option<SubscriptionStatus>,
        plan: Option<SubscriptionPlan>,
    ) -> BillingResult<()> {
        if status.is_none() && plan.is_none() {
            return Ok(());
        }

        let mut user = self.load_user(user_id).await?;
        let now = OffsetDateTime::now_utc();

        let sub = user
            .subscription
            .get_or_insert_with(|| Subscription::visitor(now));
        if let Some(status) = status {
            sub.status = status;
        }
        if let Some(plan) = plan {
            sub.plan = plan;
        }

        self.save_user(&mut user).await?;
        tracing::info!(
            user_id = %user_id,
            status = ?status,
            plan = ?plan,
            "Subscription synced from provider event"
        );
        Ok(())
    }
}
