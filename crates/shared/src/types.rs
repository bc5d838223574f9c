//! Persisted record layouts
//!
//! The document shapes stored in `users/{email}` and
//! `payments/{paymentId}`. Field names on the wire are camelCase to
//! match the existing document layout.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::plans::SubscriptionPlan;

/// Subscription lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Inactive,
    Active,
    GracePeriod,
    Cancelled,
    PastDue,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Inactive => "inactive",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::GracePeriod => "grace_period",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::PastDue => "past_due",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "inactive" => Some(SubscriptionStatus::Inactive),
            "active" => Some(SubscriptionStatus::Active),
            "grace_period" => Some(SubscriptionStatus::GracePeriod),
            "cancelled" => Some(SubscriptionStatus::Cancelled),
            "past_due" => Some(SubscriptionStatus::PastDue),
            _ => None,
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-user subscription state, embedded in the user document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub plan: SubscriptionPlan,
    pub status: SubscriptionStatus,

    /// Opaque billing references from the payment provider
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,

    pub start_date: Option<OffsetDateTime>,
    pub end_date: Option<OffsetDateTime>,
    pub renewal_date: Option<OffsetDateTime>,
    pub cancelled_at: Option<OffsetDateTime>,
    pub grace_period_end: Option<OffsetDateTime>,

    pub events_created_this_month: u32,
    pub highlights_used_this_month: u32,
    pub recurring_series_count: u32,
    pub last_event_count_reset: OffsetDateTime,
}

impl Subscription {
    /// Initial state for a freshly created user record
    pub fn visitor(now: OffsetDateTime) -> Self {
        Self {
            plan: SubscriptionPlan::Visitor,
            status: SubscriptionStatus::Inactive,
            customer_id: None,
            subscription_id: None,
            start_date: None,
            end_date: None,
            renewal_date: None,
            cancelled_at: None,
            grace_period_end: None,
            events_created_this_month: 0,
            highlights_used_this_month: 0,
            recurring_series_count: 0,
            last_event_count_reset: now,
        }
    }
}

/// Payment kind: one-off event purchase or recurring subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    PerEvent,
    Subscription,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
    Refunded,
}

/// Append-only ledger entry, one per completed charge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: PaymentKind,

    pub payment_intent_id: String,
    pub invoice_id: Option<String>,

    /// Associated event, when `kind` is per-event
    pub event_id: Option<String>,

    pub amount_centavos: i64,
    pub currency: String,
    pub status: PaymentStatus,

    pub description: String,
    pub receipt_url: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Lifetime-spend rollup on the user record.
///
/// Best-effort: the `payments` collection is the source of truth.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentHistory {
    pub total_spent_centavos: i64,
    pub last_payment_date: Option<OffsetDateTime>,
    pub last_payment_amount_centavos: Option<i64>,
}

/// User document at `users/{email}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDocument {
    pub email: String,
    pub display_name: String,
    pub photo_url: Option<String>,
    pub subscription: Option<Subscription>,
    #[serde(default)]
    pub payment_history: PaymentHistory,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl UserDocument {
    pub fn new(email: &str, display_name: &str, now: OffsetDateTime) -> Self {
        Self {
            email: email.to_string(),
            display_name: display_name.to_string(),
            photo_url: None,
            subscription: Some(Subscription::visitor(now)),
            payment_history: PaymentHistory::default(),
            created_at: now,
            updated_at: now,
        }
    }
}
