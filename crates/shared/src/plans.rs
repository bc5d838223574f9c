//! Plan catalog
//!
//! Static table of subscription plans, prices, and per-plan limits.
//! The limits never change at runtime; there is exactly one record per
//! plan identifier.

use serde::{Deserialize, Serialize};
use time::Duration;

/// Subscription plan identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPlan {
    /// Free tier: browse and attend only, no event creation
    Visitor,
    /// Pay per published event, no monthly commitment
    PerEvent,
    /// Monthly organizer subscription
    Monthly,
    /// Annual organizer subscription
    Annual,
}

impl SubscriptionPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Visitor => "visitor",
            SubscriptionPlan::PerEvent => "per_event",
            SubscriptionPlan::Monthly => "monthly",
            SubscriptionPlan::Annual => "annual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "visitor" => Some(SubscriptionPlan::Visitor),
            "per_event" => Some(SubscriptionPlan::PerEvent),
            "monthly" => Some(SubscriptionPlan::Monthly),
            "annual" => Some(SubscriptionPlan::Annual),
            _ => None,
        }
    }

    /// Uppercase code used on checkout requests and webhook payloads
    /// (`PER_EVENT`, `MONTHLY`, `ANNUAL`). The visitor plan is never
    /// purchasable and has no code.
    pub fn checkout_code(&self) -> Option<&'static str> {
        match self {
            SubscriptionPlan::Visitor => None,
            SubscriptionPlan::PerEvent => Some("PER_EVENT"),
            SubscriptionPlan::Monthly => Some("MONTHLY"),
            SubscriptionPlan::Annual => Some("ANNUAL"),
        }
    }

    pub fn from_checkout_code(code: &str) -> Option<Self> {
        match code {
            "PER_EVENT" => Some(SubscriptionPlan::PerEvent),
            "MONTHLY" => Some(SubscriptionPlan::Monthly),
            "ANNUAL" => Some(SubscriptionPlan::Annual),
            _ => None,
        }
    }

    /// Localized display name shown to users
    pub fn display_name(&self) -> &'static str {
        match self {
            SubscriptionPlan::Visitor => "Visitante",
            SubscriptionPlan::PerEvent => "Por Evento",
            SubscriptionPlan::Monthly => "Mensal",
            SubscriptionPlan::Annual => "Anual",
        }
    }

    /// Price in centavos (BRL)
    pub fn price_centavos(&self) -> i64 {
        match self {
            SubscriptionPlan::Visitor => 0,
            SubscriptionPlan::PerEvent => 2_990,
            SubscriptionPlan::Monthly => 19_990,
            SubscriptionPlan::Annual => 199_900,
        }
    }

    /// Nominal validity window granted on activation.
    ///
    /// Per-event purchases get a 30-day window for bookkeeping only;
    /// each event is separately gated at checkout. Visitor has none.
    pub fn validity(&self) -> Option<Duration> {
        match self {
            SubscriptionPlan::Visitor => None,
            SubscriptionPlan::PerEvent => Some(Duration::days(30)),
            SubscriptionPlan::Monthly => Some(Duration::days(30)),
            SubscriptionPlan::Annual => Some(Duration::days(365)),
        }
    }

    pub fn limits(&self) -> &'static PlanLimits {
        match self {
            SubscriptionPlan::Visitor => &VISITOR_LIMITS,
            SubscriptionPlan::PerEvent => &PER_EVENT_LIMITS,
            SubscriptionPlan::Monthly => &MONTHLY_LIMITS,
            SubscriptionPlan::Annual => &ANNUAL_LIMITS,
        }
    }
}

impl std::fmt::Display for SubscriptionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Export capability granted by a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportTier {
    None,
    Basic,
    Advanced,
}

/// Support level granted by a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportTier {
    Standard,
    Priority,
    Vip,
}

/// Per-plan usage limits and feature flags
///
/// `None` on a counter limit means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub events_per_month: Option<u32>,
    pub highlights_per_month: Option<u32>,
    pub recurring_series: Option<u32>,
    pub analytics: bool,
    pub branding: bool,
    pub export: ExportTier,
    pub support: SupportTier,
}

const VISITOR_LIMITS: PlanLimits = PlanLimits {
    events_per_month: Some(0),
    highlights_per_month: Some(0),
    recurring_series: Some(0),
    analytics: false,
    branding: false,
    export: ExportTier::None,
    support: SupportTier::Standard,
};

// Pays per event, so no monthly event cap applies.
const PER_EVENT_LIMITS: PlanLimits = PlanLimits {
    events_per_month: None,
    highlights_per_month: Some(0),
    recurring_series: Some(0),
    analytics: false,
    branding: false,
    export: ExportTier::None,
    support: SupportTier::Standard,
};

const MONTHLY_LIMITS: PlanLimits = PlanLimits {
    events_per_month: Some(8),
    highlights_per_month: Some(2),
    recurring_series: Some(2),
    analytics: true,
    branding: false,
    export: ExportTier::Basic,
    support: SupportTier::Priority,
};

const ANNUAL_LIMITS: PlanLimits = PlanLimits {
    events_per_month: Some(8),
    highlights_per_month: None,
    recurring_series: None,
    analytics: true,
    branding: true,
    export: ExportTier::Advanced,
    support: SupportTier::Vip,
};
