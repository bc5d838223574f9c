//! Entitlement evaluation
//!
//! Answers "can this user do X right now?" for every gated capability,
//! from a subscription value passed in. Every function here is pure:
//! no I/O, no mutation, never an error. Decisions carry a localized
//! reason and a suggested remediation so the UI can render them
//! directly, and the functions are safe to call on every render.

use serde::{Deserialize, Serialize};

use eventos_shared::{ExportTier, Subscription, SubscriptionPlan, SubscriptionStatus, SupportTier};

/// What the user should do about a denied action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationAction {
    PayPerEvent,
    UpgradeSubscription,
}

/// Outcome of an entitlement check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitlementDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<RemediationAction>,
}

impl EntitlementDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            action: None,
        }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            action: None,
        }
    }

    fn deny_with(reason: impl Into<String>, action: RemediationAction) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            action: Some(action),
        }
    }
}

/// Can the user create a new event?
///
/// Rule order matters: the per-event plan is checked before the
/// status check. Per-event users pay at checkout for each event, so a
/// stale status from an earlier one-off payment must not lock them
/// out. Grace-period subscribers are denied here (status must be
/// Active); see DESIGN.md for the open product question on that.
pub fn can_create_event(subscription: Option<&Subscription>) -> EntitlementDecision {
    let sub = match subscription {
        // Users without a subscription record are treated as visitors
        None => {
            return EntitlementDecision::deny_with(
                "Plano gratuito não permite criar eventos",
                RemediationAction::PayPerEvent,
            )
        }
        Some(sub) => sub,
    };

    if sub.plan == SubscriptionPlan::Visitor {
        return EntitlementDecision::deny_with(
            "Plano gratuito não permite criar eventos",
            RemediationAction::PayPerEvent,
        );
    }

    if sub.plan == SubscriptionPlan::PerEvent {
        return EntitlementDecision::allow();
    }

    if sub.status != SubscriptionStatus::Active {
        return EntitlementDecision::deny_with(
            "Assinatura inativa ou vencida. Renove para continuar criando eventos.",
            RemediationAction::UpgradeSubscription,
        );
    }

    if let Some(limit) = sub.plan.limits().events_per_month {
        if sub.events_created_this_month >= limit {
            return EntitlementDecision::deny_with(
                format!(
                    "Limite de {limit} eventos/mês atingido. Faça upgrade para criar mais eventos."
                ),
                RemediationAction::UpgradeSubscription,
            );
        }
    }

    EntitlementDecision::allow()
}

/// Can the user highlight an event?
pub fn can_highlight_event(subscription: Option<&Subscription>) -> EntitlementDecision {
    let sub = match subscription {
        None => return EntitlementDecision::deny("Seu plano não inclui destaques"),
        Some(sub) => sub,
    };

    match sub.plan.limits().highlights_per_month {
        Some(0) => EntitlementDecision::deny(
            "Seu plano não inclui destaques. Faça upgrade para o plano Mensal ou Anual.",
        ),
        Some(limit) if sub.highlights_used_this_month >= limit => EntitlementDecision::deny(
            format!(
                "Limite de {limit} destaques/mês atingido. \
                 Faça upgrade para o plano Anual para destaques ilimitados."
            ),
        ),
        _ => EntitlementDecision::allow(),
    }
}

/// Can the user start a new recurring event series?
pub fn can_create_recurring_event(subscription: Option<&Subscription>) -> EntitlementDecision {
    let sub = match subscription {
        None => return EntitlementDecision::deny("Seu plano não inclui eventos recorrentes"),
        Some(sub) => sub,
    };

    match sub.plan.limits().recurring_series {
        Some(0) => EntitlementDecision::deny(
            "Seu plano não inclui eventos recorrentes. \
             Faça upgrade para o plano Mensal ou Anual.",
        ),
        Some(limit) if sub.recurring_series_count >= limit => EntitlementDecision::deny(
            format!(
                "Limite de {limit} séries recorrentes atingido. \
                 Faça upgrade para o plano Anual para séries ilimitadas."
            ),
        ),
        _ => EntitlementDecision::allow(),
    }
}

pub fn can_access_analytics(subscription: Option<&Subscription>) -> bool {
    subscription.map(|s| s.plan.limits().analytics).unwrap_or(false)
}

pub fn can_customize_branding(subscription: Option<&Subscription>) -> bool {
    subscription.map(|s| s.plan.limits().branding).unwrap_or(false)
}

pub fn export_tier(subscription: Option<&Subscription>) -> ExportTier {
    subscription
        .map(|s| s.plan.limits().export)
        .unwrap_or(ExportTier::None)
}

pub fn support_tier(subscription: Option<&Subscription>) -> SupportTier {
    subscription
        .map(|s| s.plan.limits().support)
        .unwrap_or(SupportTier::Standard)
}

/// Any paid plan counts as premium
pub fn is_premium(subscription: Option<&Subscription>) -> bool {
    subscription
        .map(|s| s.plan != SubscriptionPlan::Visitor)
        .unwrap_or(false)
}

/// Usage counters against the plan's limits, for UI indicators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub events_used: u32,
    pub events_limit: Option<u32>,
    pub events_remaining: Option<u32>,
    pub highlights_used: u32,
    pub highlights_limit: Option<u32>,
    pub highlights_remaining: Option<u32>,
}

/// Snapshot of usage against limits. `None` on a limit or remaining
/// field means unbounded; a missing subscription reports all zeros.
pub fn usage_summary(subscription: Option<&Subscription>) -> UsageSummary {
    let sub = match subscription {
        None => {
            return UsageSummary {
                events_used: 0,
                events_limit: Some(0),
                events_remaining: Some(0),
                highlights_used: 0,
                highlights_limit: Some(0),
                highlights_remaining: Some(0),
            }
        }
        Some(sub) => sub,
    };

    let limits = sub.plan.limits();
    UsageSummary {
        events_used: sub.events_created_this_month,
        events_limit: limits.events_per_month,
        events_remaining: limits
            .events_per_month
            .map(|limit| limit.saturating_sub(sub.events_created_this_month)),
        highlights_used: sub.highlights_used_this_month,
        highlights_limit: limits.highlights_per_month,
        highlights_remaining: limits
            .highlights_per_month
            .map(|limit| limit.saturating_sub(sub.highlights_used_this_month)),
    }
}
