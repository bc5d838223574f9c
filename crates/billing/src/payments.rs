//! Payment ledger
//!
//! One immutable ledger entry per completed charge, plus a
//! best-effort lifetime-spend rollup on the user record. The ledger
//! collection is the source of truth; the rollup is a convenience for
//! dashboards and may be skipped when the user record is missing.

use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use eventos_shared::{
    collections, get_typed, set_typed, DocumentStore, Payment, PaymentKind, PaymentStatus,
    UserDocument,
};

use crate::error::{BillingError, BillingResult};

/// A ledger entry before id and timestamps are assigned
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub user_id: String,
    pub kind: PaymentKind,
    pub payment_intent_id: String,
    pub invoice_id: Option<String>,
    pub event_id: Option<String>,
    pub amount_centavos: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub description: String,
    pub receipt_url: Option<String>,
}

#[derive(Clone)]
pub struct PaymentLedger {
    store: Arc<dyn DocumentStore>,
}

impl PaymentLedger {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Append a ledger entry and update the user's spend rollup.
    ///
    /// The entry is written first; if the user record is missing the
    /// rollup is skipped with a warning rather than failing the
    /// recording.
    pub async fn record_payment(&self, entry: NewPayment) -> BillingResult<Payment> {
        if entry.amount_centavos < 0 {
            return Err(BillingError::InvalidAmount(entry.amount_centavos));
        }

        let now = OffsetDateTime::now_utc();
        let id = format!("payment_{}", Uuid::new_v4().simple());

        let payment = Payment {
            id: id.clone(),
            user_id: entry.user_id.clone(),
            kind: entry.kind,
            payment_intent_id: entry.payment_intent_id,
            invoice_id: entry.invoice_id,
            event_id: entry.event_id,
            amount_centavos: entry.amount_centavos,
            currency: entry.currency,
            status: entry.status,
            description: entry.description,
            receipt_url: entry.receipt_url,
            created_at: now,
            updated_at: now,
        };

        set_typed(self.store.as_ref(), collections::PAYMENTS, &id, &payment).await?;
        tracing::info!(
            payment_id = %id,
            user_id = %payment.user_id,
            amount_centavos = payment.amount_centavos,
            "Payment recorded"
        );

        self.update_user_rollup(&payment.user_id, payment.amount_centavos, now)
            .await;

        Ok(payment)
    }

    async fn update_user_rollup(&self, user_id: &str, amount_centavos: i64, now: OffsetDateTime) {
        let mut user =
            match get_typed::<UserDocument>(self.store.as_ref(), collections::USERS, user_id).await
            {
                Ok(Some(user)) => user,
                Ok(None) => {
                    tracing::warn!(
                        user_id = %user_id,
                        "User record missing; spend rollup skipped (ledger entry kept)"
                    );
                    return;
                }
                Err(e) => {
                    tracing::warn!(user_id = %user_id, error = %e, "Spend rollup read failed");
                    return;
                }
            };

        user.payment_history.total_spent_centavos += amount_centavos;
        user.payment_history.last_payment_date = Some(now);
        user.payment_history.last_payment_amount_centavos = Some(amount_centavos);
        user.updated_at = now;

        if let Err(e) = set_typed(self.store.as_ref(), collections::USERS, user_id, &user).await {
            tracing::warn!(user_id = %user_id, error = %e, "Spend rollup write failed");
        }
    }

    /// Transition a payment's status.
    ///
    /// Any status may transition to any other; no legality table is
    /// enforced (see DESIGN.md).
    pub async fn update_payment_status(
        &self,
        payment_id: &str,
        status: PaymentStatus,
    ) -> BillingResult<()> {
        let mut payment =
            get_typed::<Payment>(self.store.as_ref(), collections::PAYMENTS, payment_id)
                .await?
                .ok_or_else(|| BillingError::PaymentNotFound(payment_id.to_string()))?;

        payment.status = status;
        payment.updated_at = OffsetDateTime::now_utc();
        set_typed(self.store.as_ref(), collections::PAYMENTS, payment_id, &payment).await?;

        tracing::info!(payment_id = %payment_id, status = ?status, "Payment status updated");
        Ok(())
    }

    pub async fn get_payment(&self, payment_id: &str) -> BillingResult<Option<Payment>> {
        Ok(get_typed(self.store.as_ref(), collections::PAYMENTS, payment_id).await?)
    }
}
