//! Billing error taxonomy

use eventos_shared::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("payment not found: {0}")]
    PaymentNotFound(String),

    #[error("checkout session not found: {0}")]
    SessionNotFound(String),

    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    #[error("invalid payment amount: {0}")]
    InvalidAmount(i64),

    #[error("webhook signature invalid")]
    WebhookSignatureInvalid,

    #[error("malformed webhook payload: {0}")]
    WebhookPayloadInvalid(String),

    #[error("webhook event has no resolvable user id")]
    WebhookUserUnresolvable,

    #[error("usage limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("payment provider error: {0}")]
    Provider(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type BillingResult<T> = Result<T, BillingError>;
