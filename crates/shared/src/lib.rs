//! Eventos Locais shared types
//!
//! Domain types used across the api, billing, and worker crates:
//! the plan catalog, subscription and payment records, the user
//! document layout, and the document-store boundary.

pub mod plans;
pub mod store;
pub mod types;

pub use plans::{ExportTier, PlanLimits, SubscriptionPlan, SupportTier};
pub use store::{collections, get_typed, set_typed, DocumentStore, MemoryStore, StoreError, StoreResult};
pub use types::{
    Payment, PaymentHistory, PaymentKind, PaymentStatus, Subscription, SubscriptionStatus,
    UserDocument,
};
