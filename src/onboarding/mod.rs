//! Onboarding checklists: role-scoped task catalog, per-user progress ledger,
//! completion rollups and the session-scoped checklist order.

pub mod aggregator;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod memory;
pub mod ordering;
pub mod pg_store;
pub mod schema;
pub mod service;
pub mod store;
pub mod types;
pub mod visibility;

pub use error::{OnboardingError, OnboardingResult};
pub use handlers::onboarding_routes;
pub use memory::MemoryStore;
pub use ordering::{ChecklistSession, OrderingError};
pub use pg_store::PgStore;
pub use service::OnboardingService;
pub use store::OnboardingStore;
pub use types::*;
