//! Care-services scheduling core: appointment booking with conflict
//! exclusion per worker, advisory weekly availability, and invoice
//! derivation. Storage is an external collaborator behind [`store::Store`];
//! everything here is request-response with no background loops.

pub mod context;
pub mod engine;
pub mod model;
pub mod observability;
pub mod store;

pub use context::RequestContext;
pub use engine::{advisory_availability, ScheduleError, Scheduled, Scheduler};
pub use store::{MemoryStore, Store, StoreError};
