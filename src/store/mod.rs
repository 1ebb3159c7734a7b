//! Entity store gateway. The scheduling core talks to persistence only
//! through the [`Store`] trait; a relational backend implements it with
//! queries plus the two write-time constraints (appointment interval
//! exclusion per worker, one invoice per appointment). [`MemoryStore`]
//! is the in-process reference implementation.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use ulid::Ulid;

use crate::model::*;

#[derive(Debug, Clone)]
pub enum StoreError {
    NotFound(Ulid),
    /// A write-time constraint rejected the record (interval exclusion,
    /// invoice uniqueness, duplicate id). The message names the constraint.
    ConstraintViolation(&'static str),
    /// Network/timeout/lock contention. Safe to retry with backoff; never
    /// to be interpreted as "operation succeeded" or "no rows".
    Transient(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "not found: {id}"),
            StoreError::ConstraintViolation(c) => write!(f, "constraint violated: {c}"),
            StoreError::Transient(e) => write!(f, "transient store failure: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

// ── Filters and paging ───────────────────────────────────────────

/// Exact-match and range filter over appointments. Unset fields match all.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppointmentFilter {
    pub worker_id: Option<Ulid>,
    pub client_id: Option<Ulid>,
    pub service_id: Option<Ulid>,
    pub status: Option<AppointmentStatus>,
    /// Inclusive range on the start timestamp.
    pub starts_from: Option<chrono::DateTime<chrono::Utc>>,
    pub starts_until: Option<chrono::DateTime<chrono::Utc>>,
    /// Skip this appointment id (self-exclusion on update checks).
    pub exclude: Option<Ulid>,
}

impl AppointmentFilter {
    pub fn for_worker(worker_id: Ulid) -> Self {
        Self {
            worker_id: Some(worker_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, a: &Appointment) -> bool {
        self.worker_id.is_none_or(|id| a.worker_id == id)
            && self.client_id.is_none_or(|id| a.client_id == id)
            && self.service_id.is_none_or(|id| a.service_id == id)
            && self.status.is_none_or(|s| a.status == s)
            && self.starts_from.is_none_or(|t| a.slot.start >= t)
            && self.starts_until.is_none_or(|t| a.slot.start <= t)
            && self.exclude.is_none_or(|id| a.id != id)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InvoiceFilter {
    pub client_id: Option<Ulid>,
    pub status: Option<InvoiceStatus>,
}

impl InvoiceFilter {
    pub fn matches(&self, i: &Invoice) -> bool {
        self.client_id.is_none_or(|id| i.client_id == id)
            && self.status.is_none_or(|s| i.status == s)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub limit: Option<usize>,
    pub offset: usize,
}

impl Page {
    pub fn all() -> Self {
        Self {
            limit: None,
            offset: 0,
        }
    }

    pub fn first(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            offset: 0,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Order {
    #[default]
    StartAsc,
    StartDesc,
}

// ── Gateway trait ────────────────────────────────────────────────

/// Typed CRUD + filtered queries for the five record kinds. Every method
/// either succeeds or fails with a typed [`StoreError`]; implementations
/// must never report a failed query as an empty result.
#[async_trait]
pub trait Store: Send + Sync {
    // workers
    async fn insert_worker(&self, worker: &Worker) -> Result<(), StoreError>;
    async fn worker(&self, id: Ulid) -> Result<Option<Worker>, StoreError>;
    async fn update_worker(&self, worker: &Worker) -> Result<(), StoreError>;
    async fn delete_worker(&self, id: Ulid) -> Result<(), StoreError>;
    /// Ordered by name; optional case-insensitive substring match.
    async fn workers(&self, name_contains: Option<&str>) -> Result<Vec<Worker>, StoreError>;
    async fn worker_by_email(&self, email: &str) -> Result<Option<Worker>, StoreError>;

    // clients
    async fn insert_client(&self, client: &Client) -> Result<(), StoreError>;
    async fn client(&self, id: Ulid) -> Result<Option<Client>, StoreError>;
    async fn update_client(&self, client: &Client) -> Result<(), StoreError>;
    async fn delete_client(&self, id: Ulid) -> Result<(), StoreError>;
    async fn clients(&self, name_contains: Option<&str>) -> Result<Vec<Client>, StoreError>;

    // services
    async fn insert_service(&self, service: &Service) -> Result<(), StoreError>;
    async fn service(&self, id: Ulid) -> Result<Option<Service>, StoreError>;
    async fn update_service(&self, service: &Service) -> Result<(), StoreError>;
    async fn delete_service(&self, id: Ulid) -> Result<(), StoreError>;
    async fn services(&self, active_only: bool) -> Result<Vec<Service>, StoreError>;

    // appointments
    /// Insert; rejects an interval-exclusion violation with
    /// `ConstraintViolation` (the write-time backstop for concurrent booking).
    async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), StoreError>;
    async fn appointment(&self, id: Ulid) -> Result<Option<Appointment>, StoreError>;
    /// Update; re-checks the exclusion constraint against all other rows.
    async fn update_appointment(&self, appointment: &Appointment) -> Result<(), StoreError>;
    async fn delete_appointment(&self, id: Ulid) -> Result<(), StoreError>;
    async fn appointments(
        &self,
        filter: &AppointmentFilter,
        page: Page,
        order: Order,
    ) -> Result<Vec<Appointment>, StoreError>;

    // invoices
    /// Insert; rejects a second invoice for the same appointment.
    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), StoreError>;
    async fn invoice(&self, id: Ulid) -> Result<Option<Invoice>, StoreError>;
    async fn update_invoice(&self, invoice: &Invoice) -> Result<(), StoreError>;
    async fn delete_invoice(&self, id: Ulid) -> Result<(), StoreError>;
    async fn invoices(&self, filter: &InvoiceFilter, page: Page) -> Result<Vec<Invoice>, StoreError>;
    async fn invoice_for_appointment(
        &self,
        appointment_id: Ulid,
    ) -> Result<Option<Invoice>, StoreError>;
}
