use ulid::Ulid;

use crate::store::StoreError;

#[derive(Debug, Clone)]
pub enum ScheduleError {
    /// Caller-fixable input problem; never retried automatically.
    Validation(&'static str),
    /// The worker already has an overlapping non-cancelled appointment.
    /// `existing` names the blocking appointment when the detector found it;
    /// it is `None` when the store's exclusion constraint fired first.
    SchedulingConflict { existing: Option<Ulid> },
    /// Deletion blocked by a referencing record.
    HasDependents(Ulid),
    /// An invoice already exists for this appointment.
    DuplicateInvoice(Ulid),
    NotFound(Ulid),
    /// The actor's role does not permit the operation.
    Forbidden(&'static str),
    /// Network/timeout/contention; safe to retry with backoff.
    Transient(String),
}

impl ScheduleError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScheduleError::Transient(_))
    }
}

impl std::fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleError::Validation(msg) => write!(f, "validation failed: {msg}"),
            ScheduleError::SchedulingConflict { existing: Some(id) } => {
                write!(f, "scheduling conflict with appointment {id}")
            }
            ScheduleError::SchedulingConflict { existing: None } => {
                write!(f, "scheduling conflict: slot already taken")
            }
            ScheduleError::HasDependents(id) => {
                write!(f, "cannot delete {id}: referenced by other records")
            }
            ScheduleError::DuplicateInvoice(id) => {
                write!(f, "appointment {id} already has an invoice")
            }
            ScheduleError::NotFound(id) => write!(f, "not found: {id}"),
            ScheduleError::Forbidden(what) => write!(f, "forbidden: {what}"),
            ScheduleError::Transient(e) => write!(f, "transient failure: {e}"),
        }
    }
}

impl std::error::Error for ScheduleError {}

/// Default store-error mapping. Call sites that can hit a specific
/// constraint (interval exclusion, invoice uniqueness) map
/// `ConstraintViolation` themselves before falling back to this.
impl From<StoreError> for ScheduleError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => ScheduleError::NotFound(id),
            StoreError::Transient(msg) => ScheduleError::Transient(msg),
            StoreError::ConstraintViolation(msg) => ScheduleError::Validation(msg),
        }
    }
}
