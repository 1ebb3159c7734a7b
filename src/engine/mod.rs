mod accounts;
mod appointments;
mod availability;
mod conflict;
mod directory;
mod error;
mod invoices;
mod queries;

pub use availability::advisory_availability;
pub use error::ScheduleError;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use ulid::Ulid;

use crate::model::Appointment;
use crate::store::{Store, StoreError};

/// Default bound on any single gateway call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of booking or rescheduling an appointment.
#[derive(Debug, Clone)]
pub struct Scheduled {
    pub appointment: Appointment,
    /// Advisory availability verdict for the booked start: `Some(false)`
    /// means the worker has not declared that day/slot available and the
    /// caller should surface a warning; `None` means the start falls outside
    /// both half-day slots (no opinion). Never blocks the booking.
    pub advisory: Option<bool>,
}

impl Scheduled {
    pub fn outside_declared_availability(&self) -> bool {
        self.advisory == Some(false)
    }
}

/// The scheduling core. Stateless across requests apart from the per-worker
/// lock registry that serializes check-then-write sequences.
pub struct Scheduler {
    store: Arc<dyn Store>,
    /// One mutex per worker, created lazily. Holding it across the conflict
    /// check and the write closes the in-process TOCTOU window; the store's
    /// exclusion constraint backstops multi-process deployments.
    worker_locks: DashMap<Ulid, Arc<Mutex<()>>>,
    store_timeout: Duration,
}

impl Scheduler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            worker_locks: DashMap::new(),
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub(super) fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub(super) fn worker_lock(&self, worker_id: Ulid) -> Arc<Mutex<()>> {
        self.worker_locks
            .entry(worker_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run a gateway call under the configured timeout. A timed-out call
    /// surfaces as a transient failure — never as an empty result.
    pub(super) async fn store_call<T>(
        &self,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.store_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                metrics::counter!(crate::observability::STORE_TIMEOUTS_TOTAL).increment(1);
                Err(StoreError::Transient("store call timed out".into()))
            }
        }
    }
}

/// Record one finished operation: counter with outcome label + latency.
pub(super) fn record_op(op: &'static str, started: std::time::Instant, ok: bool) {
    let status = if ok { "ok" } else { "error" };
    metrics::counter!(crate::observability::OPS_TOTAL, "op" => op, "status" => status)
        .increment(1);
    metrics::histogram!(crate::observability::OP_DURATION_SECONDS, "op" => op)
        .record(started.elapsed().as_secs_f64());
}
