use chrono::{DateTime, Utc};
use ulid::Ulid;

use crate::model::{slot_verdict, Worker};

use super::{ScheduleError, Scheduler};

/// Advisory check of a candidate start against the worker's declared weekly
/// availability. `None` = start falls outside both half-day slots (no
/// opinion); `Some(false)` = day/slot not declared available. The result is
/// surfaced as a warning only — it never blocks a booking.
pub fn advisory_availability(worker: &Worker, start: DateTime<Utc>) -> Option<bool> {
    slot_verdict(&worker.availability, start)
}

impl Scheduler {
    /// Resolve the worker and evaluate [`advisory_availability`].
    pub async fn availability_advisory(
        &self,
        worker_id: Ulid,
        start: DateTime<Utc>,
    ) -> Result<Option<bool>, ScheduleError> {
        let worker = self
            .store_call(self.store().worker(worker_id))
            .await?
            .ok_or(ScheduleError::NotFound(worker_id))?;
        Ok(advisory_availability(&worker, start))
    }
}
