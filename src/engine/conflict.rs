use ulid::Ulid;

use crate::model::TimeRange;
use crate::store::{AppointmentFilter, Order, Page};

use super::{ScheduleError, Scheduler};

pub(crate) fn validate_range(range: &TimeRange) -> Result<(), ScheduleError> {
    if range.end <= range.start {
        return Err(ScheduleError::Validation("end must be after start"));
    }
    Ok(())
}

impl Scheduler {
    /// Find the first non-cancelled appointment of `worker_id` overlapping
    /// the candidate half-open range, skipping `exclude` (self-exclusion for
    /// update checks).
    ///
    /// Fail-closed: a gateway failure propagates — it is never reported as
    /// "no conflict found".
    pub async fn find_conflict(
        &self,
        worker_id: Ulid,
        range: TimeRange,
        exclude: Option<Ulid>,
    ) -> Result<Option<Ulid>, ScheduleError> {
        let filter = AppointmentFilter {
            worker_id: Some(worker_id),
            exclude,
            ..Default::default()
        };
        let existing = self
            .store_call(self.store().appointments(&filter, Page::all(), Order::StartAsc))
            .await?;

        for other in &existing {
            if other.blocks_schedule() && other.slot.overlaps(&range) {
                metrics::counter!(crate::observability::CONFLICTS_TOTAL).increment(1);
                tracing::debug!(
                    worker = %worker_id,
                    conflicting = %other.id,
                    "candidate range conflicts with existing appointment"
                );
                return Ok(Some(other.id));
            }
        }
        Ok(None)
    }

    /// Boolean form of [`find_conflict`](Self::find_conflict).
    pub async fn has_conflict(
        &self,
        worker_id: Ulid,
        range: TimeRange,
        exclude: Option<Ulid>,
    ) -> Result<bool, ScheduleError> {
        Ok(self.find_conflict(worker_id, range, exclude).await?.is_some())
    }
}
