use chrono::Utc;
use ulid::Ulid;

use crate::context::RequestContext;
use crate::model::*;
use crate::store::StoreError;

use super::availability::advisory_availability;
use super::conflict::validate_range;
use super::{record_op, ScheduleError, Scheduled, Scheduler};

impl Scheduler {
    /// Book an appointment. Conflict check and insert run back-to-back under
    /// the worker's lock; the store's exclusion constraint is the write-time
    /// backstop. On conflict nothing is written.
    pub async fn create_appointment(
        &self,
        ctx: &RequestContext,
        new: NewAppointment,
    ) -> Result<Scheduled, ScheduleError> {
        let started = std::time::Instant::now();
        let result = self.create_appointment_inner(ctx, new).await;
        record_op("create_appointment", started, result.is_ok());
        result
    }

    async fn create_appointment_inner(
        &self,
        ctx: &RequestContext,
        new: NewAppointment,
    ) -> Result<Scheduled, ScheduleError> {
        let range = TimeRange {
            start: new.start,
            end: new.end,
        };
        validate_range(&range)?;

        let worker = self
            .store_call(self.store().worker(new.worker_id))
            .await?
            .ok_or(ScheduleError::NotFound(new.worker_id))?;
        if !worker.active {
            return Err(ScheduleError::Validation("worker is inactive"));
        }
        self.store_call(self.store().client(new.client_id))
            .await?
            .ok_or(ScheduleError::NotFound(new.client_id))?;
        let service = self
            .store_call(self.store().service(new.service_id))
            .await?
            .ok_or(ScheduleError::NotFound(new.service_id))?;
        if !service.active {
            return Err(ScheduleError::Validation("service is inactive"));
        }

        let status = new.status.unwrap_or(AppointmentStatus::Scheduled);

        let lock = self.worker_lock(worker.id);
        let _guard = lock.lock().await;

        // A cancelled candidate never blocks the schedule, so it cannot
        // conflict (the store's exclusion check skips it for the same reason).
        if status != AppointmentStatus::Cancelled
            && let Some(existing) = self.find_conflict(worker.id, range, None).await?
        {
            return Err(ScheduleError::SchedulingConflict {
                existing: Some(existing),
            });
        }

        let now = Utc::now();
        let appointment = Appointment {
            id: Ulid::new(),
            worker_id: new.worker_id,
            client_id: new.client_id,
            service_id: new.service_id,
            slot: range,
            status,
            location: new.location,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        };

        self.store_call(self.store().insert_appointment(&appointment))
            .await
            .map_err(|e| match e {
                StoreError::ConstraintViolation("appointment overlap") => {
                    ScheduleError::SchedulingConflict { existing: None }
                }
                other => other.into(),
            })?;

        tracing::info!(
            actor = %ctx.actor,
            appointment = %appointment.id,
            worker = %appointment.worker_id,
            "appointment booked"
        );

        Ok(Scheduled {
            advisory: advisory_availability(&worker, appointment.slot.start),
            appointment,
        })
    }

    /// Patch an appointment. A patch touching worker, start, or end re-runs
    /// the conflict check excluding the appointment itself; any other patch
    /// (status, notes, location) is applied without a re-check. On conflict
    /// the stored record is left unmodified.
    pub async fn update_appointment(
        &self,
        ctx: &RequestContext,
        id: Ulid,
        patch: AppointmentPatch,
    ) -> Result<Scheduled, ScheduleError> {
        let started = std::time::Instant::now();
        let result = self.update_appointment_inner(ctx, id, patch).await;
        record_op("update_appointment", started, result.is_ok());
        result
    }

    async fn update_appointment_inner(
        &self,
        ctx: &RequestContext,
        id: Ulid,
        patch: AppointmentPatch,
    ) -> Result<Scheduled, ScheduleError> {
        let current = self
            .store_call(self.store().appointment(id))
            .await?
            .ok_or(ScheduleError::NotFound(id))?;

        // Effective post-patch scheduling coordinates: patch overrides,
        // otherwise the stored values.
        let worker_id = patch.worker_id.unwrap_or(current.worker_id);
        let range = TimeRange {
            start: patch.start.unwrap_or(current.slot.start),
            end: patch.end.unwrap_or(current.slot.end),
        };
        validate_range(&range)?;

        let worker = self
            .store_call(self.store().worker(worker_id))
            .await?
            .ok_or(ScheduleError::NotFound(worker_id))?;
        if patch.worker_id.is_some() && !worker.active {
            return Err(ScheduleError::Validation("worker is inactive"));
        }
        if let Some(client_id) = patch.client_id {
            self.store_call(self.store().client(client_id))
                .await?
                .ok_or(ScheduleError::NotFound(client_id))?;
        }
        if let Some(service_id) = patch.service_id {
            self.store_call(self.store().service(service_id))
                .await?
                .ok_or(ScheduleError::NotFound(service_id))?;
        }

        let reschedules = patch.reschedules();
        let lock = self.worker_lock(worker_id);
        let _guard = if reschedules {
            Some(lock.lock().await)
        } else {
            None
        };

        if reschedules
            && let Some(existing) = self.find_conflict(worker_id, range, Some(id)).await?
        {
            return Err(ScheduleError::SchedulingConflict {
                existing: Some(existing),
            });
        }

        let mut updated = current;
        updated.worker_id = worker_id;
        updated.slot = range;
        if let Some(client_id) = patch.client_id {
            updated.client_id = client_id;
        }
        if let Some(service_id) = patch.service_id {
            updated.service_id = service_id;
        }
        if let Some(status) = patch.status {
            updated.status = status;
        }
        if let Some(location) = patch.location {
            updated.location = location;
        }
        if let Some(notes) = patch.notes {
            updated.notes = Some(notes);
        }
        updated.updated_at = Utc::now();

        self.store_call(self.store().update_appointment(&updated))
            .await
            .map_err(|e| match e {
                StoreError::ConstraintViolation("appointment overlap") => {
                    ScheduleError::SchedulingConflict { existing: None }
                }
                other => other.into(),
            })?;

        tracing::info!(actor = %ctx.actor, appointment = %id, rescheduled = reschedules, "appointment updated");

        Ok(Scheduled {
            advisory: advisory_availability(&worker, updated.slot.start),
            appointment: updated,
        })
    }

    /// Delete an appointment. Blocked while an invoice references it.
    pub async fn delete_appointment(
        &self,
        ctx: &RequestContext,
        id: Ulid,
    ) -> Result<(), ScheduleError> {
        let started = std::time::Instant::now();
        let result = self.delete_appointment_inner(ctx, id).await;
        record_op("delete_appointment", started, result.is_ok());
        result
    }

    async fn delete_appointment_inner(
        &self,
        ctx: &RequestContext,
        id: Ulid,
    ) -> Result<(), ScheduleError> {
        self.store_call(self.store().appointment(id))
            .await?
            .ok_or(ScheduleError::NotFound(id))?;

        if self
            .store_call(self.store().invoice_for_appointment(id))
            .await?
            .is_some()
        {
            return Err(ScheduleError::HasDependents(id));
        }

        self.store_call(self.store().delete_appointment(id)).await?;
        tracing::info!(actor = %ctx.actor, appointment = %id, "appointment deleted");
        Ok(())
    }
}
