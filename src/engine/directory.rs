use chrono::Utc;
use ulid::Ulid;

use crate::context::RequestContext;
use crate::model::*;
use crate::store::{AppointmentFilter, Order, Page};

use super::{record_op, ScheduleError, Scheduler};

impl Scheduler {
    async fn worker_has_appointments(&self, worker_id: Ulid) -> Result<bool, ScheduleError> {
        let filter = AppointmentFilter::for_worker(worker_id);
        let rows = self
            .store_call(self.store().appointments(&filter, Page::first(1), Order::StartAsc))
            .await?;
        Ok(!rows.is_empty())
    }

    async fn referenced_by_appointments(
        &self,
        filter: AppointmentFilter,
    ) -> Result<bool, ScheduleError> {
        let rows = self
            .store_call(self.store().appointments(&filter, Page::first(1), Order::StartAsc))
            .await?;
        Ok(!rows.is_empty())
    }

    // ── Workers ──────────────────────────────────────────────

    pub async fn create_worker(
        &self,
        ctx: &RequestContext,
        new: NewWorker,
    ) -> Result<Worker, ScheduleError> {
        let started = std::time::Instant::now();
        let result = async {
            ctx.require_admin("worker management")?;
            if new.name.trim().is_empty() {
                return Err(ScheduleError::Validation("worker name must not be empty"));
            }
            let now = Utc::now();
            let worker = Worker {
                id: Ulid::new(),
                name: new.name,
                contact: new.contact,
                job_title: new.job_title,
                availability: new.availability,
                active: true,
                account: None,
                created_at: now,
                updated_at: now,
            };
            self.store_call(self.store().insert_worker(&worker)).await?;
            tracing::info!(actor = %ctx.actor, worker = %worker.id, "worker created");
            Ok(worker)
        }
        .await;
        record_op("create_worker", started, result.is_ok());
        result
    }

    /// Admins edit any worker; everyone else only their own profile, and a
    /// self-edit may neither deactivate the worker nor touch the account
    /// binding.
    pub async fn update_worker(
        &self,
        ctx: &RequestContext,
        id: Ulid,
        patch: WorkerPatch,
    ) -> Result<Worker, ScheduleError> {
        let started = std::time::Instant::now();
        let result = self.update_worker_inner(ctx, id, patch).await;
        record_op("update_worker", started, result.is_ok());
        result
    }

    async fn update_worker_inner(
        &self,
        ctx: &RequestContext,
        id: Ulid,
        patch: WorkerPatch,
    ) -> Result<Worker, ScheduleError> {
        if !ctx.is_admin() {
            if ctx.actor != id {
                return Err(ScheduleError::Forbidden("worker management"));
            }
            if patch.active == Some(false) {
                return Err(ScheduleError::Forbidden("self-deactivation"));
            }
        }

        let mut worker = self
            .store_call(self.store().worker(id))
            .await?
            .ok_or(ScheduleError::NotFound(id))?;

        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(ScheduleError::Validation("worker name must not be empty"));
            }
            worker.name = name;
        }
        if let Some(contact) = patch.contact {
            worker.contact = contact;
        }
        if let Some(job_title) = patch.job_title {
            worker.job_title = job_title;
        }
        if let Some(availability) = patch.availability {
            worker.availability = availability;
        }
        if let Some(active) = patch.active {
            worker.active = active;
        }
        worker.updated_at = Utc::now();

        self.store_call(self.store().update_worker(&worker)).await?;
        tracing::info!(actor = %ctx.actor, worker = %id, "worker updated");
        Ok(worker)
    }

    pub async fn delete_worker(&self, ctx: &RequestContext, id: Ulid) -> Result<(), ScheduleError> {
        let started = std::time::Instant::now();
        let result = async {
            ctx.require_admin("worker management")?;
            self.store_call(self.store().worker(id))
                .await?
                .ok_or(ScheduleError::NotFound(id))?;
            if self.worker_has_appointments(id).await? {
                return Err(ScheduleError::HasDependents(id));
            }
            self.store_call(self.store().delete_worker(id)).await?;
            tracing::info!(actor = %ctx.actor, worker = %id, "worker deleted");
            Ok(())
        }
        .await;
        record_op("delete_worker", started, result.is_ok());
        result
    }

    // ── Clients ──────────────────────────────────────────────

    pub async fn create_client(
        &self,
        ctx: &RequestContext,
        new: NewClient,
    ) -> Result<Client, ScheduleError> {
        let started = std::time::Instant::now();
        let result = async {
            if new.name.trim().is_empty() {
                return Err(ScheduleError::Validation("client name must not be empty"));
            }
            let now = Utc::now();
            let client = Client {
                id: Ulid::new(),
                name: new.name,
                contact: new.contact,
                address: new.address,
                emergency_contact: new.emergency_contact,
                notes: new.notes,
                created_at: now,
                updated_at: now,
            };
            self.store_call(self.store().insert_client(&client)).await?;
            tracing::info!(actor = %ctx.actor, client = %client.id, "client created");
            Ok(client)
        }
        .await;
        record_op("create_client", started, result.is_ok());
        result
    }

    pub async fn update_client(
        &self,
        ctx: &RequestContext,
        id: Ulid,
        patch: ClientPatch,
    ) -> Result<Client, ScheduleError> {
        let started = std::time::Instant::now();
        let result = self.update_client_inner(ctx, id, patch).await;
        record_op("update_client", started, result.is_ok());
        result
    }

    async fn update_client_inner(
        &self,
        ctx: &RequestContext,
        id: Ulid,
        patch: ClientPatch,
    ) -> Result<Client, ScheduleError> {
        let mut client = self
            .store_call(self.store().client(id))
            .await?
            .ok_or(ScheduleError::NotFound(id))?;

        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(ScheduleError::Validation("client name must not be empty"));
            }
            client.name = name;
        }
        if let Some(contact) = patch.contact {
            client.contact = contact;
        }
        if let Some(address) = patch.address {
            client.address = address;
        }
        if let Some(emergency_contact) = patch.emergency_contact {
            client.emergency_contact = Some(emergency_contact);
        }
        if let Some(notes) = patch.notes {
            client.notes = Some(notes);
        }
        client.updated_at = Utc::now();

        self.store_call(self.store().update_client(&client)).await?;
        tracing::info!(actor = %ctx.actor, client = %id, "client updated");
        Ok(client)
    }

    pub async fn delete_client(&self, ctx: &RequestContext, id: Ulid) -> Result<(), ScheduleError> {
        let started = std::time::Instant::now();
        let result = async {
            self.store_call(self.store().client(id))
                .await?
                .ok_or(ScheduleError::NotFound(id))?;
            let referenced = self
                .referenced_by_appointments(AppointmentFilter {
                    client_id: Some(id),
                    ..Default::default()
                })
                .await?;
            if referenced {
                return Err(ScheduleError::HasDependents(id));
            }
            self.store_call(self.store().delete_client(id)).await?;
            tracing::info!(actor = %ctx.actor, client = %id, "client deleted");
            Ok(())
        }
        .await;
        record_op("delete_client", started, result.is_ok());
        result
    }

    // ── Services ─────────────────────────────────────────────

    pub async fn create_service(
        &self,
        ctx: &RequestContext,
        new: NewService,
    ) -> Result<Service, ScheduleError> {
        let started = std::time::Instant::now();
        let result = async {
            if new.name.trim().is_empty() {
                return Err(ScheduleError::Validation("service name must not be empty"));
            }
            if new.duration_minutes == 0 {
                return Err(ScheduleError::Validation("service duration must be positive"));
            }
            if new.base_price < rust_decimal::Decimal::ZERO {
                return Err(ScheduleError::Validation("base price must not be negative"));
            }
            let now = Utc::now();
            let service = Service {
                id: Ulid::new(),
                name: new.name,
                duration_minutes: new.duration_minutes,
                base_price: new.base_price,
                active: true,
                created_at: now,
                updated_at: now,
            };
            self.store_call(self.store().insert_service(&service)).await?;
            tracing::info!(actor = %ctx.actor, service = %service.id, "service created");
            Ok(service)
        }
        .await;
        record_op("create_service", started, result.is_ok());
        result
    }

    pub async fn update_service(
        &self,
        ctx: &RequestContext,
        id: Ulid,
        patch: ServicePatch,
    ) -> Result<Service, ScheduleError> {
        let started = std::time::Instant::now();
        let result = self.update_service_inner(ctx, id, patch).await;
        record_op("update_service", started, result.is_ok());
        result
    }

    async fn update_service_inner(
        &self,
        ctx: &RequestContext,
        id: Ulid,
        patch: ServicePatch,
    ) -> Result<Service, ScheduleError> {
        let mut service = self
            .store_call(self.store().service(id))
            .await?
            .ok_or(ScheduleError::NotFound(id))?;

        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(ScheduleError::Validation("service name must not be empty"));
            }
            service.name = name;
        }
        if let Some(duration_minutes) = patch.duration_minutes {
            if duration_minutes == 0 {
                return Err(ScheduleError::Validation("service duration must be positive"));
            }
            service.duration_minutes = duration_minutes;
        }
        if let Some(base_price) = patch.base_price {
            if base_price < rust_decimal::Decimal::ZERO {
                return Err(ScheduleError::Validation("base price must not be negative"));
            }
            service.base_price = base_price;
        }
        if let Some(active) = patch.active {
            service.active = active;
        }
        service.updated_at = Utc::now();

        self.store_call(self.store().update_service(&service)).await?;
        tracing::info!(actor = %ctx.actor, service = %id, "service updated");
        Ok(service)
    }

    pub async fn delete_service(&self, ctx: &RequestContext, id: Ulid) -> Result<(), ScheduleError> {
        let started = std::time::Instant::now();
        let result = async {
            self.store_call(self.store().service(id))
                .await?
                .ok_or(ScheduleError::NotFound(id))?;
            let referenced = self
                .referenced_by_appointments(AppointmentFilter {
                    service_id: Some(id),
                    ..Default::default()
                })
                .await?;
            if referenced {
                return Err(ScheduleError::HasDependents(id));
            }
            self.store_call(self.store().delete_service(id)).await?;
            tracing::info!(actor = %ctx.actor, service = %id, "service deleted");
            Ok(())
        }
        .await;
        record_op("delete_service", started, result.is_ok());
        result
    }
}
