use ulid::Ulid;

use crate::model::*;
use crate::store::{AppointmentFilter, InvoiceFilter, Order, Page};

use super::{ScheduleError, Scheduler};

impl Scheduler {
    pub async fn appointment(&self, id: Ulid) -> Result<Appointment, ScheduleError> {
        self.store_call(self.store().appointment(id))
            .await?
            .ok_or(ScheduleError::NotFound(id))
    }

    pub async fn appointments(
        &self,
        filter: AppointmentFilter,
        page: Page,
        order: Order,
    ) -> Result<Vec<Appointment>, ScheduleError> {
        Ok(self
            .store_call(self.store().appointments(&filter, page, order))
            .await?)
    }

    /// A worker's timeline within an inclusive start-time window.
    pub async fn worker_schedule(
        &self,
        worker_id: Ulid,
        from: chrono::DateTime<chrono::Utc>,
        until: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<Appointment>, ScheduleError> {
        let filter = AppointmentFilter {
            worker_id: Some(worker_id),
            starts_from: Some(from),
            starts_until: Some(until),
            ..Default::default()
        };
        Ok(self
            .store_call(self.store().appointments(&filter, Page::all(), Order::StartAsc))
            .await?)
    }

    pub async fn invoice(&self, id: Ulid) -> Result<Invoice, ScheduleError> {
        self.store_call(self.store().invoice(id))
            .await?
            .ok_or(ScheduleError::NotFound(id))
    }

    pub async fn invoices(
        &self,
        filter: InvoiceFilter,
        page: Page,
    ) -> Result<Vec<Invoice>, ScheduleError> {
        Ok(self.store_call(self.store().invoices(&filter, page)).await?)
    }

    pub async fn worker(&self, id: Ulid) -> Result<Worker, ScheduleError> {
        self.store_call(self.store().worker(id))
            .await?
            .ok_or(ScheduleError::NotFound(id))
    }

    /// Ordered by name; optional substring search (UI search box).
    pub async fn workers(&self, name_contains: Option<&str>) -> Result<Vec<Worker>, ScheduleError> {
        Ok(self.store_call(self.store().workers(name_contains)).await?)
    }

    pub async fn client(&self, id: Ulid) -> Result<Client, ScheduleError> {
        self.store_call(self.store().client(id))
            .await?
            .ok_or(ScheduleError::NotFound(id))
    }

    pub async fn clients(&self, name_contains: Option<&str>) -> Result<Vec<Client>, ScheduleError> {
        Ok(self.store_call(self.store().clients(name_contains)).await?)
    }

    pub async fn service(&self, id: Ulid) -> Result<Service, ScheduleError> {
        self.store_call(self.store().service(id))
            .await?
            .ok_or(ScheduleError::NotFound(id))
    }

    pub async fn services(&self, active_only: bool) -> Result<Vec<Service>, ScheduleError> {
        Ok(self.store_call(self.store().services(active_only)).await?)
    }
}
