use async_trait::async_trait;
use dashmap::DashMap;
use ulid::Ulid;

use crate::model::*;

use super::{AppointmentFilter, InvoiceFilter, Order, Page, Store, StoreError};

/// In-process store backed by one map per record kind. Enforces the same
/// write-time constraints a relational backend would carry: per-worker
/// appointment interval exclusion and one invoice per appointment.
#[derive(Default)]
pub struct MemoryStore {
    workers: DashMap<Ulid, Worker>,
    clients: DashMap<Ulid, Client>,
    services: DashMap<Ulid, Service>,
    appointments: DashMap<Ulid, Appointment>,
    invoices: DashMap<Ulid, Invoice>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclusion check for a candidate row against every other non-cancelled
    /// appointment of the same worker.
    fn violates_exclusion(&self, candidate: &Appointment) -> bool {
        if !candidate.blocks_schedule() {
            return false;
        }
        self.appointments.iter().any(|entry| {
            let other = entry.value();
            other.id != candidate.id
                && other.worker_id == candidate.worker_id
                && other.blocks_schedule()
                && other.slot.overlaps(&candidate.slot)
        })
    }

    fn contains(name: &str, needle: Option<&str>) -> bool {
        needle.is_none_or(|n| name.to_lowercase().contains(&n.to_lowercase()))
    }
}

fn paginate<T>(mut rows: Vec<T>, page: Page) -> Vec<T> {
    if page.offset > 0 {
        rows = rows.split_off(page.offset.min(rows.len()));
    }
    if let Some(limit) = page.limit {
        rows.truncate(limit);
    }
    rows
}

#[async_trait]
impl Store for MemoryStore {
    // ── Workers ──────────────────────────────────────────────

    async fn insert_worker(&self, worker: &Worker) -> Result<(), StoreError> {
        if self.workers.contains_key(&worker.id) {
            return Err(StoreError::ConstraintViolation("duplicate worker id"));
        }
        self.workers.insert(worker.id, worker.clone());
        Ok(())
    }

    async fn worker(&self, id: Ulid) -> Result<Option<Worker>, StoreError> {
        Ok(self.workers.get(&id).map(|e| e.value().clone()))
    }

    async fn update_worker(&self, worker: &Worker) -> Result<(), StoreError> {
        if !self.workers.contains_key(&worker.id) {
            return Err(StoreError::NotFound(worker.id));
        }
        self.workers.insert(worker.id, worker.clone());
        Ok(())
    }

    async fn delete_worker(&self, id: Ulid) -> Result<(), StoreError> {
        self.workers
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    async fn workers(&self, name_contains: Option<&str>) -> Result<Vec<Worker>, StoreError> {
        let mut rows: Vec<Worker> = self
            .workers
            .iter()
            .filter(|e| Self::contains(&e.value().name, name_contains))
            .map(|e| e.value().clone())
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn worker_by_email(&self, email: &str) -> Result<Option<Worker>, StoreError> {
        Ok(self
            .workers
            .iter()
            .find(|e| {
                e.value()
                    .account
                    .as_ref()
                    .is_some_and(|a| a.email.eq_ignore_ascii_case(email))
            })
            .map(|e| e.value().clone()))
    }

    // ── Clients ──────────────────────────────────────────────

    async fn insert_client(&self, client: &Client) -> Result<(), StoreError> {
        if self.clients.contains_key(&client.id) {
            return Err(StoreError::ConstraintViolation("duplicate client id"));
        }
        self.clients.insert(client.id, client.clone());
        Ok(())
    }

    async fn client(&self, id: Ulid) -> Result<Option<Client>, StoreError> {
        Ok(self.clients.get(&id).map(|e| e.value().clone()))
    }

    async fn update_client(&self, client: &Client) -> Result<(), StoreError> {
        if !self.clients.contains_key(&client.id) {
            return Err(StoreError::NotFound(client.id));
        }
        self.clients.insert(client.id, client.clone());
        Ok(())
    }

    async fn delete_client(&self, id: Ulid) -> Result<(), StoreError> {
        self.clients
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    async fn clients(&self, name_contains: Option<&str>) -> Result<Vec<Client>, StoreError> {
        let mut rows: Vec<Client> = self
            .clients
            .iter()
            .filter(|e| Self::contains(&e.value().name, name_contains))
            .map(|e| e.value().clone())
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    // ── Services ─────────────────────────────────────────────

    async fn insert_service(&self, service: &Service) -> Result<(), StoreError> {
        if self.services.contains_key(&service.id) {
            return Err(StoreError::ConstraintViolation("duplicate service id"));
        }
        self.services.insert(service.id, service.clone());
        Ok(())
    }

    async fn service(&self, id: Ulid) -> Result<Option<Service>, StoreError> {
        Ok(self.services.get(&id).map(|e| e.value().clone()))
    }

    async fn update_service(&self, service: &Service) -> Result<(), StoreError> {
        if !self.services.contains_key(&service.id) {
            return Err(StoreError::NotFound(service.id));
        }
        self.services.insert(service.id, service.clone());
        Ok(())
    }

    async fn delete_service(&self, id: Ulid) -> Result<(), StoreError> {
        self.services
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    async fn services(&self, active_only: bool) -> Result<Vec<Service>, StoreError> {
        let mut rows: Vec<Service> = self
            .services
            .iter()
            .filter(|e| !active_only || e.value().active)
            .map(|e| e.value().clone())
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    // ── Appointments ─────────────────────────────────────────

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        if self.appointments.contains_key(&appointment.id) {
            return Err(StoreError::ConstraintViolation("duplicate appointment id"));
        }
        if self.violates_exclusion(appointment) {
            return Err(StoreError::ConstraintViolation("appointment overlap"));
        }
        self.appointments.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn appointment(&self, id: Ulid) -> Result<Option<Appointment>, StoreError> {
        Ok(self.appointments.get(&id).map(|e| e.value().clone()))
    }

    async fn update_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        if !self.appointments.contains_key(&appointment.id) {
            return Err(StoreError::NotFound(appointment.id));
        }
        if self.violates_exclusion(appointment) {
            return Err(StoreError::ConstraintViolation("appointment overlap"));
        }
        self.appointments.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn delete_appointment(&self, id: Ulid) -> Result<(), StoreError> {
        self.appointments
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    async fn appointments(
        &self,
        filter: &AppointmentFilter,
        page: Page,
        order: Order,
    ) -> Result<Vec<Appointment>, StoreError> {
        let mut rows: Vec<Appointment> = self
            .appointments
            .iter()
            .filter(|e| filter.matches(e.value()))
            .map(|e| e.value().clone())
            .collect();
        match order {
            Order::StartAsc => rows.sort_by_key(|a| a.slot.start),
            Order::StartDesc => {
                rows.sort_by_key(|a| a.slot.start);
                rows.reverse();
            }
        }
        Ok(paginate(rows, page))
    }

    // ── Invoices ─────────────────────────────────────────────

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), StoreError> {
        if self.invoices.contains_key(&invoice.id) {
            return Err(StoreError::ConstraintViolation("duplicate invoice id"));
        }
        let taken = self
            .invoices
            .iter()
            .any(|e| e.value().appointment_id == invoice.appointment_id);
        if taken {
            return Err(StoreError::ConstraintViolation(
                "invoice exists for appointment",
            ));
        }
        self.invoices.insert(invoice.id, invoice.clone());
        Ok(())
    }

    async fn invoice(&self, id: Ulid) -> Result<Option<Invoice>, StoreError> {
        Ok(self.invoices.get(&id).map(|e| e.value().clone()))
    }

    async fn update_invoice(&self, invoice: &Invoice) -> Result<(), StoreError> {
        if !self.invoices.contains_key(&invoice.id) {
            return Err(StoreError::NotFound(invoice.id));
        }
        self.invoices.insert(invoice.id, invoice.clone());
        Ok(())
    }

    async fn delete_invoice(&self, id: Ulid) -> Result<(), StoreError> {
        self.invoices
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    async fn invoices(&self, filter: &InvoiceFilter, page: Page) -> Result<Vec<Invoice>, StoreError> {
        let mut rows: Vec<Invoice> = self
            .invoices
            .iter()
            .filter(|e| filter.matches(e.value()))
            .map(|e| e.value().clone())
            .collect();
        rows.sort_by_key(|i| i.due_date);
        Ok(paginate(rows, page))
    }

    async fn invoice_for_appointment(
        &self,
        appointment_id: Ulid,
    ) -> Result<Option<Invoice>, StoreError> {
        Ok(self
            .invoices
            .iter()
            .find(|e| e.value().appointment_id == appointment_id)
            .map(|e| e.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal::Decimal;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    fn appt(worker_id: Ulid, start: DateTime<Utc>, end: DateTime<Utc>) -> Appointment {
        Appointment {
            id: Ulid::new(),
            worker_id,
            client_id: Ulid::new(),
            service_id: Ulid::new(),
            slot: TimeRange::new(start, end),
            status: AppointmentStatus::Scheduled,
            location: "home visit".into(),
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn invoice(appointment_id: Ulid) -> Invoice {
        Invoice {
            id: Ulid::new(),
            client_id: Ulid::new(),
            appointment_id,
            amount: Decimal::new(4500, 2),
            status: InvoiceStatus::Draft,
            due_date: chrono::NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            paid_date: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn exclusion_constraint_rejects_overlap_at_write_time() {
        let store = MemoryStore::new();
        let worker = Ulid::new();

        store
            .insert_appointment(&appt(worker, at(10, 0), at(11, 0)))
            .await
            .unwrap();

        // Overlapping write rejected even without any engine-level check.
        let result = store
            .insert_appointment(&appt(worker, at(10, 30), at(11, 30)))
            .await;
        assert!(matches!(result, Err(StoreError::ConstraintViolation(_))));

        // Back-to-back is fine.
        store
            .insert_appointment(&appt(worker, at(11, 0), at(12, 0)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn exclusion_ignores_cancelled_rows() {
        let store = MemoryStore::new();
        let worker = Ulid::new();

        let mut cancelled = appt(worker, at(10, 0), at(11, 0));
        cancelled.status = AppointmentStatus::Cancelled;
        store.insert_appointment(&cancelled).await.unwrap();

        store
            .insert_appointment(&appt(worker, at(10, 0), at(11, 0)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn exclusion_is_per_worker() {
        let store = MemoryStore::new();
        store
            .insert_appointment(&appt(Ulid::new(), at(10, 0), at(11, 0)))
            .await
            .unwrap();
        store
            .insert_appointment(&appt(Ulid::new(), at(10, 0), at(11, 0)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_recheck_excludes_self() {
        let store = MemoryStore::new();
        let worker = Ulid::new();

        let mut a = appt(worker, at(10, 0), at(11, 0));
        store.insert_appointment(&a).await.unwrap();

        // Rewriting the same row with its own unchanged interval succeeds.
        a.notes = Some("bring paperwork".into());
        store.update_appointment(&a).await.unwrap();

        // Moving it onto another row's interval fails.
        let b = appt(worker, at(12, 0), at(13, 0));
        store.insert_appointment(&b).await.unwrap();
        a.slot = TimeRange::new(at(12, 30), at(13, 30));
        let result = store.update_appointment(&a).await;
        assert!(matches!(result, Err(StoreError::ConstraintViolation(_))));
    }

    #[tokio::test]
    async fn one_invoice_per_appointment() {
        let store = MemoryStore::new();
        let appointment_id = Ulid::new();

        store.insert_invoice(&invoice(appointment_id)).await.unwrap();
        let result = store.insert_invoice(&invoice(appointment_id)).await;
        assert!(matches!(result, Err(StoreError::ConstraintViolation(_))));

        assert!(store
            .invoice_for_appointment(appointment_id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn appointment_filter_and_order() {
        let store = MemoryStore::new();
        let worker = Ulid::new();
        let other = Ulid::new();

        store
            .insert_appointment(&appt(worker, at(14, 0), at(15, 0)))
            .await
            .unwrap();
        store
            .insert_appointment(&appt(worker, at(9, 0), at(10, 0)))
            .await
            .unwrap();
        store
            .insert_appointment(&appt(other, at(9, 0), at(10, 0)))
            .await
            .unwrap();

        let rows = store
            .appointments(
                &AppointmentFilter::for_worker(worker),
                Page::all(),
                Order::StartAsc,
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].slot.start < rows[1].slot.start);

        let ranged = store
            .appointments(
                &AppointmentFilter {
                    worker_id: Some(worker),
                    starts_from: Some(at(10, 0)),
                    ..Default::default()
                },
                Page::all(),
                Order::StartAsc,
            )
            .await
            .unwrap();
        assert_eq!(ranged.len(), 1);
        assert_eq!(ranged[0].slot.start, at(14, 0));
    }

    #[tokio::test]
    async fn name_search_is_case_insensitive() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .insert_client(&Client {
                id: Ulid::new(),
                name: "Marguerite Delacroix".into(),
                contact: "555-0101".into(),
                address: "12 Rue des Lilas".into(),
                emergency_contact: None,
                notes: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        assert_eq!(store.clients(Some("marguerite")).await.unwrap().len(), 1);
        assert_eq!(store.clients(Some("DELA")).await.unwrap().len(), 1);
        assert!(store.clients(Some("nobody")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.delete_appointment(Ulid::new()).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
