use chrono::Utc;
use rust_decimal::Decimal;
use ulid::Ulid;

use crate::context::RequestContext;
use crate::model::*;
use crate::store::StoreError;

use super::{record_op, ScheduleError, Scheduler};

impl Scheduler {
    /// Derive an invoice from an appointment. At most one invoice per
    /// appointment; the amount defaults to the service's base price.
    pub async fn create_invoice(
        &self,
        ctx: &RequestContext,
        new: NewInvoice,
    ) -> Result<Invoice, ScheduleError> {
        let started = std::time::Instant::now();
        let result = self.create_invoice_inner(ctx, new).await;
        record_op("create_invoice", started, result.is_ok());
        result
    }

    async fn create_invoice_inner(
        &self,
        ctx: &RequestContext,
        new: NewInvoice,
    ) -> Result<Invoice, ScheduleError> {
        ctx.require_admin("invoice management")?;

        let appointment = self
            .store_call(self.store().appointment(new.appointment_id))
            .await?
            .ok_or(ScheduleError::NotFound(new.appointment_id))?;
        self.store_call(self.store().client(new.client_id))
            .await?
            .ok_or(ScheduleError::NotFound(new.client_id))?;

        if self
            .store_call(self.store().invoice_for_appointment(appointment.id))
            .await?
            .is_some()
        {
            return Err(ScheduleError::DuplicateInvoice(appointment.id));
        }

        let amount = match new.amount {
            Some(amount) => amount,
            None => {
                let service = self
                    .store_call(self.store().service(appointment.service_id))
                    .await?
                    .ok_or(ScheduleError::NotFound(appointment.service_id))?;
                service.base_price
            }
        };
        if amount < Decimal::ZERO {
            return Err(ScheduleError::Validation("amount must not be negative"));
        }

        let now = Utc::now();
        let status = new.status.unwrap_or(InvoiceStatus::Draft);
        // An invoice born paid gets its paid date stamped, same as the
        // update path.
        let paid_date = (status == InvoiceStatus::Paid).then(|| now.date_naive());
        let invoice = Invoice {
            id: Ulid::new(),
            client_id: new.client_id,
            appointment_id: new.appointment_id,
            amount,
            status,
            due_date: new.due_date,
            paid_date,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        };

        self.store_call(self.store().insert_invoice(&invoice))
            .await
            .map_err(|e| match e {
                StoreError::ConstraintViolation("invoice exists for appointment") => {
                    ScheduleError::DuplicateInvoice(new.appointment_id)
                }
                other => other.into(),
            })?;

        tracing::info!(actor = %ctx.actor, invoice = %invoice.id, appointment = %invoice.appointment_id, "invoice created");
        Ok(invoice)
    }

    /// Patch an invoice. A transition to `paid` without a paid date stamps
    /// today's date; other statuses leave an existing paid date untouched.
    pub async fn update_invoice(
        &self,
        ctx: &RequestContext,
        id: Ulid,
        patch: InvoicePatch,
    ) -> Result<Invoice, ScheduleError> {
        let started = std::time::Instant::now();
        let result = self.update_invoice_inner(ctx, id, patch).await;
        record_op("update_invoice", started, result.is_ok());
        result
    }

    async fn update_invoice_inner(
        &self,
        ctx: &RequestContext,
        id: Ulid,
        patch: InvoicePatch,
    ) -> Result<Invoice, ScheduleError> {
        ctx.require_admin("invoice management")?;

        let mut invoice = self
            .store_call(self.store().invoice(id))
            .await?
            .ok_or(ScheduleError::NotFound(id))?;

        if let Some(amount) = patch.amount {
            if amount < Decimal::ZERO {
                return Err(ScheduleError::Validation("amount must not be negative"));
            }
            invoice.amount = amount;
        }
        if let Some(due_date) = patch.due_date {
            invoice.due_date = due_date;
        }
        if let Some(paid_date) = patch.paid_date {
            invoice.paid_date = Some(paid_date);
        }
        if let Some(notes) = patch.notes {
            invoice.notes = Some(notes);
        }
        if let Some(status) = patch.status {
            invoice.status = status;
        }
        if invoice.status == InvoiceStatus::Paid && invoice.paid_date.is_none() {
            invoice.paid_date = Some(Utc::now().date_naive());
        }
        invoice.updated_at = Utc::now();

        self.store_call(self.store().update_invoice(&invoice)).await?;
        tracing::info!(actor = %ctx.actor, invoice = %id, status = invoice.status.as_str(), "invoice updated");
        Ok(invoice)
    }

    /// Delete an invoice. Unconditional — nothing references invoices.
    pub async fn delete_invoice(&self, ctx: &RequestContext, id: Ulid) -> Result<(), ScheduleError> {
        let started = std::time::Instant::now();
        let result = async {
            ctx.require_admin("invoice management")?;
            self.store_call(self.store().invoice(id))
                .await?
                .ok_or(ScheduleError::NotFound(id))?;
            self.store_call(self.store().delete_invoice(id)).await?;
            tracing::info!(actor = %ctx.actor, invoice = %id, "invoice deleted");
            Ok(())
        }
        .await;
        record_op("delete_invoice", started, result.is_ok());
        result
    }
}
