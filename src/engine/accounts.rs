use chrono::Utc;
use ulid::Ulid;

use crate::context::RequestContext;
use crate::model::*;

use super::{record_op, ScheduleError, Scheduler};

/// Credential/access lifecycle. The core never sees password material —
/// generation, hashing, and storage live with the authentication
/// collaborator; here we keep only the login email, the system role, and
/// the forced-change flag.
impl Scheduler {
    /// Bind a login identity to a worker. The account starts with
    /// `must_change_password` set so the first session forces a reset.
    pub async fn provision_account(
        &self,
        ctx: &RequestContext,
        worker_id: Ulid,
        email: String,
        role: SystemRole,
    ) -> Result<Worker, ScheduleError> {
        let started = std::time::Instant::now();
        let result = self
            .provision_account_inner(ctx, worker_id, email, role)
            .await;
        record_op("provision_account", started, result.is_ok());
        result
    }

    async fn provision_account_inner(
        &self,
        ctx: &RequestContext,
        worker_id: Ulid,
        email: String,
        role: SystemRole,
    ) -> Result<Worker, ScheduleError> {
        ctx.require_admin("account provisioning")?;
        if email.trim().is_empty() || !email.contains('@') {
            return Err(ScheduleError::Validation("invalid email"));
        }
        if let Some(existing) = self.store_call(self.store().worker_by_email(&email)).await?
            && existing.id != worker_id
        {
            return Err(ScheduleError::Validation("email already bound to a worker"));
        }

        let mut worker = self
            .store_call(self.store().worker(worker_id))
            .await?
            .ok_or(ScheduleError::NotFound(worker_id))?;
        worker.account = Some(AccountBinding {
            email,
            role,
            must_change_password: true,
        });
        worker.updated_at = Utc::now();

        self.store_call(self.store().update_worker(&worker)).await?;
        tracing::info!(actor = %ctx.actor, worker = %worker_id, "account provisioned");
        Ok(worker)
    }

    pub async fn resolve_worker_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Worker>, ScheduleError> {
        Ok(self.store_call(self.store().worker_by_email(email)).await?)
    }

    /// Resolve a login identity into a request-scoped context. Inactive
    /// workers and unbound emails are refused; the must-change-password flag
    /// is read here, once, at session start.
    pub async fn begin_session(&self, email: &str) -> Result<RequestContext, ScheduleError> {
        let worker = self
            .store_call(self.store().worker_by_email(email))
            .await?
            .ok_or(ScheduleError::Forbidden("unknown login identity"))?;
        if !worker.active {
            return Err(ScheduleError::Forbidden("worker is inactive"));
        }
        let account = worker
            .account
            .as_ref()
            .ok_or(ScheduleError::Forbidden("no account binding"))?;

        Ok(RequestContext {
            actor: worker.id,
            role: account.role,
            must_change_password: account.must_change_password,
        })
    }

    /// Flag the account so the next session start demands a new password.
    pub async fn force_password_reset(
        &self,
        ctx: &RequestContext,
        worker_id: Ulid,
    ) -> Result<(), ScheduleError> {
        ctx.require_admin("password reset")?;
        self.set_must_change(worker_id, true).await?;
        tracing::info!(actor = %ctx.actor, worker = %worker_id, "password reset forced");
        Ok(())
    }

    /// Clear the flag once the authentication collaborator has accepted a
    /// new password.
    pub async fn complete_password_change(&self, worker_id: Ulid) -> Result<(), ScheduleError> {
        self.set_must_change(worker_id, false).await?;
        tracing::info!(worker = %worker_id, "password change completed");
        Ok(())
    }

    async fn set_must_change(&self, worker_id: Ulid, value: bool) -> Result<(), ScheduleError> {
        let mut worker = self
            .store_call(self.store().worker(worker_id))
            .await?
            .ok_or(ScheduleError::NotFound(worker_id))?;
        let account = worker
            .account
            .as_mut()
            .ok_or(ScheduleError::Validation("worker has no account binding"))?;
        account.must_change_password = value;
        worker.updated_at = Utc::now();
        self.store_call(self.store().update_worker(&worker)).await?;
        Ok(())
    }
}
