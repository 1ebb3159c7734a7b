use ulid::Ulid;

use crate::engine::ScheduleError;
use crate::model::SystemRole;

/// Request-scoped actor context. Built once per request (see
/// `Scheduler::begin_session`) and passed into every operation — the core
/// holds no ambient session state.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The worker performing the request.
    pub actor: Ulid,
    pub role: SystemRole,
    /// Read at session start; the presentation layer decides how to route
    /// a forced password change.
    pub must_change_password: bool,
}

impl RequestContext {
    pub fn new(actor: Ulid, role: SystemRole) -> Self {
        Self {
            actor,
            role,
            must_change_password: false,
        }
    }

    pub fn admin(actor: Ulid) -> Self {
        Self::new(actor, SystemRole::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == SystemRole::Admin
    }

    pub fn require_admin(&self, what: &'static str) -> Result<(), ScheduleError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ScheduleError::Forbidden(what))
        }
    }
}
