//! Audit log reads.

use tracing::warn;

use crate::application::authorization::{Action, AuthorizationEngine, Resource};
use crate::domain::{Actor, AuditEntry, AuditFilter};
use crate::error::Result;
use crate::port::outbound::store::AuditStore;

/// Read-only access to the audit trail.
#[derive(Clone)]
pub struct AuditService<S> {
    store: S,
    authz: AuthorizationEngine,
}

impl<S: AuditStore> AuditService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            authz: AuthorizationEngine,
        }
    }

    /// Newest entries first.
    ///
    /// # Errors
    /// `PermissionDenied` without `can_view_audit_log` or admin rights.
    pub async fn entries(&self, actor: &Actor, filter: AuditFilter) -> Result<Vec<AuditEntry>> {
        if let Err(err) = self.authz.require(
            actor,
            Action::ViewAuditLog,
            Resource::System,
            "you do not have permission to view audit logs",
        ) {
            warn!(actor = %actor.user_id, "Audit log access denied");
            return Err(err);
        }
        self.store.audit_entries(filter).await
    }
}
