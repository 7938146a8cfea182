//! SQLite audit trail.
//!
//! Entries are only ever inserted through [`append`], which callers run inside
//! the transaction that performs the audited change.

use diesel::prelude::*;
use diesel::SqliteConnection;

use crate::adapter::outbound::sqlite::database::connection::{with_conn, DbPool};
use crate::adapter::outbound::sqlite::database::model::{now_rfc3339, AuditLogRow, NewAuditLogRow};
use crate::adapter::outbound::sqlite::database::schema::{audit_logs, users};
use crate::domain::{AuditEntry, AuditFilter, NewAuditEntry};
use crate::error::Result;
use crate::port::outbound::store::AuditStore;

/// Default and maximum number of entries returned by a listing.
pub const DEFAULT_AUDIT_LIMIT: i64 = 100;
pub const MAX_AUDIT_LIMIT: i64 = 1_000;

/// Insert one audit entry on the given connection.
pub(crate) fn append(conn: &mut SqliteConnection, entry: NewAuditEntry) -> Result<()> {
    let row = NewAuditLogRow {
        user_id: entry.user_id.value(),
        action: entry.action.as_str(),
        target: entry.target,
        details: entry.details,
        ip_address: entry.ip_address,
        created_at: now_rfc3339(),
    };
    diesel::insert_into(audit_logs::table)
        .values(&row)
        .execute(conn)?;
    Ok(())
}

/// SQLite-backed audit reader.
#[derive(Clone)]
pub struct SqliteAuditStore {
    pool: DbPool,
}

impl SqliteAuditStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl AuditStore for SqliteAuditStore {
    async fn audit_entries(&self, filter: AuditFilter) -> Result<Vec<AuditEntry>> {
        let limit = filter
            .limit
            .unwrap_or(DEFAULT_AUDIT_LIMIT)
            .clamp(1, MAX_AUDIT_LIMIT);

        with_conn(&self.pool, move |conn| {
            let mut query = audit_logs::table
                .inner_join(users::table)
                .select((AuditLogRow::as_select(), users::username))
                .into_boxed();
            if let Some(action) = filter.action {
                query = query.filter(audit_logs::action.eq(action.as_str()));
            }
            if let Some(user_id) = filter.user_id {
                query = query.filter(audit_logs::user_id.eq(user_id.value()));
            }

            let rows: Vec<(AuditLogRow, String)> = query
                .order((audit_logs::created_at.desc(), audit_logs::id.desc()))
                .limit(limit)
                .load(conn)?;

            rows.into_iter()
                .map(|(row, username)| row.into_entry(username))
                .collect()
        })
        .await
    }
}
