//! Append-only ledger of request status transitions
//!
//! Entries are written inside the same transaction as the status change they
//! describe and are never updated or deleted.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::StatusLogEntry;
use crate::store::{parse_status, parse_uuid};
use crate::workflow::RequestStatus;

/// Append one transition record
pub async fn append(
    conn: &mut SqliteConnection,
    request_id: Uuid,
    old_status: Option<RequestStatus>,
    new_status: RequestStatus,
    changed_by: Uuid,
    notes: Option<String>,
) -> Result<StatusLogEntry> {
    let entry = StatusLogEntry {
        id: Uuid::new_v4(),
        request_id,
        old_status,
        new_status,
        changed_by,
        notes,
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO status_logs (id, request_id, old_status, new_status, changed_by, notes, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.id.to_string())
    .bind(request_id.to_string())
    .bind(old_status.map(|s| s.as_str()))
    .bind(new_status.as_str())
    .bind(changed_by.to_string())
    .bind(entry.notes.as_deref())
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;

    tracing::debug!(
        request_id = %request_id,
        old_status = ?old_status,
        new_status = %new_status,
        "Recorded status transition"
    );

    Ok(entry)
}

/// All entries for a request, oldest first
pub async fn history(conn: &mut SqliteConnection, request_id: Uuid) -> Result<Vec<StatusLogEntry>> {
    let rows = sqlx::query_as::<_, StatusLogRow>(
        r#"
        SELECT id, request_id, old_status, new_status, changed_by, notes, created_at
        FROM status_logs
        WHERE request_id = ?
        ORDER BY rowid ASC
        "#,
    )
    .bind(request_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(|r| r.try_into()).collect()
}

#[derive(sqlx::FromRow)]
struct StatusLogRow {
    id: String,
    request_id: String,
    old_status: Option<String>,
    new_status: String,
    changed_by: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<StatusLogRow> for StatusLogEntry {
    type Error = AppError;

    fn try_from(row: StatusLogRow) -> Result<Self> {
        Ok(StatusLogEntry {
            id: parse_uuid(&row.id, "status log")?,
            request_id: parse_uuid(&row.request_id, "request_id")?,
            old_status: row
                .old_status
                .as_deref()
                .map(parse_status::<RequestStatus>)
                .transpose()?,
            new_status: parse_status(&row.new_status)?,
            changed_by: parse_uuid(&row.changed_by, "changed_by")?,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}
