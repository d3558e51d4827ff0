//! Audit log storage (SQLite)
//!
//! Append-only: there is no update or delete interface. Each row is
//! chained to the previous one with a SHA256 hash so tampering with a
//! stored entry or removing one breaks the chain.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use thiserror::Error;

use super::types::{
    AuditAction, AuditChainBreak, AuditChainVerification, AuditEntry, AuditQuery,
};
use crate::utils::AppError;

/// Storage errors
#[derive(Debug, Error)]
pub enum AuditStorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type AuditStorageResult<T> = Result<T, AuditStorageError>;

impl From<AuditStorageError> for AppError {
    fn from(err: AuditStorageError) -> Self {
        AppError::internal(err.to_string())
    }
}

const AUDIT_COLUMNS: &str = "id, created_at, action, table_name, row_id, operator_id, \
     operator_name, before_snapshot, after_snapshot, prev_hash, curr_hash";

/// Raw row as stored; snapshots are JSON text
#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    id: i64,
    created_at: i64,
    action: String,
    table_name: String,
    row_id: String,
    operator_id: Option<i64>,
    operator_name: Option<String>,
    before_snapshot: Option<String>,
    after_snapshot: Option<String>,
    prev_hash: String,
    curr_hash: String,
}

impl TryFrom<AuditRow> for AuditEntry {
    type Error = AuditStorageError;

    fn try_from(r: AuditRow) -> Result<Self, Self::Error> {
        let action: AuditAction =
            serde_json::from_value(serde_json::Value::String(r.action))?;
        let before_snapshot = r
            .before_snapshot
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        let after_snapshot = r
            .after_snapshot
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        Ok(AuditEntry {
            id: r.id,
            created_at: r.created_at,
            action,
            table_name: r.table_name,
            row_id: r.row_id,
            operator_id: r.operator_id,
            operator_name: r.operator_name,
            before_snapshot,
            after_snapshot,
            prev_hash: r.prev_hash,
            curr_hash: r.curr_hash,
        })
    }
}

/// Audit log storage over the shared pool
///
/// Only `append` and read methods exist. Appends are serialized through a
/// mutex so the read-hash-then-insert step cannot race.
#[derive(Clone)]
pub struct AuditStorage {
    pool: SqlitePool,
    append_lock: Arc<tokio::sync::Mutex<()>>,
}

impl AuditStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            append_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Append one entry to the chain
    ///
    /// 1. Read the latest `curr_hash` (or "genesis" for an empty log)
    /// 2. Hash the new entry against it
    /// 3. Insert the row
    #[allow(clippy::too_many_arguments)]
    pub async fn append(
        &self,
        action: AuditAction,
        table_name: String,
        row_id: String,
        operator_id: Option<i64>,
        operator_name: Option<String>,
        before_snapshot: Option<serde_json::Value>,
        after_snapshot: Option<serde_json::Value>,
    ) -> AuditStorageResult<AuditEntry> {
        let _guard = self.append_lock.lock().await;

        let prev_hash: Option<String> =
            sqlx::query_scalar("SELECT curr_hash FROM audit_log ORDER BY id DESC LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;
        let prev_hash = prev_hash.unwrap_or_else(|| "genesis".to_string());

        let created_at = shared::util::now_millis();
        let action_str = action_to_str(action)?;

        // Snapshots are hashed and stored as the same serialized string,
        // so re-verification hashes exactly what the row contains.
        let before_json = before_snapshot
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let after_json = after_snapshot
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let curr_hash = compute_audit_hash(
            &prev_hash,
            created_at,
            &action_str,
            &table_name,
            &row_id,
            operator_id,
            operator_name.as_deref(),
            before_json.as_deref(),
            after_json.as_deref(),
        );

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO audit_log (created_at, action, table_name, row_id, operator_id, \
             operator_name, before_snapshot, after_snapshot, prev_hash, curr_hash) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) RETURNING id",
        )
        .bind(created_at)
        .bind(&action_str)
        .bind(&table_name)
        .bind(&row_id)
        .bind(operator_id)
        .bind(&operator_name)
        .bind(&before_json)
        .bind(&after_json)
        .bind(&prev_hash)
        .bind(&curr_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(AuditEntry {
            id,
            created_at,
            action,
            table_name,
            row_id,
            operator_id,
            operator_name,
            before_snapshot,
            after_snapshot,
            prev_hash,
            curr_hash,
        })
    }

    /// Query entries, newest first, with a total count for pagination
    pub async fn query(&self, q: &AuditQuery) -> AuditStorageResult<(Vec<AuditEntry>, i64)> {
        let mut conditions: Vec<&str> = Vec::new();

        if q.from.is_some() {
            conditions.push("created_at >= ?");
        }
        if q.to.is_some() {
            conditions.push("created_at <= ?");
        }
        if q.action.is_some() {
            conditions.push("action = ?");
        }
        if q.table_name.is_some() {
            conditions.push("table_name = ?");
        }
        if q.operator_id.is_some() {
            conditions.push("operator_id = ?");
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let action_str = q.action.map(action_to_str).transpose()?;
        let limit = q.limit.clamp(1, 500);
        let offset = q.offset.max(0);

        let count_sql = format!("SELECT COUNT(*) FROM audit_log{}", where_clause);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(from) = q.from {
            count_query = count_query.bind(from);
        }
        if let Some(to) = q.to {
            count_query = count_query.bind(to);
        }
        if let Some(ref action) = action_str {
            count_query = count_query.bind(action);
        }
        if let Some(ref table_name) = q.table_name {
            count_query = count_query.bind(table_name);
        }
        if let Some(operator_id) = q.operator_id {
            count_query = count_query.bind(operator_id);
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let select_sql = format!(
            "SELECT {AUDIT_COLUMNS} FROM audit_log{} ORDER BY id DESC LIMIT ? OFFSET ?",
            where_clause
        );
        let mut select_query = sqlx::query_as::<_, AuditRow>(&select_sql);
        if let Some(from) = q.from {
            select_query = select_query.bind(from);
        }
        if let Some(to) = q.to {
            select_query = select_query.bind(to);
        }
        if let Some(ref action) = action_str {
            select_query = select_query.bind(action);
        }
        if let Some(ref table_name) = q.table_name {
            select_query = select_query.bind(table_name);
        }
        if let Some(operator_id) = q.operator_id {
            select_query = select_query.bind(operator_id);
        }
        let rows = select_query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let entries = rows
            .into_iter()
            .map(AuditEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((entries, total))
    }

    /// Walk the chain in a time window and recompute every hash
    ///
    /// Linkage against the entry before the window is only checked when
    /// `from` is absent, since the predecessor is outside the selection.
    pub async fn verify_chain(
        &self,
        from: Option<i64>,
        to: Option<i64>,
    ) -> AuditStorageResult<AuditChainVerification> {
        let mut conditions: Vec<&str> = Vec::new();
        if from.is_some() {
            conditions.push("created_at >= ?");
        }
        if to.is_some() {
            conditions.push("created_at <= ?");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT {AUDIT_COLUMNS} FROM audit_log{} ORDER BY id ASC",
            where_clause
        );
        let mut query = sqlx::query_as::<_, AuditRow>(&sql);
        if let Some(from) = from {
            query = query.bind(from);
        }
        if let Some(to) = to {
            query = query.bind(to);
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut breaks = Vec::new();
        let mut expected_prev: Option<String> = from.is_none().then(|| "genesis".to_string());

        for row in &rows {
            if let Some(ref expected) = expected_prev
                && row.prev_hash != *expected
            {
                breaks.push(AuditChainBreak {
                    entry_id: row.id,
                    expected_hash: expected.clone(),
                    actual_hash: row.prev_hash.clone(),
                });
            }

            let recomputed = compute_audit_hash(
                &row.prev_hash,
                row.created_at,
                &row.action,
                &row.table_name,
                &row.row_id,
                row.operator_id,
                row.operator_name.as_deref(),
                row.before_snapshot.as_deref(),
                row.after_snapshot.as_deref(),
            );
            if recomputed != row.curr_hash {
                breaks.push(AuditChainBreak {
                    entry_id: row.id,
                    expected_hash: recomputed,
                    actual_hash: row.curr_hash.clone(),
                });
            }

            expected_prev = Some(row.curr_hash.clone());
        }

        Ok(AuditChainVerification {
            total_entries: rows.len() as i64,
            chain_intact: breaks.is_empty(),
            breaks,
        })
    }
}

/// Serde snake_case form of the action, as stored in the `action` column
fn action_to_str(action: AuditAction) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(action)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}

/// SHA256 over all stored fields
///
/// Variable-length fields are separated with `\x00` so ("ab","cd") and
/// ("abc","d") cannot collide. Fixed-width integers use LE bytes.
/// Optional fields are tagged `\x00` = None, `\x01` + bytes = Some, so
/// None and Some("") hash differently.
#[allow(clippy::too_many_arguments)]
fn compute_audit_hash(
    prev_hash: &str,
    created_at: i64,
    action: &str,
    table_name: &str,
    row_id: &str,
    operator_id: Option<i64>,
    operator_name: Option<&str>,
    before_snapshot: Option<&str>,
    after_snapshot: Option<&str>,
) -> String {
    let mut hasher = Sha256::new();

    hasher.update(prev_hash.as_bytes());
    hasher.update(b"\x00");

    hasher.update(created_at.to_le_bytes());

    hasher.update(action.as_bytes());
    hasher.update(b"\x00");
    hasher.update(table_name.as_bytes());
    hasher.update(b"\x00");
    hasher.update(row_id.as_bytes());
    hasher.update(b"\x00");

    match operator_id {
        Some(id) => {
            hasher.update(b"\x01");
            hasher.update(id.to_le_bytes());
        }
        None => {
            hasher.update(b"\x00");
        }
    }
    hasher.update(b"\x00");

    hash_optional(&mut hasher, operator_name);
    hash_optional(&mut hasher, before_snapshot);
    hash_optional(&mut hasher, after_snapshot);

    hex::encode(hasher.finalize())
}

fn hash_optional(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(v) => {
            hasher.update(b"\x01");
            hasher.update(v.as_bytes());
        }
        None => {
            hasher.update(b"\x00");
        }
    }
    hasher.update(b"\x00");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let a = compute_audit_hash(
            "genesis",
            1000,
            "mesa_created",
            "mesas",
            "1",
            Some(1),
            Some("admin"),
            None,
            Some("{\"number\":5}"),
        );
        let b = compute_audit_hash(
            "genesis",
            1000,
            "mesa_created",
            "mesas",
            "1",
            Some(1),
            Some("admin"),
            None,
            Some("{\"number\":5}"),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn any_field_change_alters_the_hash() {
        let base = compute_audit_hash(
            "genesis", 1000, "mesa_created", "mesas", "1", None, None, None, None,
        );
        let other_time = compute_audit_hash(
            "genesis", 1001, "mesa_created", "mesas", "1", None, None, None, None,
        );
        let other_row = compute_audit_hash(
            "genesis", 1000, "mesa_created", "mesas", "2", None, None, None, None,
        );
        assert_ne!(base, other_time);
        assert_ne!(base, other_row);
    }

    #[test]
    fn none_and_empty_string_hash_differently() {
        let none = compute_audit_hash(
            "genesis", 1000, "mesa_created", "mesas", "1", None, None, None, None,
        );
        let empty = compute_audit_hash(
            "genesis",
            1000,
            "mesa_created",
            "mesas",
            "1",
            None,
            Some(""),
            None,
            None,
        );
        assert_ne!(none, empty);
    }

    #[test]
    fn action_serializes_as_snake_case() {
        assert_eq!(
            action_to_str(AuditAction::OrderPaid).unwrap(),
            "order_paid"
        );
        assert_eq!(
            action_to_str(AuditAction::StockAdjusted).unwrap(),
            "stock_adjusted"
        );
    }
}
