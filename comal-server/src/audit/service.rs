//! Audit log service
//!
//! Front door for audit writes and reads:
//! - `log()` hands the entry to a background worker over an mpsc channel
//! - `log_sync()` writes directly (startup/shutdown, where the worker may
//!   not be running yet or is already drained)
//! - `query()` / `verify_chain()` read the store

use std::sync::Arc;

use tokio::sync::mpsc;

use super::storage::{AuditStorage, AuditStorageError};
use super::types::*;

/// A log request in flight to the worker
pub struct AuditLogRequest {
    pub action: AuditAction,
    pub table_name: String,
    pub row_id: String,
    pub operator_id: Option<i64>,
    pub operator_name: Option<String>,
    pub before_snapshot: Option<serde_json::Value>,
    pub after_snapshot: Option<serde_json::Value>,
}

/// Audit log service
///
/// Write path goes through an mpsc channel consumed by [`super::AuditWorker`]
/// so request handlers never wait on the audit insert. Reads go straight to
/// storage.
pub struct AuditService {
    storage: AuditStorage,
    tx: mpsc::Sender<AuditLogRequest>,
}

impl std::fmt::Debug for AuditService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditService").finish_non_exhaustive()
    }
}

impl AuditService {
    /// Create the service plus the receiver half for the worker
    pub fn new(
        pool: sqlx::SqlitePool,
        buffer_size: usize,
    ) -> (Arc<Self>, mpsc::Receiver<AuditLogRequest>) {
        let (tx, rx) = mpsc::channel(buffer_size);
        let storage = AuditStorage::new(pool);
        let service = Arc::new(Self { storage, tx });
        (service, rx)
    }

    /// Record an entry asynchronously
    ///
    /// Blocks on a full channel rather than dropping; audit entries must
    /// not be lost.
    #[allow(clippy::too_many_arguments)]
    pub async fn log(
        &self,
        action: AuditAction,
        table_name: impl Into<String>,
        row_id: impl Into<String>,
        operator_id: Option<i64>,
        operator_name: Option<String>,
        before_snapshot: Option<serde_json::Value>,
        after_snapshot: Option<serde_json::Value>,
    ) {
        let req = AuditLogRequest {
            action,
            table_name: table_name.into(),
            row_id: row_id.into(),
            operator_id,
            operator_name,
            before_snapshot,
            after_snapshot,
        };

        if self.tx.send(req).await.is_err() {
            tracing::error!("Audit log channel closed, audit entry lost");
        }
    }

    /// Write an entry directly, bypassing the worker
    pub async fn log_sync(
        &self,
        action: AuditAction,
        table_name: impl Into<String>,
        row_id: impl Into<String>,
        details: Option<serde_json::Value>,
    ) -> Result<AuditEntry, AuditStorageError> {
        self.storage
            .append(
                action,
                table_name.into(),
                row_id.into(),
                None,
                None,
                None,
                details,
            )
            .await
    }

    /// Query entries with filters and pagination
    pub async fn query(
        &self,
        q: &AuditQuery,
    ) -> Result<(Vec<AuditEntry>, i64), AuditStorageError> {
        self.storage.query(q).await
    }

    /// Verify hash chain integrity over a time window
    pub async fn verify_chain(
        &self,
        from: Option<i64>,
        to: Option<i64>,
    ) -> Result<AuditChainVerification, AuditStorageError> {
        self.storage.verify_chain(from, to).await
    }

    pub fn storage(&self) -> &AuditStorage {
        &self.storage
    }
}
