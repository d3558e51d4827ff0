//! Audit log background worker
//!
//! Consumes [`AuditLogRequest`]s from the mpsc channel and persists them.
//! Exits when the channel closes.

use super::service::AuditLogRequest;
use super::storage::AuditStorage;

pub struct AuditWorker {
    storage: AuditStorage,
}

impl AuditWorker {
    pub fn new(storage: AuditStorage) -> Self {
        Self { storage }
    }

    /// Run until the channel closes
    pub async fn run(self, mut rx: tokio::sync::mpsc::Receiver<AuditLogRequest>) {
        tracing::info!("Audit log worker started");

        while let Some(req) = rx.recv().await {
            match self
                .storage
                .append(
                    req.action,
                    req.table_name,
                    req.row_id,
                    req.operator_id,
                    req.operator_name,
                    req.before_snapshot,
                    req.after_snapshot,
                )
                .await
            {
                Ok(entry) => {
                    tracing::info!(
                        target: "audit",
                        audit_id = entry.id,
                        action = %entry.action,
                        table = %entry.table_name,
                        row = %entry.row_id,
                        "Audit entry recorded"
                    );
                }
                Err(e) => {
                    tracing::error!("Failed to write audit entry: {:?}", e);
                }
            }
        }

        tracing::info!("Audit log channel closed, worker stopping");
    }
}
