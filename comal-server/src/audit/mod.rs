//! Tamper-evident audit trail
//!
//! # Architecture
//!
//! ```text
//! mutating handler
//!   ├─ audit_log! → AuditService::log() → mpsc → AuditWorker → audit_log table
//!   └─ AuditService::log_sync() → audit_log table (startup/shutdown)
//!
//! SHA256 hash chain: genesis → entry₁ → entry₂ → ... → entryₙ
//! ```
//!
//! # Guarantees
//!
//! - Every record embeds the previous record's hash
//! - Append-only storage, no update/delete interface
//! - `verify_chain` recomputes every hash and reports breaks
//!
//! Update entries carry a field-level diff from [`diff::create_diff`];
//! creates and deletes carry full snapshots with secrets stripped.

pub mod diff;
pub mod service;
pub mod storage;
pub mod types;
pub mod worker;

pub use service::{AuditLogRequest, AuditService};
pub use storage::{AuditStorage, AuditStorageError};
pub use types::{
    AuditAction, AuditChainVerification, AuditEntry, AuditListResponse, AuditQuery,
};
pub use worker::AuditWorker;

/// Record an audit entry through the server state's [`AuditService`].
///
/// With an operator:
/// `audit_log!(state, action, table, row_id, &user, before, after)`
///
/// System events:
/// `audit_log!(state, action, table, row_id, before, after)`
#[macro_export]
macro_rules! audit_log {
    ($state:expr, $action:expr, $table:expr, $row:expr, $user:expr, $before:expr, $after:expr $(,)?) => {
        $state
            .audit()
            .log(
                $action,
                $table,
                ($row).to_string(),
                Some(($user).id),
                Some(($user).username.clone()),
                $before,
                $after,
            )
            .await
    };
    ($state:expr, $action:expr, $table:expr, $row:expr, $before:expr, $after:expr $(,)?) => {
        $state
            .audit()
            .log($action, $table, ($row).to_string(), None, None, $before, $after)
            .await
    };
}
