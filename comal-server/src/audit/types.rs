//! Audit log types
//!
//! Core data structures for the tamper-evident audit trail. Entries are
//! immutable and append-only, chained with SHA256 hashes.

use serde::{Deserialize, Serialize};

/// Audit action (enum, not free text)
///
/// Grouped by domain so every sensitive operation has a stable identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    // system lifecycle
    SystemStartup,
    SystemShutdown,

    // authentication
    LoginSuccess,
    LoginFailed,

    // users
    UserCreated,
    UserUpdated,

    // mesas
    MesaCreated,
    MesaUpdated,
    MesaDeleted,
    MesaStatusChanged,
    MeseroAssigned,

    // products and stock
    ProductCreated,
    ProductUpdated,
    ProductDeleted,
    ProductAvailabilityChanged,
    StockAdjusted,

    // orders (financially relevant)
    OrderCreated,
    OrderPaid,
    OrderCancelled,
    OrderItemCancelled,
    OrderItemStatusChanged,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Immutable audit entry
///
/// Each record carries a SHA256 hash chain:
/// - `prev_hash`: hash of the previous record ("genesis" for the first)
/// - `curr_hash`: hash over prev_hash plus all stored fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Row id (monotonic, append order)
    pub id: i64,
    /// Unix milliseconds
    pub created_at: i64,
    pub action: AuditAction,
    /// Affected table ("mesas", "products", "orders", "users", "system")
    pub table_name: String,
    /// Affected row id, stringified
    pub row_id: String,
    /// Operator (None for system events)
    pub operator_id: Option<i64>,
    pub operator_name: Option<String>,
    /// State before the change (None for creates and system events)
    pub before_snapshot: Option<serde_json::Value>,
    /// State after the change (None for deletes)
    pub after_snapshot: Option<serde_json::Value>,
    pub prev_hash: String,
    pub curr_hash: String,
}

/// Audit query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    /// Start of the time window (Unix ms, inclusive)
    pub from: Option<i64>,
    /// End of the time window (Unix ms, inclusive)
    pub to: Option<i64>,
    pub action: Option<AuditAction>,
    pub table_name: Option<String>,
    pub operator_id: Option<i64>,
    #[serde(default)]
    pub offset: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

/// Paginated audit listing
#[derive(Debug, Serialize)]
pub struct AuditListResponse {
    pub items: Vec<AuditEntry>,
    pub total: i64,
}

/// Result of walking the hash chain
#[derive(Debug, Serialize)]
pub struct AuditChainVerification {
    pub total_entries: i64,
    pub chain_intact: bool,
    pub breaks: Vec<AuditChainBreak>,
}

/// A point where the chain does not link up
#[derive(Debug, Serialize)]
pub struct AuditChainBreak {
    pub entry_id: i64,
    pub expected_hash: String,
    pub actual_hash: String,
}
