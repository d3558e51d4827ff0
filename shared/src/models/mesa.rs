//! Mesa Model (restaurant table)

use serde::{Deserialize, Serialize};

/// Table status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableStatus {
    #[default]
    Available,
    Occupied,
    InService,
    Maintenance,
}

/// Mesa entity
///
/// A mesa holds at most one active order (`current_order_id`). Moving the
/// status to AVAILABLE clears both `mesero_id` and `current_order_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Mesa {
    pub id: i64,
    pub number: i64,
    pub capacity: i32,
    pub status: TableStatus,
    pub location: Option<String>,
    /// Assigned server (mesero), user reference
    pub mesero_id: Option<i64>,
    pub current_order_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Mesa with mesero name (for list/detail views)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct MesaWithMesero {
    pub id: i64,
    pub number: i64,
    pub capacity: i32,
    pub status: TableStatus,
    pub location: Option<String>,
    pub mesero_id: Option<i64>,
    pub mesero_name: Option<String>,
    pub current_order_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create mesa payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MesaCreate {
    pub number: i64,
    pub capacity: Option<i32>,
    pub location: Option<String>,
}

/// Update mesa payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MesaUpdate {
    pub number: Option<i64>,
    pub capacity: Option<i32>,
    pub location: Option<String>,
}

/// Assign mesero payload (None unassigns)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MesaAssignMesero {
    pub mesero_id: Option<i64>,
}

/// Update status payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MesaStatusUpdate {
    pub status: TableStatus,
}
