//! Inventory Movement Model

use serde::{Deserialize, Serialize};

/// Movement classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    Inflow,
    Outflow,
    Adjustment,
}

/// Inventory movement (append-only ledger row, never mutated)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct InventoryMovement {
    pub id: i64,
    pub product_id: i64,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub reason: String,
    pub order_id: Option<i64>,
    pub user_id: Option<i64>,
    pub created_at: i64,
}

/// Movement with product name (for list views)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct MovementWithProduct {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub reason: String,
    pub order_id: Option<i64>,
    pub user_id: Option<i64>,
    pub created_at: i64,
}
