//! Product Model

use serde::{Deserialize, Serialize};

/// Product entity
///
/// `stock >= 0` is enforced procedurally by the inventory repository, not
/// by a DB constraint. Every stock change is mirrored by exactly one
/// inventory movement row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    /// Optional external code (unique when present)
    pub code: Option<String>,
    pub name: String,
    pub description: Option<String>,
    /// Price in currency unit
    pub price: f64,
    pub category: String,
    /// Preparation time in minutes
    pub prep_minutes: Option<i32>,
    pub image_url: Option<String>,
    pub is_available: bool,
    pub stock: i64,
    /// Low-stock threshold for dashboard warnings
    pub stock_min: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreate {
    pub code: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: String,
    pub prep_minutes: Option<i32>,
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub stock_min: i64,
}

fn default_true() -> bool {
    true
}

/// Update product payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub prep_minutes: Option<i32>,
    pub image_url: Option<String>,
    pub is_available: Option<bool>,
    pub stock_min: Option<i64>,
}

/// Stock adjustment payload (signed delta, positive = inflow)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockAdjust {
    pub delta: i64,
    pub reason: String,
}
