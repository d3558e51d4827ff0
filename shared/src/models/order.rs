//! Order Model (orden)

use serde::{Deserialize, Serialize};

/// Order status
///
/// State machine: `ACTIVE -> {PAID, CANCELLED}`. Both targets are terminal;
/// pay and cancel reject orders already in a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Active,
    Paid,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Cancelled)
    }
}

/// Payment method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash
    Efectivo,
    /// Card
    Tarjeta,
    /// Bank transfer
    Transferencia,
}

/// Line item kitchen status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineItemStatus {
    #[default]
    Pending,
    InPreparation,
    Ready,
    Delivered,
}

impl LineItemStatus {
    /// Kitchen flow position, transitions must move forward only.
    pub fn sequence(&self) -> u8 {
        match self {
            LineItemStatus::Pending => 0,
            LineItemStatus::InPreparation => 1,
            LineItemStatus::Ready => 2,
            LineItemStatus::Delivered => 3,
        }
    }
}

/// Order entity
///
/// `total` always equals the sum of `quantity * unit_price` over
/// non-cancelled line items.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    pub mesa_id: i64,
    /// Creating user reference
    pub user_id: i64,
    pub diners: i32,
    /// Total amount in currency unit
    pub total: f64,
    pub status: OrderStatus,
    /// Single payment method; split payments live in `order_payments`
    pub payment_method: Option<PaymentMethod>,
    pub note: Option<String>,
    pub created_at: i64,
    pub closed_at: Option<i64>,
}

/// Order line item (detalle de orden)
///
/// `unit_price` is a point-in-time snapshot of the product price, never a
/// live reference. Later product price edits do not touch it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    /// Product name snapshot at insertion time
    pub product_name: String,
    pub quantity: i64,
    /// Unit price in currency unit, snapshot at insertion time
    pub unit_price: f64,
    pub status: LineItemStatus,
    pub note: Option<String>,
    pub is_cancelled: bool,
    pub created_at: i64,
}

/// Split payment row (pago dividido)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderPayment {
    pub id: i64,
    pub order_id: i64,
    /// Diner position within the party (1-based)
    pub diner_index: i32,
    /// Amount in currency unit
    pub amount: f64,
    pub method: PaymentMethod,
    pub created_at: i64,
}

/// Order row joined with mesa and creator info (for list/detail views)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderWithMeta {
    pub id: i64,
    pub mesa_id: i64,
    pub mesa_number: i64,
    pub user_id: i64,
    pub user_name: String,
    pub diners: i32,
    pub total: f64,
    pub status: OrderStatus,
    pub payment_method: Option<PaymentMethod>,
    pub note: Option<String>,
    pub created_at: i64,
    pub closed_at: Option<i64>,
}

/// Full order detail: joined row plus line items and split payments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: OrderWithMeta,
    pub items: Vec<OrderItem>,
    pub payments: Vec<OrderPayment>,
}

/// Order list query filters
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    /// Free-text search over order id, mesa number and mesero name
    pub q: Option<String>,
    /// Created-at lower bound (Unix millis, inclusive)
    pub from: Option<i64>,
    /// Created-at upper bound (Unix millis, inclusive)
    pub to: Option<i64>,
    pub limit: Option<i64>,
}

/// Order list response, partitioned by lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderList {
    pub active: Vec<OrderDetail>,
    pub history: Vec<OrderDetail>,
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub mesa_id: i64,
    #[serde(default = "default_diners")]
    pub diners: i32,
    pub items: Vec<OrderItemCreate>,
    pub note: Option<String>,
}

fn default_diners() -> i32 {
    1
}

/// Requested line within a create payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemCreate {
    pub product_id: i64,
    pub quantity: i64,
    pub note: Option<String>,
}

/// Pay order payload: a single method or a per-diner split breakdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPay {
    pub method: Option<PaymentMethod>,
    pub splits: Option<Vec<SplitPayment>>,
    pub note: Option<String>,
}

/// One diner's share within a split payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitPayment {
    pub diner_index: i32,
    pub amount: f64,
    pub method: Option<PaymentMethod>,
}

/// Cancel order payload
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OrderCancel {
    pub note: Option<String>,
}

/// Update line item status payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemStatusUpdate {
    pub status: LineItemStatus,
}

/// Cancel line item payload
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OrderItemCancel {
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!OrderStatus::Active.is_terminal());
        assert!(OrderStatus::Paid.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn line_status_sequence_is_monotonic() {
        let flow = [
            LineItemStatus::Pending,
            LineItemStatus::InPreparation,
            LineItemStatus::Ready,
            LineItemStatus::Delivered,
        ];
        for pair in flow.windows(2) {
            assert!(pair[0].sequence() < pair[1].sequence());
        }
    }
}
