//! Dashboard statistics repository
//!
//! Read-only projections over orders and products. Numbers are
//! point-in-time reads, not transactionally isolated against concurrent
//! mutations.

use chrono::{Local, NaiveTime};
use serde::Serialize;
use sqlx::SqlitePool;

use super::{RepoResult, inventory};
use shared::models::Product;

const TOP_PRODUCT_LIMIT: i64 = 5;

/// Dashboard payload
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    /// Start of the reporting window (local midnight, epoch millis)
    pub window_start: i64,
    /// Sum of paid order totals since the window start
    pub revenue_today: f64,
    pub paid_orders_today: i64,
    pub cancelled_orders_today: i64,
    pub active_orders: i64,
    /// revenue / paid count, 0 when nothing was paid yet
    pub average_ticket: f64,
    pub top_products: Vec<TopProduct>,
    pub low_stock: Vec<Product>,
}

/// Best seller row, ranked by quantity sold
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TopProduct {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
}

/// Epoch millis of the most recent local midnight.
fn window_start_millis() -> i64 {
    let now = Local::now();
    match now.with_time(NaiveTime::MIN).single() {
        Some(midnight) => midnight.timestamp_millis(),
        // DST gap where local midnight does not exist
        None => now.date_naive().and_time(NaiveTime::MIN).and_utc().timestamp_millis(),
    }
}

/// Assemble the dashboard from today's orders and current stock levels.
pub async fn dashboard(pool: &SqlitePool) -> RepoResult<DashboardStats> {
    let window_start = window_start_millis();

    let (revenue_today, paid_orders_today) = sqlx::query_as::<_, (f64, i64)>(
        "SELECT COALESCE(SUM(total), 0.0), COUNT(*) FROM orders \
         WHERE status = 'PAID' AND closed_at >= ?",
    )
    .bind(window_start)
    .fetch_one(pool)
    .await?;

    let cancelled_orders_today = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM orders WHERE status = 'CANCELLED' AND closed_at >= ?",
    )
    .bind(window_start)
    .fetch_one(pool)
    .await?;

    let active_orders =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE status = 'ACTIVE'")
            .fetch_one(pool)
            .await?;

    let top_products = sqlx::query_as::<_, TopProduct>(
        "SELECT oi.product_id, oi.product_name, SUM(oi.quantity) AS quantity \
         FROM order_items oi \
         JOIN orders o ON o.id = oi.order_id \
         WHERE o.status = 'PAID' AND o.closed_at >= ? AND oi.is_cancelled = 0 \
         GROUP BY oi.product_id, oi.product_name \
         ORDER BY quantity DESC, oi.product_name \
         LIMIT ?",
    )
    .bind(window_start)
    .bind(TOP_PRODUCT_LIMIT)
    .fetch_all(pool)
    .await?;

    let low_stock = inventory::low_stock(pool).await?;

    let average_ticket = if paid_orders_today > 0 {
        revenue_today / paid_orders_today as f64
    } else {
        0.0
    };

    Ok(DashboardStats {
        window_start,
        revenue_today,
        paid_orders_today,
        cancelled_orders_today,
        active_orders,
        average_ticket,
        top_products,
        low_stock,
    })
}
