//! Inventory Repository
//!
//! Movement ledger convention:
//! - `INFLOW` / `OUTFLOW` rows carry a positive magnitude
//! - `ADJUSTMENT` rows carry the signed delta as entered
//!
//! Current stock always equals `sum(inflow) - sum(outflow) + sum(adjustment)`
//! plus nothing else; the ledger is append-only.

use super::{RepoError, RepoResult};
use shared::models::{MovementType, MovementWithProduct, Product, StockAdjust};
use shared::util::now_millis;
use sqlx::{SqliteConnection, SqlitePool};

/// Append one ledger row inside the caller's transaction.
///
/// The caller is responsible for having applied the matching stock
/// change in the same transaction.
pub async fn record_movement(
    conn: &mut SqliteConnection,
    product_id: i64,
    movement_type: MovementType,
    quantity: i64,
    reason: &str,
    order_id: Option<i64>,
    user_id: Option<i64>,
) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO inventory_movements \
         (product_id, movement_type, quantity, reason, order_id, user_id, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(product_id)
    .bind(movement_type)
    .bind(quantity)
    .bind(reason)
    .bind(order_id)
    .bind(user_id)
    .bind(now_millis())
    .execute(conn)
    .await?;
    Ok(())
}

/// Classify a manual stock adjustment into a ledger row.
///
/// Positive deltas are inflows and negative deltas outflows, both stored
/// as positive magnitudes. A reason marking a correction keeps the signed
/// delta under ADJUSTMENT.
fn classify(delta: i64, reason: &str) -> (MovementType, i64) {
    if reason.to_lowercase().contains("correc") {
        (MovementType::Adjustment, delta)
    } else if delta > 0 {
        (MovementType::Inflow, delta)
    } else {
        (MovementType::Outflow, -delta)
    }
}

/// Apply a manual stock adjustment (signed delta) and record it.
///
/// The stock floor is enforced here: an adjustment that would drive
/// stock below zero is rejected and nothing is written.
pub async fn adjust_stock(
    pool: &SqlitePool,
    product_id: i64,
    data: &StockAdjust,
    user_id: Option<i64>,
) -> RepoResult<Product> {
    if data.delta == 0 {
        return Err(RepoError::Validation("delta must not be zero".into()));
    }
    if data.reason.trim().is_empty() {
        return Err(RepoError::Validation("reason must not be empty".into()));
    }

    let mut tx = pool.begin().await?;

    // Guarded update: the WHERE clause enforces the stock floor so two
    // concurrent adjustments cannot race past zero
    let rows = sqlx::query(
        "UPDATE products SET stock = stock + ?1, updated_at = ?2 \
         WHERE id = ?3 AND stock + ?1 >= 0",
    )
    .bind(data.delta)
    .bind(now_millis())
    .bind(product_id)
    .execute(&mut *tx)
    .await?;

    if rows.rows_affected() == 0 {
        let exists =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE id = ?")
                .bind(product_id)
                .fetch_one(&mut *tx)
                .await?;
        return if exists == 0 {
            Err(RepoError::NotFound(format!(
                "Product {product_id} not found"
            )))
        } else {
            Err(RepoError::Constraint(
                "Adjustment would drive stock below zero".into(),
            ))
        };
    }

    let (movement_type, quantity) = classify(data.delta, &data.reason);
    record_movement(
        &mut tx,
        product_id,
        movement_type,
        quantity,
        &data.reason,
        None,
        user_id,
    )
    .await?;

    tx.commit().await?;
    super::product::find_by_id(pool, product_id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Product {product_id} not found")))
}

/// Movement history, newest first, filtered by product and date range.
pub async fn find_movements(
    pool: &SqlitePool,
    product_id: Option<i64>,
    from: Option<i64>,
    to: Option<i64>,
    limit: i64,
) -> RepoResult<Vec<MovementWithProduct>> {
    let mut sql = "SELECT m.id, m.product_id, p.name AS product_name, m.movement_type, \
                   m.quantity, m.reason, m.order_id, m.user_id, m.created_at \
                   FROM inventory_movements m JOIN products p ON p.id = m.product_id"
        .to_string();

    let mut conds: Vec<&str> = Vec::new();
    if product_id.is_some() {
        conds.push("m.product_id = ?");
    }
    if from.is_some() {
        conds.push("m.created_at >= ?");
    }
    if to.is_some() {
        conds.push("m.created_at <= ?");
    }
    if !conds.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conds.join(" AND "));
    }
    sql.push_str(" ORDER BY m.created_at DESC, m.id DESC LIMIT ?");

    let mut query = sqlx::query_as::<_, MovementWithProduct>(&sql);
    if let Some(pid) = product_id {
        query = query.bind(pid);
    }
    if let Some(from) = from {
        query = query.bind(from);
    }
    if let Some(to) = to {
        query = query.bind(to);
    }
    let movements = query.bind(limit).fetch_all(pool).await?;
    Ok(movements)
}

/// Products at or below their low-stock threshold (dashboard warning list).
pub async fn low_stock(pool: &SqlitePool) -> RepoResult<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT id, code, name, description, price, category, prep_minutes, image_url, \
         is_available, stock, stock_min, created_at, updated_at \
         FROM products WHERE stock <= stock_min AND is_available = 1 ORDER BY stock, name",
    )
    .fetch_all(pool)
    .await?;
    Ok(products)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_by_sign_and_reason() {
        assert_eq!(classify(5, "restock"), (MovementType::Inflow, 5));
        assert_eq!(classify(-3, "spoilage"), (MovementType::Outflow, 3));
        assert_eq!(
            classify(-2, "stock correction"),
            (MovementType::Adjustment, -2)
        );
        assert_eq!(
            classify(4, "correccion de inventario"),
            (MovementType::Adjustment, 4)
        );
    }
}
