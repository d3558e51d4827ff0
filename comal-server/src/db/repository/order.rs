//! Order Repository
//!
//! Every multi-step mutation (create with stock decrement, pay, cancel,
//! line cancel) runs inside one transaction; any failure rolls the whole
//! unit back. The mesa occupancy update is part of the same transaction
//! so an order and its mesa can never disagree.

use super::{RepoError, RepoResult, inventory};
use shared::models::{
    LineItemStatus, Mesa, MovementType, Order, OrderCancel, OrderCreate, OrderDetail, OrderItem,
    OrderItemCancel, OrderList, OrderPay, OrderPayment, OrderQuery, OrderStatus, OrderWithMeta,
    PaymentMethod, Product, TableStatus,
};
use shared::util::{now_millis, snowflake_id};
use sqlx::{SqliteConnection, SqlitePool};

/// Tolerance when comparing split payment sums against the order total
const PAYMENT_EPSILON: f64 = 1e-9;

const META_SELECT: &str = "SELECT o.id, o.mesa_id, m.number AS mesa_number, o.user_id, \
    u.name AS user_name, o.diners, o.total, o.status, o.payment_method, o.note, \
    o.created_at, o.closed_at \
    FROM orders o JOIN mesas m ON m.id = o.mesa_id JOIN users u ON u.id = o.user_id";

const PRODUCT_COLUMNS: &str = "id, code, name, description, price, category, prep_minutes, \
    image_url, is_available, stock, stock_min, created_at, updated_at";

/// Create an order with its line items.
///
/// When stock control is enabled each line decrements product stock
/// under a `stock >= quantity` guard and appends one OUTFLOW movement.
pub async fn create(
    pool: &SqlitePool,
    data: &OrderCreate,
    user_id: i64,
    stock_control: bool,
) -> RepoResult<OrderDetail> {
    if data.items.is_empty() {
        return Err(RepoError::Validation(
            "Order must contain at least one line item".into(),
        ));
    }
    if data.diners < 1 {
        return Err(RepoError::Validation("diners must be at least 1".into()));
    }
    if data.items.iter().any(|item| item.quantity <= 0) {
        return Err(RepoError::Validation(
            "Line item quantity must be positive".into(),
        ));
    }

    let now = now_millis();
    let order_id = snowflake_id();
    let mut tx = pool.begin().await?;

    let mesa = sqlx::query_as::<_, Mesa>(
        "SELECT id, number, capacity, status, location, mesero_id, current_order_id, \
         created_at, updated_at FROM mesas WHERE id = ?",
    )
    .bind(data.mesa_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| RepoError::NotFound(format!("Mesa {} not found", data.mesa_id)))?;

    if mesa.current_order_id.is_some() {
        return Err(RepoError::InvalidState(format!(
            "Mesa {} already has an open order",
            mesa.number
        )));
    }
    if mesa.status == TableStatus::Maintenance {
        return Err(RepoError::InvalidState(format!(
            "Mesa {} is under maintenance",
            mesa.number
        )));
    }

    // Order row goes in first so line items can reference it; the total
    // is filled in once all lines are priced
    sqlx::query(
        "INSERT INTO orders (id, mesa_id, user_id, diners, total, status, note, created_at) \
         VALUES (?, ?, ?, ?, 0, 'ACTIVE', ?, ?)",
    )
    .bind(order_id)
    .bind(data.mesa_id)
    .bind(user_id)
    .bind(data.diners)
    .bind(&data.note)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let mut total = 0.0_f64;
    for line in &data.items {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"
        ))
        .bind(line.product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Product {} not found", line.product_id)))?;

        if !product.is_available {
            return Err(RepoError::InvalidState(format!(
                "Product '{}' is not available",
                product.name
            )));
        }

        if stock_control {
            // Guarded decrement: the WHERE clause enforces the stock floor
            let rows = sqlx::query(
                "UPDATE products SET stock = stock - ?1, updated_at = ?2 \
                 WHERE id = ?3 AND stock >= ?1",
            )
            .bind(line.quantity)
            .bind(now)
            .bind(line.product_id)
            .execute(&mut *tx)
            .await?;
            if rows.rows_affected() == 0 {
                return Err(RepoError::Constraint(format!(
                    "Insufficient stock for '{}'",
                    product.name
                )));
            }
            inventory::record_movement(
                &mut tx,
                line.product_id,
                MovementType::Outflow,
                line.quantity,
                "order",
                Some(order_id),
                Some(user_id),
            )
            .await?;
        }

        // Name and price are snapshots; later product edits never touch them
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, product_name, quantity, \
             unit_price, note, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(order_id)
        .bind(line.product_id)
        .bind(&product.name)
        .bind(line.quantity)
        .bind(product.price)
        .bind(&line.note)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        total += line.quantity as f64 * product.price;
    }

    sqlx::query("UPDATE orders SET total = ? WHERE id = ?")
        .bind(total)
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "UPDATE mesas SET status = 'OCCUPIED', current_order_id = ?, updated_at = ? WHERE id = ?",
    )
    .bind(order_id)
    .bind(now)
    .bind(data.mesa_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    find_detail(pool, order_id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create order".into()))
}

/// Pay an order with a single method or a per-diner split breakdown.
pub async fn pay(pool: &SqlitePool, id: i64, data: &OrderPay) -> RepoResult<OrderDetail> {
    let now = now_millis();
    let mut tx = pool.begin().await?;
    let order = active_order(&mut tx, id).await?;

    let method = match &data.splits {
        Some(splits) if !splits.is_empty() => {
            if splits.iter().any(|s| s.amount <= 0.0) {
                return Err(RepoError::Validation(
                    "Split amounts must be positive".into(),
                ));
            }
            if splits.iter().any(|s| s.diner_index < 1) {
                return Err(RepoError::Validation(
                    "Split diner_index must be at least 1".into(),
                ));
            }
            let sum: f64 = splits.iter().map(|s| s.amount).sum();
            if (sum - order.total).abs() > PAYMENT_EPSILON {
                return Err(RepoError::Validation(format!(
                    "Split amounts sum to {sum} but the order total is {}",
                    order.total
                )));
            }
            for split in splits {
                let split_method = split
                    .method
                    .or(data.method)
                    .unwrap_or(PaymentMethod::Efectivo);
                sqlx::query(
                    "INSERT INTO order_payments (order_id, diner_index, amount, method, \
                     created_at) VALUES (?, ?, ?, ?, ?)",
                )
                .bind(id)
                .bind(split.diner_index)
                .bind(split.amount)
                .bind(split_method)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
            // Order row carries the first split's method as the headline
            splits[0]
                .method
                .or(data.method)
                .unwrap_or(PaymentMethod::Efectivo)
        }
        _ => data.method.ok_or_else(|| {
            RepoError::Validation("Either a payment method or splits are required".into())
        })?,
    };

    sqlx::query(
        "UPDATE orders SET status = 'PAID', payment_method = ?, note = ?, closed_at = ? \
         WHERE id = ?",
    )
    .bind(method)
    .bind(merge_note(&order.note, &data.note))
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    release_mesa(&mut tx, order.mesa_id, now).await?;
    tx.commit().await?;

    find_detail(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Order {id} not found")))
}

/// Cancel an order, restoring stock for every non-cancelled line.
pub async fn cancel(
    pool: &SqlitePool,
    id: i64,
    data: &OrderCancel,
    user_id: i64,
    stock_control: bool,
) -> RepoResult<OrderDetail> {
    let now = now_millis();
    let mut tx = pool.begin().await?;
    let order = active_order(&mut tx, id).await?;

    if stock_control {
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT id, order_id, product_id, product_name, quantity, unit_price, status, \
             note, is_cancelled, created_at FROM order_items \
             WHERE order_id = ? AND is_cancelled = 0",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
        for item in &items {
            restore_stock(&mut tx, item, "cancellation", user_id, now).await?;
        }
    }

    sqlx::query("UPDATE orders SET status = 'CANCELLED', note = ?, closed_at = ? WHERE id = ?")
        .bind(merge_note(&order.note, &data.note))
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

    release_mesa(&mut tx, order.mesa_id, now).await?;
    tx.commit().await?;

    find_detail(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Order {id} not found")))
}

/// Move a line item forward through the kitchen flow.
pub async fn update_item_status(
    pool: &SqlitePool,
    order_id: i64,
    item_id: i64,
    new_status: LineItemStatus,
) -> RepoResult<OrderItem> {
    let mut tx = pool.begin().await?;
    active_order(&mut tx, order_id).await?;
    let item = fetch_item(&mut tx, order_id, item_id).await?;

    if item.is_cancelled {
        return Err(RepoError::InvalidState(format!(
            "Line item {item_id} is cancelled"
        )));
    }
    if new_status.sequence() <= item.status.sequence() {
        return Err(RepoError::InvalidState(
            "Line status can only move forward".into(),
        ));
    }

    sqlx::query("UPDATE order_items SET status = ? WHERE id = ?")
        .bind(new_status)
        .bind(item_id)
        .execute(&mut *tx)
        .await?;
    let updated = fetch_item(&mut tx, order_id, item_id).await?;
    tx.commit().await?;
    Ok(updated)
}

/// Cancel a single line item, restore its stock and recompute the total.
pub async fn cancel_item(
    pool: &SqlitePool,
    order_id: i64,
    item_id: i64,
    data: &OrderItemCancel,
    user_id: i64,
    stock_control: bool,
) -> RepoResult<OrderDetail> {
    let now = now_millis();
    let mut tx = pool.begin().await?;
    active_order(&mut tx, order_id).await?;
    let item = fetch_item(&mut tx, order_id, item_id).await?;

    if item.is_cancelled {
        return Err(RepoError::InvalidState(format!(
            "Line item {item_id} is already cancelled"
        )));
    }

    sqlx::query("UPDATE order_items SET is_cancelled = 1, note = COALESCE(?, note) WHERE id = ?")
        .bind(&data.reason)
        .bind(item_id)
        .execute(&mut *tx)
        .await?;

    if stock_control {
        restore_stock(&mut tx, &item, "item_cancellation", user_id, now).await?;
    }

    // Cancelled lines drop out of the total immediately
    sqlx::query(
        "UPDATE orders SET total = (SELECT COALESCE(SUM(quantity * unit_price), 0) \
         FROM order_items WHERE order_id = ?1 AND is_cancelled = 0) WHERE id = ?1",
    )
    .bind(order_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    find_detail(pool, order_id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Order {order_id} not found")))
}

/// List orders with filters, partitioned into active and history.
pub async fn find_all(pool: &SqlitePool, query: &OrderQuery) -> RepoResult<OrderList> {
    let mut sql = META_SELECT.to_string();
    let mut conds: Vec<&str> = Vec::new();
    if query.status.is_some() {
        conds.push("o.status = ?");
    }
    if query.from.is_some() {
        conds.push("o.created_at >= ?");
    }
    if query.to.is_some() {
        conds.push("o.created_at <= ?");
    }
    if query.q.is_some() {
        conds.push(
            "(CAST(o.id AS TEXT) LIKE ? OR CAST(m.number AS TEXT) LIKE ? OR u.name LIKE ?)",
        );
    }
    if !conds.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conds.join(" AND "));
    }
    sql.push_str(" ORDER BY o.created_at DESC LIMIT ?");

    let mut stmt = sqlx::query_as::<_, OrderWithMeta>(&sql);
    if let Some(status) = query.status {
        stmt = stmt.bind(status);
    }
    if let Some(from) = query.from {
        stmt = stmt.bind(from);
    }
    if let Some(to) = query.to {
        stmt = stmt.bind(to);
    }
    if let Some(text) = &query.q {
        let pattern = format!("%{}%", text.trim());
        stmt = stmt.bind(pattern.clone()).bind(pattern.clone()).bind(pattern);
    }
    stmt = stmt.bind(query.limit.unwrap_or(200).clamp(1, 1000));

    let rows = stmt.fetch_all(pool).await?;

    let mut active = Vec::new();
    let mut history = Vec::new();
    for order in rows {
        let items = load_items(pool, order.id).await?;
        let payments = load_payments(pool, order.id).await?;
        let detail = OrderDetail {
            order,
            items,
            payments,
        };
        if detail.order.status == OrderStatus::Active {
            active.push(detail);
        } else {
            history.push(detail);
        }
    }
    Ok(OrderList { active, history })
}

/// Full order detail: joined row plus line items and split payments.
pub async fn find_detail(pool: &SqlitePool, id: i64) -> RepoResult<Option<OrderDetail>> {
    let order = sqlx::query_as::<_, OrderWithMeta>(&format!("{META_SELECT} WHERE o.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    let Some(order) = order else {
        return Ok(None);
    };
    let items = load_items(pool, id).await?;
    let payments = load_payments(pool, id).await?;
    Ok(Some(OrderDetail {
        order,
        items,
        payments,
    }))
}

// ── Internal helpers ────────────────────────────────────────────────

/// Fetch an order and require it to be ACTIVE.
async fn active_order(conn: &mut SqliteConnection, id: i64) -> RepoResult<Order> {
    let order = sqlx::query_as::<_, Order>(
        "SELECT id, mesa_id, user_id, diners, total, status, payment_method, note, \
         created_at, closed_at FROM orders WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| RepoError::NotFound(format!("Order {id} not found")))?;
    if order.status != OrderStatus::Active {
        return Err(RepoError::InvalidState(format!("Order {id} is not active")));
    }
    Ok(order)
}

async fn fetch_item(
    conn: &mut SqliteConnection,
    order_id: i64,
    item_id: i64,
) -> RepoResult<OrderItem> {
    sqlx::query_as::<_, OrderItem>(
        "SELECT id, order_id, product_id, product_name, quantity, unit_price, status, note, \
         is_cancelled, created_at FROM order_items WHERE id = ? AND order_id = ?",
    )
    .bind(item_id)
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| {
        RepoError::NotFound(format!("Line item {item_id} not found in order {order_id}"))
    })
}

/// Return a line's quantity to stock with a matching INFLOW movement.
async fn restore_stock(
    conn: &mut SqliteConnection,
    item: &OrderItem,
    reason: &str,
    user_id: i64,
    now: i64,
) -> RepoResult<()> {
    sqlx::query("UPDATE products SET stock = stock + ?, updated_at = ? WHERE id = ?")
        .bind(item.quantity)
        .bind(now)
        .bind(item.product_id)
        .execute(&mut *conn)
        .await?;
    inventory::record_movement(
        conn,
        item.product_id,
        MovementType::Inflow,
        item.quantity,
        reason,
        Some(item.order_id),
        Some(user_id),
    )
    .await
}

/// Free the mesa after an order reaches a terminal state.
async fn release_mesa(conn: &mut SqliteConnection, mesa_id: i64, now: i64) -> RepoResult<()> {
    sqlx::query(
        "UPDATE mesas SET status = 'AVAILABLE', mesero_id = NULL, current_order_id = NULL, \
         updated_at = ? WHERE id = ?",
    )
    .bind(now)
    .bind(mesa_id)
    .execute(conn)
    .await?;
    Ok(())
}

async fn load_items(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<OrderItem>> {
    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT id, order_id, product_id, product_name, quantity, unit_price, status, note, \
         is_cancelled, created_at FROM order_items WHERE order_id = ? ORDER BY id",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(items)
}

async fn load_payments(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<OrderPayment>> {
    let payments = sqlx::query_as::<_, OrderPayment>(
        "SELECT id, order_id, diner_index, amount, method, created_at \
         FROM order_payments WHERE order_id = ? ORDER BY diner_index, id",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(payments)
}

/// Append a new note to the existing one, never overwriting.
fn merge_note(existing: &Option<String>, incoming: &Option<String>) -> Option<String> {
    match (existing, incoming) {
        (Some(old), Some(new)) if !new.trim().is_empty() => Some(format!("{old}\n{new}")),
        (None, Some(new)) if !new.trim().is_empty() => Some(new.clone()),
        (old, _) => old.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_note_appends_without_overwriting() {
        assert_eq!(merge_note(&None, &None), None);
        assert_eq!(
            merge_note(&Some("sin cebolla".into()), &None),
            Some("sin cebolla".into())
        );
        assert_eq!(
            merge_note(&None, &Some("paid at the bar".into())),
            Some("paid at the bar".into())
        );
        assert_eq!(
            merge_note(&Some("sin cebolla".into()), &Some("paid at the bar".into())),
            Some("sin cebolla\npaid at the bar".into())
        );
        assert_eq!(
            merge_note(&Some("keep".into()), &Some("   ".into())),
            Some("keep".into())
        );
    }
}
