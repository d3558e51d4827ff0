//! Mesa Repository (restaurant tables)

use super::{RepoError, RepoResult};
use shared::models::{Mesa, MesaCreate, MesaUpdate, MesaWithMesero, TableStatus};
use shared::util::now_millis;
use sqlx::SqlitePool;

const COLUMNS: &str =
    "id, number, capacity, status, location, mesero_id, current_order_id, created_at, updated_at";

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<MesaWithMesero>> {
    let mesas = sqlx::query_as::<_, MesaWithMesero>(
        "SELECT m.id, m.number, m.capacity, m.status, m.location, m.mesero_id, \
         u.name AS mesero_name, m.current_order_id, m.created_at, m.updated_at \
         FROM mesas m LEFT JOIN users u ON u.id = m.mesero_id \
         ORDER BY m.number",
    )
    .fetch_all(pool)
    .await?;
    Ok(mesas)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Mesa>> {
    let mesa = sqlx::query_as::<_, Mesa>(&format!("SELECT {COLUMNS} FROM mesas WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(mesa)
}

pub async fn create(pool: &SqlitePool, data: &MesaCreate) -> RepoResult<Mesa> {
    if let Some(capacity) = data.capacity
        && capacity < 1
    {
        return Err(RepoError::Validation("Capacity must be at least 1".into()));
    }

    let now = now_millis();
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO mesas (number, capacity, location, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(data.number)
    .bind(data.capacity.unwrap_or(4))
    .bind(&data.location)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(|e| match RepoError::from(e) {
        RepoError::Duplicate(_) => {
            RepoError::Duplicate(format!("Mesa number {} already exists", data.number))
        }
        other => other,
    })?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create mesa".into()))
}

pub async fn update(pool: &SqlitePool, id: i64, data: &MesaUpdate) -> RepoResult<Mesa> {
    if let Some(capacity) = data.capacity
        && capacity < 1
    {
        return Err(RepoError::Validation("Capacity must be at least 1".into()));
    }

    let rows = sqlx::query(
        "UPDATE mesas SET number = COALESCE(?1, number), capacity = COALESCE(?2, capacity), \
         location = COALESCE(?3, location), updated_at = ?4 WHERE id = ?5",
    )
    .bind(data.number)
    .bind(data.capacity)
    .bind(&data.location)
    .bind(now_millis())
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| match RepoError::from(e) {
        RepoError::Duplicate(_) => RepoError::Duplicate("Mesa number already exists".into()),
        other => other,
    })?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Mesa {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Mesa {id} not found")))
}

/// Change the mesa status.
///
/// Moving to AVAILABLE clears the assigned mesero and the active order
/// reference. Rejected while the mesa still has an open order.
pub async fn set_status(pool: &SqlitePool, id: i64, status: TableStatus) -> RepoResult<Mesa> {
    let mesa = find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Mesa {id} not found")))?;

    if mesa.current_order_id.is_some() && status != TableStatus::Occupied {
        return Err(RepoError::InvalidState(format!(
            "Mesa {} has an open order",
            mesa.number
        )));
    }

    if status == TableStatus::Available {
        sqlx::query(
            "UPDATE mesas SET status = ?, mesero_id = NULL, current_order_id = NULL, \
             updated_at = ? WHERE id = ?",
        )
        .bind(status)
        .bind(now_millis())
        .bind(id)
        .execute(pool)
        .await?;
    } else {
        sqlx::query("UPDATE mesas SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(now_millis())
            .bind(id)
            .execute(pool)
            .await?;
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Mesa {id} not found")))
}

/// Assign a mesero to the mesa, or unassign with `None`.
///
/// The target user must be active and hold the mesero or admin role.
/// Assignment never touches the mesa status.
pub async fn assign_mesero(
    pool: &SqlitePool,
    id: i64,
    mesero_id: Option<i64>,
) -> RepoResult<Mesa> {
    if let Some(uid) = mesero_id {
        let eligible = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE id = ? AND is_active = 1 \
             AND role IN ('mesero', 'admin')",
        )
        .bind(uid)
        .fetch_one(pool)
        .await?;
        if eligible == 0 {
            return Err(RepoError::Validation(format!(
                "User {uid} is not an active mesero"
            )));
        }
    }

    let rows = sqlx::query("UPDATE mesas SET mesero_id = ?, updated_at = ? WHERE id = ?")
        .bind(mesero_id)
        .bind(now_millis())
        .bind(id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Mesa {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Mesa {id} not found")))
}

pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let mesa = find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Mesa {id} not found")))?;
    if mesa.current_order_id.is_some() {
        return Err(RepoError::InvalidState(format!(
            "Mesa {} has an open order",
            mesa.number
        )));
    }

    // Check for order history referencing this mesa
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE mesa_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Err(RepoError::Validation(
            "Cannot delete a mesa with order history".into(),
        ));
    }

    sqlx::query("DELETE FROM mesas WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(true)
}
