//! User Repository (usuarios)
//!
//! Passwords arrive here already hashed. Hashing lives in the auth
//! module so the repository never sees plaintext.

use super::{RepoError, RepoResult};
use shared::models::{User, UserCreate, UserRole, UserUpdate};
use shared::util::now_millis;
use sqlx::SqlitePool;

const COLUMNS: &str =
    "id, name, username, password_hash, role, is_active, last_login_at, created_at, updated_at";

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<User>> {
    let users = sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users ORDER BY name"))
        .fetch_all(pool)
        .await?;
    Ok(users)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_by_username(pool: &SqlitePool, username: &str) -> RepoResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {COLUMNS} FROM users WHERE username = ? LIMIT 1"
    ))
    .bind(username)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn create(pool: &SqlitePool, data: &UserCreate, password_hash: &str) -> RepoResult<User> {
    let now = now_millis();
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO users (name, username, password_hash, role, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(&data.name)
    .bind(&data.username)
    .bind(password_hash)
    .bind(data.role)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(|e| match RepoError::from(e) {
        RepoError::Duplicate(_) => {
            RepoError::Duplicate(format!("Username '{}' already taken", data.username))
        }
        other => other,
    })?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create user".into()))
}

pub async fn update(
    pool: &SqlitePool,
    id: i64,
    data: &UserUpdate,
    password_hash: Option<&str>,
) -> RepoResult<User> {
    let existing = find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("User {id} not found")))?;

    // Last-admin guard: the system must always keep one active admin
    let demotes_admin = existing.role == UserRole::Admin
        && existing.is_active
        && (matches!(data.role, Some(r) if r != UserRole::Admin)
            || matches!(data.is_active, Some(false)));
    if demotes_admin && count_active_admins(pool).await? <= 1 {
        return Err(RepoError::InvalidState(
            "Cannot demote or deactivate the last active admin".into(),
        ));
    }

    let rows = sqlx::query(
        "UPDATE users SET name = COALESCE(?1, name), password_hash = COALESCE(?2, password_hash), \
         role = COALESCE(?3, role), is_active = COALESCE(?4, is_active), updated_at = ?5 \
         WHERE id = ?6",
    )
    .bind(&data.name)
    .bind(password_hash)
    .bind(data.role)
    .bind(data.is_active)
    .bind(now_millis())
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("User {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("User {id} not found")))
}

/// Record a successful login timestamp
pub async fn record_login(pool: &SqlitePool, id: i64) -> RepoResult<()> {
    sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
        .bind(now_millis())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

async fn count_active_admins(pool: &SqlitePool) -> RepoResult<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE role = 'admin' AND is_active = 1",
    )
    .fetch_one(pool)
    .await?;
    Ok(count)
}
