//! Product Repository
//!
//! Stock changes never happen here directly except at creation; every
//! later change goes through the inventory repository so the movement
//! ledger stays complete.

use super::{RepoError, RepoResult};
use shared::models::{MovementType, Product, ProductCreate, ProductUpdate};
use shared::util::now_millis;
use sqlx::SqlitePool;

const COLUMNS: &str = "id, code, name, description, price, category, prep_minutes, image_url, \
                       is_available, stock, stock_min, created_at, updated_at";

pub async fn find_all(
    pool: &SqlitePool,
    category: Option<&str>,
    available_only: bool,
) -> RepoResult<Vec<Product>> {
    let mut sql = format!("SELECT {COLUMNS} FROM products");
    let mut clauses: Vec<&str> = Vec::new();
    if category.is_some() {
        clauses.push("category = ?");
    }
    if available_only {
        clauses.push("is_available = 1");
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY category, name");

    let mut query = sqlx::query_as::<_, Product>(&sql);
    if let Some(cat) = category {
        query = query.bind(cat);
    }
    let products = query.fetch_all(pool).await?;
    Ok(products)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Product>> {
    let product =
        sqlx::query_as::<_, Product>(&format!("SELECT {COLUMNS} FROM products WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(product)
}

pub async fn create(
    pool: &SqlitePool,
    data: &ProductCreate,
    user_id: Option<i64>,
) -> RepoResult<Product> {
    if data.price < 0.0 {
        return Err(RepoError::Validation("Price must not be negative".into()));
    }
    if data.stock < 0 || data.stock_min < 0 {
        return Err(RepoError::Validation(
            "Stock and stock_min must not be negative".into(),
        ));
    }

    let now = now_millis();
    let mut tx = pool.begin().await?;

    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO products (code, name, description, price, category, prep_minutes, \
         image_url, is_available, stock, stock_min, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(&data.code)
    .bind(&data.name)
    .bind(&data.description)
    .bind(data.price)
    .bind(&data.category)
    .bind(data.prep_minutes)
    .bind(&data.image_url)
    .bind(data.is_available)
    .bind(data.stock)
    .bind(data.stock_min)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| match RepoError::from(e) {
        RepoError::Duplicate(_) => RepoError::Duplicate(format!(
            "Product code '{}' already exists",
            data.code.as_deref().unwrap_or("")
        )),
        other => other,
    })?;

    // Opening stock gets its own ledger row so the movement history
    // reconstructs the current level exactly
    if data.stock > 0 {
        super::inventory::record_movement(
            &mut tx,
            id,
            MovementType::Inflow,
            data.stock,
            "initial stock",
            None,
            user_id,
        )
        .await?;
    }

    tx.commit().await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create product".into()))
}

pub async fn update(pool: &SqlitePool, id: i64, data: &ProductUpdate) -> RepoResult<Product> {
    if let Some(price) = data.price
        && price < 0.0
    {
        return Err(RepoError::Validation("Price must not be negative".into()));
    }
    if let Some(stock_min) = data.stock_min
        && stock_min < 0
    {
        return Err(RepoError::Validation(
            "stock_min must not be negative".into(),
        ));
    }

    let rows = sqlx::query(
        "UPDATE products SET code = COALESCE(?1, code), name = COALESCE(?2, name), \
         description = COALESCE(?3, description), price = COALESCE(?4, price), \
         category = COALESCE(?5, category), prep_minutes = COALESCE(?6, prep_minutes), \
         image_url = COALESCE(?7, image_url), is_available = COALESCE(?8, is_available), \
         stock_min = COALESCE(?9, stock_min), updated_at = ?10 WHERE id = ?11",
    )
    .bind(&data.code)
    .bind(&data.name)
    .bind(&data.description)
    .bind(data.price)
    .bind(&data.category)
    .bind(data.prep_minutes)
    .bind(&data.image_url)
    .bind(data.is_available)
    .bind(data.stock_min)
    .bind(now_millis())
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| match RepoError::from(e) {
        RepoError::Duplicate(_) => RepoError::Duplicate("Product code already exists".into()),
        other => other,
    })?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Product {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Product {id} not found")))
}

pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Product {id} not found")))?;

    // Order lines keep a snapshot but still reference the product row
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM order_items WHERE product_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Err(RepoError::Validation(
            "Cannot delete a product referenced by orders; mark it unavailable instead".into(),
        ));
    }

    sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(true)
}

/// Distinct category list for menu grouping
pub async fn categories(pool: &SqlitePool) -> RepoResult<Vec<String>> {
    let cats =
        sqlx::query_scalar::<_, String>("SELECT DISTINCT category FROM products ORDER BY category")
            .fetch_all(pool)
            .await?;
    Ok(cats)
}
