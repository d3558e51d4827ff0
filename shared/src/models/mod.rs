//! Data models
//!
//! Shared between comal-server and frontend (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY; orders use snowflake IDs).

pub mod inventory;
pub mod mesa;
pub mod order;
pub mod product;
pub mod user;

// Re-exports
pub use inventory::*;
pub use mesa::*;
pub use order::*;
pub use product::*;
pub use user::*;
