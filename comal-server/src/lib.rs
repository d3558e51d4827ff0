//! Comal Server - taquería point-of-sale backend
//!
//! Single-process HTTP server over an embedded SQLite store.
//!
//! # Module structure
//!
//! ```text
//! comal-server/src/
//! ├── core/     # configuration, shared state, HTTP server
//! ├── auth/     # JWT, password hashing, middleware
//! ├── audit/    # tamper-evident audit trail
//! ├── api/      # routes and handlers
//! ├── db/       # pool, migrations, repositories
//! ├── common/   # logging setup
//! └── utils/    # error types and response envelope
//! ```

pub mod api;
pub mod audit;
pub mod auth;
pub mod common;
pub mod core;
pub mod db;
pub mod utils;

// Re-export public types
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use utils::{AppError, AppResponse, AppResult};

// Re-export logger functions
pub use common::{cleanup_old_logs, init_logger, init_logger_with_file};

/// Security event logging, all entries land on the `security` target.
#[macro_export]
macro_rules! security_log {
    ($level:ident, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::event!(
            target: "security",
            tracing::Level::$level,
            event = $event,
            $($key = %$value),*
        );
    };
}

/// Load `.env`, read the configuration and initialize logging.
pub fn setup_environment() -> anyhow::Result<Config> {
    dotenv::dotenv().ok();
    let config = Config::from_env();
    init_logger_with_file(&config.log_level, config.log_json, Some(&config.log_dir))?;
    Ok(config)
}

pub fn print_banner() {
    println!(
        r#"
   ______                      __
  / ____/___  ____ ___  ____ _/ /
 / /   / __ \/ __ `__ \/ __ `/ /
/ /___/ /_/ / / / / / / /_/ / /
\____/\____/_/ /_/ /_/\__,_/_/
    "#
    );
}
