use crate::auth::JwtConfig;

/// Server configuration
///
/// # Environment variables
///
/// Every item can be overridden through the environment:
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | HOST | 0.0.0.0 | Bind address |
/// | PORT | 3000 | HTTP port |
/// | DATABASE_PATH | data/comal.db | SQLite database file |
/// | LOG_LEVEL | info | Tracing filter (e.g. `info`, `comal_server=debug`) |
/// | LOG_JSON | false | JSON log output instead of pretty |
/// | LOG_DIR | logs | Directory for rotating log files |
/// | ENVIRONMENT | development | development \| staging \| production |
/// | STOCK_CONTROL | true | Enforce stock decrement/restore on orders |
/// | AUDIT_BUFFER | 256 | Audit channel capacity |
/// | SHUTDOWN_TIMEOUT_MS | 10000 | Graceful shutdown window |
///
/// JWT settings (`JWT_SECRET`, `JWT_EXPIRATION_MINUTES`, `JWT_ISSUER`,
/// `JWT_AUDIENCE`) are read by [`JwtConfig`].
///
/// # Example
///
/// ```ignore
/// DATABASE_PATH=/data/comal.db PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Path of the SQLite database file
    pub db_path: String,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: String,
    /// development | staging | production
    pub environment: String,
    /// When false, orders neither decrement nor restore product stock
    pub stock_control: bool,
    /// Capacity of the audit mpsc channel
    pub audit_buffer: usize,
    pub shutdown_timeout_ms: u64,
    pub jwt: JwtConfig,
}

impl Config {
    /// Load configuration from the environment, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            db_path: std::env::var("DATABASE_PATH").unwrap_or_else(|_| "data/comal.db".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: std::env::var("LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            log_dir: std::env::var("LOG_DIR").unwrap_or_else(|_| "logs".into()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            stock_control: std::env::var("STOCK_CONTROL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            audit_buffer: std::env::var("AUDIT_BUFFER")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(256),
            shutdown_timeout_ms: std::env::var("SHUTDOWN_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10000),
            jwt: JwtConfig::default(),
        }
    }

    /// Override the database path and port, for tests
    pub fn with_overrides(db_path: impl Into<String>, port: u16) -> Self {
        let mut config = Self::from_env();
        config.db_path = db_path.into();
        config.port = port;
        config
    }

    /// Create the directory holding the database file, if any
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        if let Some(parent) = std::path::Path::new(&self.db_path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
