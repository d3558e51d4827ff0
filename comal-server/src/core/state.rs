use std::sync::Arc;
use std::time::Instant;

use crate::audit::{AuditService, AuditWorker};
use crate::auth::JwtService;
use crate::core::Config;
use crate::db::DbService;
use crate::utils::AppError;

/// Shared server state, one instance cloned into every handler
///
/// Cheap to clone: every service is behind an `Arc` or a pool handle.
///
/// | Field | Meaning |
/// |-------|---------|
/// | config | Immutable configuration |
/// | db | SQLite pool + migrations |
/// | jwt_service | Token generation/validation |
/// | audit | Tamper-evident audit trail |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub db: DbService,
    jwt_service: Arc<JwtService>,
    audit: Arc<AuditService>,
    started_at: Instant,
}

impl ServerState {
    /// Initialize all services
    ///
    /// Order matters: directories, then database (runs migrations), then
    /// the services that borrow the pool. The audit worker task is spawned
    /// here so `audit.log()` works as soon as the state exists.
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        config
            .ensure_directories()
            .map_err(|e| AppError::internal(format!("Failed to create data directory: {e}")))?;

        let db = DbService::new(&config.db_path).await?;
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));

        let (audit, audit_rx) = AuditService::new(db.pool.clone(), config.audit_buffer);
        tokio::spawn(AuditWorker::new(audit.storage().clone()).run(audit_rx));

        Ok(Self {
            config: config.clone(),
            db,
            jwt_service,
            audit,
            started_at: Instant::now(),
        })
    }

    pub fn pool(&self) -> &sqlx::SqlitePool {
        &self.db.pool
    }

    pub fn jwt_service(&self) -> &JwtService {
        &self.jwt_service
    }

    pub fn audit(&self) -> &AuditService {
        &self.audit
    }

    /// Seconds since this state was created
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
