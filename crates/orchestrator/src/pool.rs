//! Connection pool configuration and health reporting (spec §4.H, §6
//! Configuration: `database_{min,max}_conns`, `database_max_{idle,life}time_s`).

use crate::error::OrchestratorError;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Connection pool sizing and lifetime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub database_url: String,
    pub min_conns: u32,
    pub max_conns: u32,
    pub max_idletime_s: u64,
    pub max_lifetime_s: u64,
}

impl PoolConfig {
    /// Open a connection pool per this configuration.
    pub async fn connect(&self) -> Result<PgPool, OrchestratorError> {
        PgPoolOptions::new()
            .min_connections(self.min_conns)
            .max_connections(self.max_conns)
            .idle_timeout(Duration::from_secs(self.max_idletime_s))
            .max_lifetime(Duration::from_secs(self.max_lifetime_s))
            .connect(&self.database_url)
            .await
            .map_err(|e| OrchestratorError::Unavailable(format!("connecting pool: {e}")))
    }
}

/// Pool statistics plus a liveness ping, for the process's `/healthz`
/// endpoint (spec §4.I).
#[derive(Debug, Clone, Serialize)]
pub struct PoolHealth {
    pub size: u32,
    pub idle: usize,
    pub alive: bool,
}

/// Report pool stats and perform a liveness ping (`SELECT 1`).
pub async fn health_check(pool: &PgPool) -> PoolHealth {
    let alive = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await
        .is_ok();
    PoolHealth {
        size: pool.size(),
        idle: pool.num_idle(),
        alive,
    }
}

/// Apply every migration under `migrations/`, tracked in `schema_migrations`.
///
/// Each file is its own transaction and self-registers idempotently, so
/// this is also what a fresh `sqlx::migrate!` bookkeeping table expects:
/// sqlx tracks application separately in `_sqlx_migrations`, and the
/// `schema_migrations` inserts inside each file are this engine's own
/// human-readable record of the same fact (spec §4.H).
pub async fn run_migrations(pool: &PgPool) -> Result<(), OrchestratorError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| OrchestratorError::Unavailable(format!("running migrations: {e}")))
}
