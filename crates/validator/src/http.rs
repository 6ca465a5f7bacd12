//! `/healthz` and `/metrics` endpoints (spec §4.I).

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use certen_orchestrator::{health_check, OrchestratorStore};
use prometheus::{Encoder, IntGauge, Registry, TextEncoder};
use serde::Serialize;
use std::sync::Arc;

pub struct Metrics {
    pub registry: Registry,
    pub pending_artifacts: IntGauge,
    pub db_pool_size: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        let pending_artifacts =
            IntGauge::new("certen_pending_artifacts", "Artifacts not yet verified").unwrap();
        let db_pool_size =
            IntGauge::new("certen_db_pool_size", "Current database pool size").unwrap();
        registry
            .register(Box::new(pending_artifacts.clone()))
            .unwrap();
        registry.register(Box::new(db_pool_size.clone())).unwrap();
        Self {
            registry,
            pending_artifacts,
            db_pool_size,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: OrchestratorStore,
    pub metrics: Arc<Metrics>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    db_alive: bool,
    db_pool_size: u32,
    db_pool_idle: usize,
}

async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    let health = health_check(state.store.pool()).await;
    state.metrics.db_pool_size.set(health.size as i64);
    Json(HealthResponse {
        status: if health.alive { "ok" } else { "degraded" },
        db_alive: health.alive,
        db_pool_size: health.size,
        db_pool_idle: health.idle,
    })
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let families = state.metrics.registry.gather();
    let mut buf = Vec::new();
    encoder.encode(&families, &mut buf).ok();
    (
        [(axum::http::header::CONTENT_TYPE, encoder.format_type())],
        buf,
    )
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(state)
}
