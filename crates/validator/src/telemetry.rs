//! Structured logging setup, matching the production binary's
//! `tracing-subscriber` layering (env-filter + fmt).

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub fn init() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "certen_validator=info,certen_orchestrator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
