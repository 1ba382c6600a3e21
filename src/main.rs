//! Intel Terminal: binary entrypoint
//! Loads the uplink config, wires the Gemini backend and serves the dashboard API.

use std::sync::Arc;

use intel_terminal::upstream::{DynBackend, GeminiBackend};
use intel_terminal::UplinkConfig;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default; JSON lines when UPLINK_LOG_FORMAT=json.
/// A subscriber installed by the runtime wins; ours is then skipped.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("intel_terminal=info,warn"));

    let json = std::env::var("UPLINK_LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = UplinkConfig::load()?;
    let backend: DynBackend =
        Arc::new(GeminiBackend::from_config(&cfg).map_err(anyhow::Error::from)?);

    let app = intel_terminal::app(&cfg, backend)?;
    app.orchestrator.start();

    Ok(app.router.into())
}
