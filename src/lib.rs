// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod acquire;
pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod metrics;
pub mod model;
pub mod orchestrator;
pub mod parse;
pub mod retry;
pub mod upstream;

pub use crate::acquire::{AcquisitionClient, FeedSnapshot};
pub use crate::api::{router, AppState};
pub use crate::chat::ConversationSession;
pub use crate::config::UplinkConfig;
pub use crate::error::{ErrorKind, UplinkError};
pub use crate::orchestrator::{Cadence, RefreshOrchestrator};
pub use crate::retry::{with_retry, RetryPolicy};

use axum::Router;
use tracing::info;

use crate::chat::ChatOptions;
use crate::upstream::DynBackend;

/// Fully wired service. The refresh cycle is not running until
/// `orchestrator.start()` is called.
pub struct App {
    pub router: Router,
    pub orchestrator: RefreshOrchestrator,
}

/// Assemble acquisition, orchestration, chat and HTTP routes (with `/metrics`)
/// over one backend.
pub fn app(cfg: &UplinkConfig, backend: DynBackend) -> anyhow::Result<App> {
    let metrics = crate::metrics::Metrics::init()?;

    let client = AcquisitionClient::from_config(backend.clone(), cfg);
    let orchestrator = RefreshOrchestrator::new(client, cfg.refresh.cadence());
    let chat = ConversationSession::new(backend.clone(), ChatOptions::from_config(cfg));

    let router = api::router(AppState::new(orchestrator.clone(), chat)).merge(metrics.router());
    info!(backend = backend.name(), "intel terminal assembled");
    Ok(App {
        router,
        orchestrator,
    })
}
