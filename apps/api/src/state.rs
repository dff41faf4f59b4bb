use std::sync::Arc;

use sqlx::PgPool;

use crate::broker::Broker;
use crate::config::Config;
use crate::model_client::ModelClient;
use crate::orchestrator::CancellationRegistry;
use crate::progress::ProgressHub;
use crate::store::Store;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub store: Arc<dyn Store>,
    pub broker: Arc<dyn Broker>,
    pub model_client: Arc<dyn ModelClient>,
    pub progress: Arc<ProgressHub>,
    pub cancellation: CancellationRegistry,
    pub config: Config,
}
