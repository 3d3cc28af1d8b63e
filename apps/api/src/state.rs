use std::sync::Arc;

use crate::auth::AuthBackend;
use crate::config::Config;
use crate::llm_client::ProviderChain;
use crate::photos::PhotoEnricher;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub llm: ProviderChain,
    pub photos: Arc<PhotoEnricher>,
    /// `None` when Supabase is not configured; auth routes then answer 500.
    pub auth: Option<Arc<dyn AuthBackend>>,
}
