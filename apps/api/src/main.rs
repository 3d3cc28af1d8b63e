mod ai;
mod auth;
mod config;
mod errors;
mod llm_client;
mod models;
mod photos;
mod routes;
mod state;
mod travel;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::{AuthBackend, SupabaseAuth};
use crate::config::Config;
use crate::llm_client::{http_client, ProviderChain};
use crate::photos::PhotoEnricher;
use crate::routes::build_router;
use crate::state::AppState;

const AUTH_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting TravelMind API v{}", env!("CARGO_PKG_VERSION"));

    // Provider chain: Groq -> Hugging Face -> Gemini, whichever keys are set
    let llm = ProviderChain::from_config(&config)?;

    // Photo sources: Google Places -> Unsplash -> placeholder
    let photos = Arc::new(PhotoEnricher::from_config(&config)?);

    // Accounts (optional)
    let auth: Option<Arc<dyn AuthBackend>> = match &config.supabase {
        Some(supabase) => {
            info!("Supabase auth enabled ({})", supabase.url);
            Some(Arc::new(SupabaseAuth::new(
                http_client(AUTH_HTTP_TIMEOUT)?,
                supabase,
            )))
        }
        None => {
            warn!("SUPABASE_URL / SUPABASE_SERVICE_ROLE_KEY not set; /api/auth routes are disabled");
            None
        }
    };

    let state = AppState {
        config: config.clone(),
        llm,
        photos,
        auth,
    };

    let app = build_router(state)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
