//! Contract Compliance Server
//!
//! Serves the clause detection and risk scoring engine over HTTP:
//!
//! - Clause analysis of extracted document text
//! - Clause text suggestions (external generation with template fallback)
//! - Clause catalog listing
//!
//! Text extraction, report rendering, history and notifications live with
//! other services; this server only consumes text and returns analysis.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use compliance_engine::{
    ClauseCatalog, ClauseTextProvider, ComplianceEngine, GenerationPolicy, GeneratorConfig,
    OpenAiGenerator, SuggestionCache,
};
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod error;

/// Command-line arguments for the compliance server
#[derive(Parser, Debug)]
#[command(name = "compliance-server")]
#[command(about = "Contract clause detection and risk scoring server")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Rate limit: requests per second per IP
    #[arg(long, default_value = "10")]
    rate_limit: u32,

    /// JSON clause catalog (built-in catalog when omitted)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Timeout for each clause generation attempt in milliseconds
    #[arg(long, default_value = "15000")]
    generation_timeout_ms: u64,

    /// Retry a failed clause generation once before using the template
    #[arg(long)]
    retry_generation: bool,

    /// Bound the suggestion cache to this many entries (LRU eviction)
    #[arg(long)]
    cache_capacity: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ComplianceEngine>,
    pub suggestions: Arc<ClauseTextProvider>,
}

impl AppState {
    pub fn new(engine: ComplianceEngine, suggestions: ClauseTextProvider) -> Self {
        Self {
            engine: Arc::new(engine),
            suggestions: Arc::new(suggestions),
        }
    }
}

/// Wire the suggestion provider to the catalog, the cache and, when
/// configured, the external generator
fn build_suggestions(
    catalog: Arc<ClauseCatalog>,
    cache: SuggestionCache,
    policy: GenerationPolicy,
    config: &GeneratorConfig,
) -> ClauseTextProvider {
    let provider = ClauseTextProvider::new(catalog, Arc::new(cache)).with_policy(policy);

    if !config.is_configured() {
        info!("Clause generation not configured, using templates");
        return provider;
    }

    match OpenAiGenerator::new(config) {
        Ok(generator) => {
            info!("Clause generation enabled (model: {})", generator.model());
            provider.with_generator(Arc::new(generator))
        }
        Err(e) => {
            warn!("Clause generation unavailable, using templates: {}", e);
            provider
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Pick up OPENAI_API_KEY and friends from .env when present
    dotenvy::dotenv().ok();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting compliance server on {}:{}", args.host, args.port);

    // Load the clause catalog once; it is read-only from here on
    let catalog = match &args.catalog {
        Some(path) => {
            let catalog = ClauseCatalog::from_path(path)?;
            info!("Loaded {} clauses from {}", catalog.len(), path.display());
            Arc::new(catalog)
        }
        None => ClauseCatalog::builtin(),
    };

    let cache = match args.cache_capacity {
        Some(capacity) => SuggestionCache::with_capacity(capacity),
        None => SuggestionCache::unbounded(),
    };

    let policy = GenerationPolicy {
        timeout: Duration::from_millis(args.generation_timeout_ms),
        retry_once: args.retry_generation,
    };

    let suggestions = build_suggestions(
        Arc::clone(&catalog),
        cache,
        policy,
        &GeneratorConfig::from_env(),
    );

    let state = AppState::new(ComplianceEngine::new(catalog), suggestions);

    // Create rate limiter configuration
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(args.rate_limit.into())
            .burst_size(args.rate_limit * 2)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limit: {}", args.rate_limit))?,
    );

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = api::router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .layer(GovernorLayer {
                config: governor_conf,
            }),
    );

    // Start server
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Rate limit: {} requests/second per IP", args.rate_limit);
    info!("Generation timeout: {}ms", args.generation_timeout_ms);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
