//! Career Copilot server.
//!
//! Loads configuration, the skill taxonomy and the course catalog, wires the
//! guidance pipeline to its collaborators, and serves the HTTP API.

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use thiserror::Error;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use career_copilot::adapters::ai::{OpenAIConfig, OpenAIProvider};
use career_copilot::adapters::catalog::{load_taxonomy_file, CsvCatalogSource};
use career_copilot::adapters::http::{guidance_router, GuidanceAppState};
use career_copilot::adapters::storage::{FileConversationStore, InMemoryConversationStore};
use career_copilot::application::handlers::guidance::{
    load_snapshot, short_version, GuidancePipeline, HandleCvHandler, HandleMessageHandler,
    ReloadCatalogHandler,
};
use career_copilot::config::{AiConfig, AiProvider, AppConfig, ConfigError, StoreKind};
use career_copilot::domain::catalog::CatalogHandle;
use career_copilot::ports::{AIError, AIProvider as LanguageModel, CatalogLoadError, ConversationStore};

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("catalog: {0}")]
    Catalog(#[from] CatalogLoadError),

    #[error("language model provider: {0}")]
    Provider(#[from] AIError),

    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate().map_err(ConfigError::from)?;

    let taxonomy = Arc::new(load_taxonomy_file(&config.catalog.taxonomy_path).await?);
    let source = Arc::new(CsvCatalogSource::new(&config.catalog.path));
    let snapshot = load_snapshot(source.as_ref(), &taxonomy, config.retrieval.embedding_dims).await?;
    info!(
        version = %short_version(&snapshot.version),
        courses = snapshot.index.len(),
        dropped_rows = snapshot.dropped_rows,
        skills = taxonomy.skills().count(),
        roles = taxonomy.roles().count(),
        "catalog loaded"
    );
    let catalog = Arc::new(CatalogHandle::new(snapshot));

    let ai = build_provider(&config.ai)?;
    let store: Arc<dyn ConversationStore> = match config.conversation.store {
        StoreKind::Memory => Arc::new(InMemoryConversationStore::new()),
        StoreKind::File => Arc::new(FileConversationStore::new(&config.conversation.store_dir)),
    };

    let pipeline = Arc::new(GuidancePipeline::new(
        ai,
        store,
        taxonomy.clone(),
        catalog.clone(),
        config.guidance_settings(),
    ));
    let state = GuidanceAppState::new(
        Arc::new(HandleMessageHandler::new(pipeline.clone())),
        Arc::new(HandleCvHandler::new(pipeline)),
        Arc::new(ReloadCatalogHandler::new(
            source,
            taxonomy,
            catalog.clone(),
            config.retrieval.embedding_dims,
        )),
        catalog,
    );

    let app = build_app(state, &config);
    let addr = config.server.socket_addr().map_err(ConfigError::from)?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, environment = ?config.server.environment, "career copilot listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    }
}

fn build_provider(config: &AiConfig) -> Result<Arc<dyn LanguageModel>, AIError> {
    let key = config.api_key().unwrap_or_default();
    let mut provider_config = match config.provider {
        AiProvider::Groq => OpenAIConfig::groq(key),
        AiProvider::OpenAI => OpenAIConfig::new(key),
    };
    if let Some(base_url) = &config.base_url {
        provider_config = provider_config.with_base_url(base_url.as_str());
    }
    if let Some(model) = &config.model {
        provider_config = provider_config.with_model(model.as_str());
    }
    let provider_config = provider_config
        .with_timeout(config.timeout())
        .with_max_retries(config.max_retries);

    info!(
        provider = %provider_config.provider,
        model = %provider_config.model,
        "language model configured"
    );
    Ok(Arc::new(OpenAIProvider::new(provider_config)?))
}

fn build_app(state: GuidanceAppState, config: &AppConfig) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    guidance_router()
        .with_state(state)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(cors_layer(&config.server.cors_origins_list()))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
}

/// No configured origins allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return base.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(parsed))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}
