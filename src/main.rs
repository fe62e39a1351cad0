//! TrivAI backend entrypoint wiring configuration, storage, generators and the REST API.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{Router, http::HeaderValue};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trivai_back::{
    config::{AppConfig, StorageSettings},
    dao::store::MemoryStore,
    routes,
    services::{
        generator::{FallbackGenerator, OpenAiGenerator, QuestionGenerator},
        google::ReqwestGoogleClient,
        session_service,
    },
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let generator = build_generator(&config)?;
    let google = Arc::new(ReqwestGoogleClient::default());
    let port = config.port;
    let storage = config.storage.clone();
    let cors = cors_layer(&config.cors_origins);

    let app_state = AppState::new(config, generator, google);
    start_storage(app_state.clone(), storage).await;
    session_service::spawn_sweeper(app_state.clone());

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state, cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Pick the language-model generator when a key is configured.
fn build_generator(config: &AppConfig) -> anyhow::Result<Arc<dyn QuestionGenerator>> {
    match config.generator.api_key.clone() {
        Some(api_key) => {
            let generator = OpenAiGenerator::new(&config.generator, api_key)
                .context("building question generator")?;
            info!(model = %config.generator.model, "using language-model question generator");
            Ok(Arc::new(generator))
        }
        None => {
            warn!("no generator API key configured; using built-in fallback content");
            Ok(Arc::new(FallbackGenerator))
        }
    }
}

/// Install the in-memory store, or supervise a MongoDB connection when one is configured.
async fn start_storage(state: SharedState, settings: StorageSettings) {
    let Some(uri) = settings.mongo_uri else {
        info!("no MONGO_URI configured; keeping users, games and scores in memory");
        state.install_store(Arc::new(MemoryStore::new())).await;
        return;
    };
    spawn_mongo_supervisor(state, uri, settings.mongo_db).await;
}

#[cfg(feature = "mongo-store")]
async fn spawn_mongo_supervisor(state: SharedState, uri: String, db_name: Option<String>) {
    use trivai_back::{
        dao::{
            storage::StorageError,
            store::{
                TrivaiStore,
                mongodb::{MongoConfig, MongoStore},
            },
        },
        services::storage_supervisor,
    };

    tokio::spawn(storage_supervisor::run(state, move || {
        let uri = uri.clone();
        let db_name = db_name.clone();
        async move {
            let config = MongoConfig::from_uri(&uri, db_name.as_deref()).await?;
            let store = MongoStore::connect(config).await?;
            Ok::<Arc<dyn TrivaiStore>, StorageError>(Arc::new(store))
        }
    }));
}

#[cfg(not(feature = "mongo-store"))]
async fn spawn_mongo_supervisor(state: SharedState, _uri: String, _db_name: Option<String>) {
    warn!("MONGO_URI is set but the mongo-store feature is disabled; using memory storage");
    state.install_store(Arc::new(MemoryStore::new())).await;
}

/// Allow the configured web origins, with credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(%origin, error = %err, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState, cors: CorsLayer) -> Router<()> {
    routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
