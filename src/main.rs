//! Family Game Back binary entrypoint wiring configuration, storage and the REST layer.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use family_game_back::{
    config::{AppConfig, StorageBackend},
    dao::document_store::{DeadlineStore, DocumentStore, MemoryDocumentStore},
    routes,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let store = connect_store(&config).await?;
    let app_state = AppState::new(store, config.tables.clone());

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state, &config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Construct the configured backend once; it is shared by every request.
async fn connect_store(config: &AppConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    let store: Arc<dyn DocumentStore> = match &config.storage {
        StorageBackend::Memory => {
            warn!("using in-memory storage; documents are lost on restart");
            Arc::new(MemoryDocumentStore::new())
        }
        #[cfg(feature = "mongo-store")]
        StorageBackend::Mongo { uri, database } => {
            use family_game_back::dao::document_store::mongodb::{MongoConfig, MongoDocumentStore};

            let mongo = MongoConfig::from_uri(uri, database.as_deref())
                .await
                .context("parsing MongoDB URI")?;
            Arc::new(
                MongoDocumentStore::connect(mongo)
                    .await
                    .context("connecting to MongoDB")?,
            )
        }
        #[cfg(feature = "couch-store")]
        StorageBackend::Couch {
            base_url,
            database,
            username,
            password,
        } => {
            use family_game_back::dao::document_store::couchdb::{CouchConfig, CouchDocumentStore};

            let mut couch = CouchConfig::new(base_url.as_str(), database.as_str());
            if let (Some(username), Some(password)) = (username, password) {
                couch = couch.with_credentials(username.as_str(), password.as_str());
            }
            Arc::new(
                CouchDocumentStore::connect(couch)
                    .await
                    .context("connecting to CouchDB")?,
            )
        }
        #[allow(unreachable_patterns)]
        other => anyhow::bail!(
            "storage backend `{}` is not compiled into this binary",
            other.name()
        ),
    };

    info!(backend = config.storage.name(), "storage backend ready");
    Ok(match config.store_timeout {
        Some(limit) => Arc::new(DeadlineStore::new(store, limit)),
        None => store,
    })
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState, config: &AppConfig) -> Router<()> {
    routes::router(state)
        .layer(routes::cors_layer(&config.cors_origins))
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
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
