//! HTTP API server

use axum::{
    http::HeaderValue,
    middleware,
    routing::{any, get},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{
    require_session, AuthBridge, AuthHandler, LocalAuthHandler, LocalAuthSettings,
    OriginPolicy, RemoteAuthHandler, SessionGuard,
};
use crate::config::{AuthBackend, Config, StoreKind};
use crate::error::{Error, Result};
use crate::store::{AuthStore, MemoryStore, PostgresStore};

use super::routes;

/// Application state shared across handlers.
///
/// Nothing in here is mutated after startup.
pub struct AppState {
    pub config: Config,
    pub bridge: AuthBridge,
    pub guard: SessionGuard,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Wire the bridge and guard around one auth handler
    pub fn new(config: Config, handler: Arc<dyn AuthHandler>) -> Self {
        let origin = OriginPolicy {
            protocol: config.server.protocol.clone(),
            trust_proxy: config.server.trust_proxy,
        };
        let bridge = AuthBridge::new(handler.clone(), config.mount_prefix(), origin.clone());
        let guard = SessionGuard::new(handler, origin);

        Self {
            config,
            bridge,
            guard,
        }
    }
}

/// Build the auth handler selected by the config
pub async fn build_auth_handler(config: &Config) -> Result<Arc<dyn AuthHandler>> {
    match config.auth.provider {
        AuthBackend::Local => {
            let store: Arc<dyn AuthStore> = match config.database.store {
                StoreKind::Postgres => {
                    let store = PostgresStore::connect(&config.database.url).await?;
                    store.migrate().await?;
                    Arc::new(store)
                }
                StoreKind::Memory => {
                    tracing::warn!("Using in-memory auth store; users are lost on restart");
                    Arc::new(MemoryStore::new())
                }
            };
            Ok(Arc::new(LocalAuthHandler::new(
                store,
                LocalAuthSettings::from(&config.auth),
            )))
        }
        AuthBackend::Remote => {
            let url = config.auth.remote_url.as_deref().ok_or_else(|| {
                Error::Config("auth.remote_url is required for the remote provider".to_string())
            })?;
            tracing::info!("Forwarding auth requests to {}", url);
            Ok(Arc::new(RemoteAuthHandler::new(url)?))
        }
    }
}

/// Run the HTTP API server
pub async fn run_server(config: Config, host: &str, port: u16) -> Result<()> {
    config.validate()?;

    let handler = build_auth_handler(&config).await?;
    let state = Arc::new(AppState::new(config, handler));

    let app = create_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// CORS for credentialed requests from the trusted origins
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim_end_matches('/')) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid trusted origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

/// Create the router with all routes
pub fn create_router(state: SharedState) -> Router {
    let prefix = state.bridge.prefix().to_string();

    let bridge_routes = Router::new()
        .route(&prefix, any(routes::auth_bridge))
        // The catch-all never matches an empty tail
        .route(&format!("{}/", prefix), any(routes::auth_bridge))
        .route(&format!("{}/{{*rest}}", prefix), any(routes::auth_bridge))
        .with_state(state.bridge.clone());

    let protected_routes = Router::new()
        .route("/auth/me", get(routes::me))
        .route("/api/protected", get(routes::protected))
        .route_layer(middleware::from_fn_with_state(
            state.guard.clone(),
            require_session,
        ));

    Router::new()
        .route("/health", get(routes::health))
        .merge(bridge_routes)
        .merge(protected_routes)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.auth.trusted_origins))
}
