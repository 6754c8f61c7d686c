//! HTTP surface of the bookshelf catalog.
//!
//! # Responsibility
//! - Route `/api/{Resource}` verbs to the generic entity service.
//! - Apply bearer authorization and request logging.
//! - Load configuration and run the server.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use crate::auth::{require_bearer, AuthPolicy};
use crate::config::AppConfig;
use crate::state::{AppState, Database};
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use bookshelf_core::{core_version, Author, Book, Entity, RepoError, RoleEntitlement};
use log::{info, warn};
use serde_json::{json, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Builds the full application router over `state`.
pub fn build_router(state: AppState) -> Router {
    let my_ip_route = format!("/api/{}/myip", Author::RESOURCE);
    let api = Router::new().route(&my_ip_route, get(routes::my_ip));
    let api = routes::resource_routes::<Author>(api);
    let api = routes::resource_routes::<Book>(api);
    let api = routes::resource_routes::<RoleEntitlement>(api)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": core_version() }))
}

async fn log_request(request: Request, next: Next) -> Response {
    let started_at = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    info!(
        "event=http_request module=api method={method} path={path} http_status={} duration_ms={}",
        response.status().as_u16(),
        started_at.elapsed().as_millis()
    );
    response
}

#[derive(Debug)]
pub enum ServeError {
    Config(config::ConfigError),
    Storage(RepoError),
    Io(std::io::Error),
}

impl Display for ServeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<config::ConfigError> for ServeError {
    fn from(value: config::ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<RepoError> for ServeError {
    fn from(value: RepoError) -> Self {
        Self::Storage(value)
    }
}

impl From<std::io::Error> for ServeError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Opens storage, binds the listener and serves until Ctrl-C.
pub async fn serve(config: AppConfig) -> Result<(), ServeError> {
    let addr = config.bind_addr()?;
    let db = Database::open(&config.database.path)?;

    let auth = AuthPolicy::new(config.auth.tokens.clone());
    if !auth.is_enabled() {
        warn!("event=auth_disabled module=api status=ok reason=no_tokens_configured");
    }

    let app = build_router(AppState::new(db, auth));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        "event=server_start module=api status=ok addr={} database={}",
        listener.local_addr()?,
        config.database.path
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("event=server_stop module=api status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("event=shutdown_signal module=api status=error error={err}");
    }
}
