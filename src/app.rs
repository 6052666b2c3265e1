//! Application assembly: tracing setup, router layers and the serve loop.

use crate::config::ServerConfig;
use crate::error::{AppError, RegistrationError};
use crate::routes::{common_routes, COMMON_PATHS};
use crate::state::AppState;
use crate::web::RouteTable;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber. `RUST_LOG` wins over `default_filter`. Repeated calls are no-ops.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Mount the route table next to the common routes and wrap everything in request tracing
/// and a body size limit.
pub fn build_app(state: AppState, routes: RouteTable, server: &ServerConfig) -> Result<Router, AppError> {
    if let Some(entry) = routes.entries().iter().find(|e| COMMON_PATHS.iter().any(|p| *p == e.path())) {
        return Err(RegistrationError::DuplicateRoute {
            method: entry.method().to_string(),
            path: entry.path().to_string(),
        }
        .into());
    }
    let templates = Arc::clone(&state.templates);
    Ok(routes
        .into_router(templates)
        .merge(common_routes(state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(server.body_limit)),
        ))
}

pub async fn serve(router: Router, server: &ServerConfig) -> Result<(), AppError> {
    let listener = TcpListener::bind((server.host.as_str(), server.port)).await?;
    tracing::info!("server started at http://{}...", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}
