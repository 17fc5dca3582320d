use crate::error::ServerError;
use crate::routes::{email_routes, health_routes, payment_routes, reset_routes};
use crate::state::{build_state, AppState};
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use std::net::SocketAddr;
use taskora_config::{ServerConfig, TaskoraConfig};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

const MAX_BODY_SIZE_1MB: usize = 1024 * 1024;

/// All function routes over `state`
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .merge(email_routes())
        .merge(reset_routes())
        .merge(payment_routes())
        .with_state(state)
        .merge(health_routes())
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE_1MB))
        .layer(cors_layer(config))
}

/// Browsers call these functions directly; with no configured origins any
/// origin is accepted
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

pub async fn start_server(config: &TaskoraConfig) -> Result<(), ServerError> {
    let state = build_state(config)?;
    let app = router(state, &config.server);

    let addr: SocketAddr = config
        .server
        .bind_address()
        .parse()
        .map_err(|e| ServerError::Address(format!("{}: {e}", config.server.bind_address())))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Starting functions server on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Functions server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

