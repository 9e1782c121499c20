//! The axum server wiring.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::Result;
use crate::proxy::handlers;
use crate::proxy::orchestrator::SearchProxy;

/// Build the router over a shared proxy.
pub fn router(proxy: Arc<SearchProxy>) -> Router {
    Router::new()
        .route("/search", post(handlers::search))
        .route("/search/batch", post(handlers::search_batch))
        .route("/tokenize", post(handlers::tokenize))
        .route("/dictionary/reload", post(handlers::reload_dictionary))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(proxy)
}

/// Bind the configured address and serve until shutdown.
pub async fn serve(proxy: Arc<SearchProxy>) -> Result<()> {
    let address = format!(
        "{}:{}",
        proxy.config().server.host,
        proxy.config().server.port
    );
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(%address, "tatkham proxy listening");

    axum::serve(listener, router(proxy)).await?;
    Ok(())
}
