//! # HTTP Server
//!
//! Main HTTP server combining the pipeline, model, and log feed routers.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::feed::SubscriberHub;
use crate::registry::RunRegistry;

use super::config::HttpServerConfig;
use super::feed_routes::{feed_routes, FeedState};
use super::model_routes::{model_routes, ModelState};
use super::pipeline_routes::{pipeline_routes, PipelineState};

/// HTTP server for the pipeline dashboard API
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    /// Create a server wired to the registry and subscriber hub
    pub fn new(
        config: HttpServerConfig,
        registry: Arc<RunRegistry>,
        hub: Arc<SubscriberHub>,
        models_dir: PathBuf,
    ) -> Self {
        let router = Self::build_router(&config, registry, hub, models_dir);
        Self { config, router }
    }

    /// Build the combined router with all endpoints
    fn build_router(
        config: &HttpServerConfig,
        registry: Arc<RunRegistry>,
        hub: Arc<SubscriberHub>,
        models_dir: PathBuf,
    ) -> Router {
        let pipeline_state = Arc::new(PipelineState { registry });
        let model_state = Arc::new(ModelState { models_dir });
        let feed_state = Arc::new(FeedState { hub });

        let cors = if config.cors_origins.is_empty() {
            // If no origins configured, use permissive for development
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            use tower_http::cors::AllowOrigin;
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            // Service banner at root level
            .route("/", get(root_handler))
            // Pipeline routes under /api/pipeline
            .nest("/api/pipeline", pipeline_routes(pipeline_state))
            // Model routes under /api/models
            .nest("/api/models", model_routes(model_state))
            // Log feed WebSocket under /ws
            .nest("/ws", feed_routes(feed_state))
            // Apply CORS middleware
            .layer(cors)
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Start the HTTP server (async)
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self
            .config
            .socket_addr()
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        println!("Starting AutoVision HTTP server on {}", addr);
        println!("API endpoints:");
        println!("  - /api/pipeline/* - Run submission & status");
        println!("  - /api/models/* - Model listing, download & testing");
        println!("  - /ws/logs - Live log feed (WebSocket)");

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, self.router).await?;

        Ok(())
    }
}

/// Service banner
async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": "AutoVision Pipeline API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
