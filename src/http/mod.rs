//! # HTTP & WebSocket Surface
//!
//! Axum server exposing the pipeline, model, and log-feed endpoints.
//!
//! # Endpoints
//!
//! - `POST /api/pipeline/start` - Submit a pipeline run
//! - `GET /api/pipeline/status/{run_id}` - Run record snapshot
//! - `GET /api/models` - List trained model artifacts
//! - `GET /api/models/{name}/download` - Download an artifact file
//! - `POST /api/models/test` - Classify an uploaded image with a heatmap
//! - `GET /ws/logs` - Live log feed over WebSocket
//! - `GET /` - Service banner

pub mod config;
pub mod feed_routes;
pub mod model_routes;
pub mod pipeline_routes;
pub mod server;

pub use config::HttpServerConfig;
pub use server::HttpServer;
