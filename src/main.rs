//! AutoVision server entry point
//!
//! Wires the log feed, run registry, and HTTP server together and serves
//! until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use autovision::collaborators::{FsAnalyzer, RuleBasedAdvisor, StubTrainer};
use autovision::feed::{self, spawn_consumer, SubscriberHub};
use autovision::http::{HttpServer, HttpServerConfig};
use autovision::observability::Logger;
use autovision::registry::{Collaborators, RunRegistry};

/// AutoVision - self-driving image-classification pipeline server
#[derive(Parser, Debug)]
#[command(name = "autovision")]
#[command(version, about, long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind to
    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// Directory for trained model artifacts
    #[arg(long, default_value = "./models")]
    models_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let args = Args::parse();

    let (feed_sender, feed_receiver) = feed::channel();
    let hub = Arc::new(SubscriberHub::new());
    spawn_consumer(feed_receiver, Arc::clone(&hub));

    let registry = Arc::new(RunRegistry::new(
        feed_sender,
        Collaborators {
            analyzer: Box::new(FsAnalyzer::new()),
            advisor: Box::new(RuleBasedAdvisor::new()),
            trainer: Box::new(StubTrainer::new(&args.models_dir)),
        },
    ));

    let config = HttpServerConfig {
        host: args.host,
        port: args.port,
        ..Default::default()
    };

    Logger::info(
        "SERVER_STARTING",
        &[
            ("addr", &config.socket_addr()),
            ("models_dir", &args.models_dir.display().to_string()),
        ],
    );

    HttpServer::new(config, registry, hub, args.models_dir)
        .start()
        .await
}
