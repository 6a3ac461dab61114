//! autofix HTTP facade: runs the pipeline in-process and returns its result.

mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use autofix::io::config::load_from_process;
use autofix::pipeline::DefaultPipeline;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "autofix-server")]
#[command(about = "HTTP API for running the autofix pipeline")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "3001")]
    port: u16,

    /// TOML configuration file (defaults apply when omitted or missing)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("autofix_server=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let cfg = load_from_process(args.config.as_deref())?;
    info!(workspace_root = %cfg.workspace_root.display(), "starting autofix-server");
    let pipeline = DefaultPipeline::from_config(&cfg).context("build pipeline")?;
    let state = AppState::new(Arc::new(pipeline));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api", routes::api_router())
        .layer(cors)
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
