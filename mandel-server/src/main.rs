//! # Mandel Server
//!
//! HTTP front end for the interactive Mandelbrot viewer.
//!
//! ## Usage
//! ```bash
//! # Listen on 0.0.0.0:8080
//! mandel-server
//!
//! # Custom address, debug logging
//! RUST_LOG=debug mandel-server --bind 127.0.0.1:3000
//! ```

mod config;
mod http;
mod routes;
mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use mandel_core::Explorer;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::{Command, ServerConfig, BIND_ENV};
use crate::routes::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mandel_server=info".parse()?)
                .add_directive("mandel_core=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let env_bind = std::env::var(BIND_ENV).ok();
    let config = match ServerConfig::from_args(&args, env_bind.as_deref())? {
        Command::Serve(config) => config,
        Command::Help => {
            config::print_usage();
            return Ok(());
        }
    };

    info!("Mandel Server v{} starting...", mandel_core::VERSION);
    info!(
        "Viewer {}px wide, {}px tiles",
        config.viewer_width, config.tile_size
    );

    let explorer = Explorer::new(config.zoom_config()?);
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    let state = Arc::new(AppState::new(explorer, config));

    server::serve(listener, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await?;

    Ok(())
}
