//! gemfeed server entry point.
//!
//! Boots the feed refresher and the Gemini listener.
//! Logs go to stderr as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use gemfeed_client::{ClientConfig, TwitterClient};
use gemfeed_core::{AppConfig, FeedCache, Refresher};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_rustls::TlsAcceptor;
use tracing_subscriber::EnvFilter;

mod error;
mod gemini;
mod handler;
mod listener;
mod render;

use handler::FeedRouter;
use render::PageLayout;

/// Mirror a Twitter timeline over Gemini.
#[derive(Debug, Parser)]
#[command(name = "gemfeed", version)]
struct Args {
    /// Location of the config file.
    #[arg(short, long, env = "GEMFEED_CONFIG", default_value = "config.yml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let args = Args::parse();

    let config = AppConfig::load(&args.config)?;
    config.require_credentials()?;
    let request = config.fetch_request()?;
    let tls = listener::load_tls_config(&config.cert.cert_file, &config.cert.key_file)?;
    let client = TwitterClient::new(ClientConfig::from_app_config(&config))?;

    let cache = Arc::new(FeedCache::new());
    let router = Arc::new(FeedRouter::new(Arc::clone(&cache), PageLayout::from_config(&config.ui)));

    let (stop_refresh, stop_rx) = oneshot::channel::<()>();
    let refresher = Refresher::new(Arc::clone(&cache), client, request, config.refresh_policy());
    let refresh_task = tokio::spawn(refresher.run(async move {
        let _ = stop_rx.await;
    }));

    let addr = config.listen_addr();
    let tcp = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(%addr, "Starting gemfeed server");

    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    listener::serve(tcp, TlsAcceptor::from(tls), router, shutdown).await?;

    let _ = stop_refresh.send(());
    refresh_task.await?;

    Ok(())
}
