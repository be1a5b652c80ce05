use std::sync::Arc;

use anyhow::Context;
use clipgrab::{
    AppState, Config, Source, build_api_client, build_cors_layer, build_dispatcher,
    build_stream_client, providers::YtDlpClient, router,
};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "clipgrab=info,tower_http=info".to_string()),
        )
        .init();

    if let Err(error) = run().await {
        eprintln!("Server error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::from_env().context("Invalid configuration")?;

    let api_client =
        build_api_client(config.upstream_timeout).context("Could not build HTTP client")?;
    let stream_client = build_stream_client(config.upstream_timeout)
        .context("Could not build streaming HTTP client")?;

    let youtube_client = YtDlpClient::new(config.yt_dlp_bin.clone(), config.yt_dlp_timeout);
    youtube_client.check_version().await;

    let dispatcher = build_dispatcher(&config, api_client, Arc::new(youtube_client));
    for source in [Source::TikTok, Source::Instagram] {
        if !dispatcher.is_enabled(source) {
            warn!("{source} resolution is disabled, requests will answer 501");
        }
    }

    if config.allowed_origins.is_empty() {
        warn!("ALLOWED_ORIGINS is not set, any origin may call the API.");
    }
    let cors = build_cors_layer(&config.allowed_origins)?;

    let state = AppState {
        dispatcher: Arc::new(dispatcher),
        stream_client,
    };
    let app = router(state, cors);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Could not bind {}", config.bind_addr))?;

    info!("ClipGrab resolver listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for shutdown signal: {error}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
