// docsearch-cache - fuzzy-matching cache in front of a documentation search API
// Author: kelexine (https://github.com/kelexine)

use anyhow::{bail, Context, Result};
use clap::Parser;
use docsearch_cache::cli::{Args, Command};
use docsearch_cache::config::AppConfig;
use docsearch_cache::metrics::PrometheusMetrics;
use docsearch_cache::search::SearchClient;
use docsearch_cache::server::{create_router, AppState};
use docsearch_cache::tools::DocSearchService;
use docsearch_cache::utils::logging;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

fn main() -> Result<()> {
    let args = Args::parse();

    // Phase 1: Load configuration
    let config = AppConfig::load_from(args.config.as_deref())?;

    // Phase 2: Initialize logging
    logging::init(&config.logging)?;
    info!("Starting docsearch-cache v{}", env!("CARGO_PKG_VERSION"));

    // Phase 3: Build the runtime with the configured worker count
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.workers.max(1))
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(run(args.command(), config))
}

async fn run(command: Command, config: AppConfig) -> Result<()> {
    // Phase 4: Wire search client, cache, and metrics
    let client =
        SearchClient::new(&config.search)?.with_secret_sanitizing(config.logging.sanitize_secrets);
    info!("Search endpoint: {}", client.api_url());

    let exporter = Arc::new(PrometheusMetrics::new()?);
    let service = Arc::new(DocSearchService::from_config(
        &config,
        Arc::new(client),
        Some(exporter.clone()),
    ));

    match command {
        Command::Search {
            query,
            page_size,
            language,
            version,
        } => {
            let result = service
                .search_docs(&query, page_size, version.as_deref(), language.as_deref())
                .await;
            let failed = result.is_error();
            println!("{}", result.into_text());
            if failed {
                bail!("documentation search failed");
            }
            Ok(())
        }
        Command::Serve => serve(config, service, exporter).await,
    }
}

async fn serve(
    config: AppConfig,
    service: Arc<DocSearchService>,
    exporter: Arc<PrometheusMetrics>,
) -> Result<()> {
    // Phase 5: Build and start HTTP server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let app = create_router(AppState::new(config, service, exporter));

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Phase 6: Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
