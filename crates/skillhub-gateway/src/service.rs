use crate::config::Config;
use crate::routes::{self, AppState};
use anyhow::{Context, Result};
use skillhub_catalog::Indexer;
use skillhub_logging::LogFormat;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

/// Gateway service - main orchestrator
pub struct GatewayService {
    config: Config,
}

impl GatewayService {
    /// Create a new gateway service
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the gateway service until Ctrl+C
    pub async fn run(self) -> Result<()> {
        // Initialize logging
        let format = LogFormat::parse(&self.config.logging.format)?;
        skillhub_logging::init_logging(&self.config.logging.level, format)?;
        info!("Starting SkillHub Gateway Service");

        let data_dir = self.config.catalog.data_dir();
        info!(
            "Catalog config: data_dir={}, debounce_ms={}",
            data_dir.display(),
            self.config.catalog.debounce_ms
        );

        // Build the initial catalog and start watching for changes
        let mut indexer = Indexer::new(data_dir)
            .with_debounce(Duration::from_millis(self.config.catalog.debounce_ms));
        match indexer.start().await {
            Ok(count) => info!("Indexed {} skills from {}", count, indexer.root().display()),
            Err(e) => warn!("Failed to scan data dir {}: {}", indexer.root().display(), e),
        }

        let app = routes::router(AppState {
            catalog: indexer.catalog(),
        });

        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        info!("Listening on http://{}", addr);

        // Setup signal handler for graceful shutdown
        let shutdown = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to install Ctrl+C handler: {}", e);
            }
            info!("Received shutdown signal");
        };

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            error!("HTTP server error: {}", e);
        }

        info!("Shutting down gracefully...");
        indexer.shutdown().await;

        info!("Gateway service stopped");
        Ok(())
    }
}
