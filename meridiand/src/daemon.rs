//! Daemon: Main runtime orchestrator.
//!
//! The Daemon ties together all components:
//! - Trading service (engine + ecosystem gateway)
//! - Event Bus (ledger event fan-out)
//! - API Server (HTTP endpoints)
//!
//! # Lifecycle
//!
//! 1. Load configuration
//! 2. Initialize components, probing enabled ecosystem capabilities
//! 3. Start API server
//! 4. Main event loop (audit log of ledger events)
//! 5. Graceful shutdown on SIGINT or cancellation

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use meridian_domain::LedgerEvent;
use meridian_ecosystem::{AdvisoryPort, EcosystemGateway, HttpAdvisoryClient, StubAdvisory};
use meridian_engine::Engine;
use meridian_store::MemoryStore;

use crate::api::{create_router, ApiState};
use crate::config::{Config, Environment};
use crate::error::{DaemonError, DaemonResult};
use crate::event_bus::{DaemonEvent, EventBus};
use crate::service::TradingService;

// =============================================================================
// Daemon
// =============================================================================

/// The main Meridian daemon.
pub struct Daemon {
    /// Configuration
    config: Config,
    /// Engine and gateway
    service: Arc<TradingService<MemoryStore>>,
    /// Event bus
    event_bus: Arc<EventBus>,
    /// Cancelled on shutdown
    cancel_token: CancellationToken,
}

impl Daemon {
    /// Build a daemon from configuration.
    ///
    /// The test environment answers advisory calls from `StubAdvisory`;
    /// every other environment uses the HTTP client.
    pub async fn build(config: Config) -> Self {
        let port: Arc<dyn AdvisoryPort> = match config.environment {
            Environment::Test => Arc::new(StubAdvisory::new()),
            Environment::Development | Environment::Production => {
                Arc::new(HttpAdvisoryClient::new(&config.ecosystem))
            },
        };
        let gateway = EcosystemGateway::connect(config.ecosystem.clone(), port).await;
        Self::with_gateway(config, gateway)
    }

    /// Create a daemon around an existing gateway.
    pub fn with_gateway(config: Config, gateway: EcosystemGateway) -> Self {
        let event_bus = Arc::new(EventBus::default());
        let engine = Engine::new(MemoryStore::new(), config.engine.clone())
            .with_event_sink(event_bus.clone());
        let service = Arc::new(TradingService::new(engine, Arc::new(gateway)));

        Self {
            config,
            service,
            event_bus,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Trading service shared with the API
    pub fn service(&self) -> &Arc<TradingService<MemoryStore>> {
        &self.service
    }

    /// Event bus carrying ledger events
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Token that stops the daemon when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Run the daemon.
    ///
    /// This method blocks until shutdown is requested (SIGINT or the
    /// shutdown token).
    pub async fn run(self) -> DaemonResult<()> {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            environment = %self.config.environment,
            "Starting Meridian daemon"
        );

        // Subscribe before the API accepts requests so no event is missed
        let mut event_receiver = self.event_bus.subscribe();

        let api_addr = self.start_api_server().await?;
        info!(%api_addr, "API server started");

        info!("Entering main event loop");
        loop {
            tokio::select! {
                Some(event_result) = event_receiver.recv() => {
                    match event_result {
                        Ok(DaemonEvent::Ledger(event)) => self.handle_event(&event),
                        Ok(DaemonEvent::Shutdown) => {
                            info!("Shutdown event received");
                            break;
                        },
                        Err(lagged) => {
                            warn!(skipped = lagged.skipped, "Audit log missed ledger events");
                        },
                    }
                }

                _ = self.cancel_token.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.shutdown();
        Ok(())
    }

    /// Start the API server.
    ///
    /// The server stops accepting connections when the shutdown token is
    /// cancelled.
    pub async fn start_api_server(&self) -> DaemonResult<SocketAddr> {
        let state = Arc::new(ApiState {
            service: self.service.clone(),
        });

        let router = create_router(state);
        let addr = format!("{}:{}", self.config.api.host, self.config.api.port);

        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            DaemonError::Config(format!("Failed to bind to {}: {}", addr, e))
        })?;

        let local_addr = listener.local_addr().map_err(|e| {
            DaemonError::Server(format!("Failed to get local address: {}", e))
        })?;

        let token = self.cancel_token.clone();
        tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "API server error");
            }
        });

        Ok(local_addr)
    }

    /// Audit log for a committed change.
    fn handle_event(&self, event: &LedgerEvent) {
        info!(
            event_type = event.event_type(),
            user_id = %event.user_id(),
            timestamp = %event.timestamp(),
            "Ledger event"
        );
    }

    /// Graceful shutdown.
    fn shutdown(&self) {
        info!("Initiating graceful shutdown");
        self.cancel_token.cancel();

        let users = self.service.engine().store().user_count();
        let orders = self.service.engine().store().order_count();
        info!(users, orders, "Shutdown complete");
    }
}

// =============================================================================
// Tests
// =============================================================================
