//! Meridian Daemon
//!
//! Hosts the trading engine and its HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Start with default configuration
//! cargo run -p meridiand
//!
//! # Start with custom environment
//! MERIDIAN_ENV=test MERIDIAN_API_PORT=8081 cargo run -p meridiand
//! ```
//!
//! # Environment Variables
//!
//! - `MERIDIAN_ENV`: Environment (test, development, production)
//! - `MERIDIAN_API_HOST`: API host (default: 0.0.0.0)
//! - `MERIDIAN_API_PORT`: API port (default: 8080)
//! - `MERIDIAN_INITIAL_CASH`: Cash of a new portfolio (default: 0)
//! - `MERIDIAN_ALLOW_SHORT_SELLING`: Allow sells beyond holdings (default: false)
//! - `MERIDIAN_{AI,COMPLIANCE,SECURITY}_ENABLED`, `_ENDPOINT`, `_API_KEY`
//! - `MERIDIAN_OFFLINE_MODE`, `MERIDIAN_LOW_BANDWIDTH`, `MERIDIAN_LOCAL_CACHING`
//! - `MERIDIAN_ECOSYSTEM_TIMEOUT_MS`: Advisory call bound (default: 5000)
//! - `MERIDIAN_LOG_FORMAT`: `json` for JSON log lines

use meridiand::{Config, Daemon};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env first so MERIDIAN_LOG_FORMAT can come from it
    let _ = dotenvy::dotenv();

    // Initialize tracing
    let filter = EnvFilter::from_default_env().add_directive("meridiand=info".parse()?);
    let json = std::env::var("MERIDIAN_LOG_FORMAT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false);
    if json {
        tracing_subscriber::registry().with(fmt::layer().json()).with(filter).init();
    } else {
        tracing_subscriber::registry().with(fmt::layer()).with(filter).init();
    }

    // Load configuration
    let config = Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        api_host = %config.api.host,
        api_port = config.api.port,
        initial_cash = %config.engine.initial_cash,
        short_selling = ?config.engine.short_selling,
        "Meridian Daemon"
    );

    // Create and run daemon
    let daemon = Daemon::build(config).await;
    daemon.run().await?;

    Ok(())
}
