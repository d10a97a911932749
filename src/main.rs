use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use codegen_relay::config::{Cli, RelayConfig};
use codegen_relay::server::api::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments (after loading .env).
    let cli = Cli::load();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "codegen_relay=debug,tower_http=debug"
    } else {
        "codegen_relay=info,tower_http=info"
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true);

    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!("codegen-relay v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration.
    let config = Arc::new(RelayConfig::from_cli(&cli)?);

    info!(
        upstream = %config.upstream.base_url,
        timeout_secs = config.upstream.timeout.as_secs(),
        model = %config.generation.model,
        max_tokens = config.generation.max_tokens,
        "Configuration loaded"
    );

    if config.upstream.token().is_none() {
        warn!("AIPIPE_TOKEN is not set; /stream will answer 500 until it is configured");
    }

    let state = Arc::new(AppState::new(config)?);
    let app = build_router(state);

    let listener = TcpListener::bind(&cli.listen).await?;
    info!("Listening on {}", cli.listen);

    axum::serve(listener, app).await?;

    Ok(())
}
