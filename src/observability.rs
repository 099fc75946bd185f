use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Set up logs
pub fn setup_logs() {
    // RUST_LOG wins when set
    let log_level = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "scan_gateway=info,warn".into());

    tracing_subscriber::registry()
        .with(log_level)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
