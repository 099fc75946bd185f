use clap::Parser; // for cli
use std::net::SocketAddr;
use std::sync::Arc;

use scan_gateway::config::Args;
use scan_gateway::extraction::OpenAiExtractor;
use scan_gateway::state::AppState;
use scan_gateway::{handlers, observability};

// this is main async function with tokio
#[tokio::main]
async fn main() -> std::io::Result<()> {
    observability::setup_logs();

    // parse cli arguments
    let args = Args::parse();

    if args.api_key.is_empty() {
        tracing::warn!("OPENAI_API_KEY is empty, extraction calls will be rejected upstream");
    }

    let extractor = OpenAiExtractor::new(
        reqwest::Client::new(),
        &args.api_base_url,
        args.api_key.clone(),
        args.model.clone(),
        args.max_tokens,
    );

    // creating shared state
    let state = Arc::new(AppState::new(
        Arc::new(extractor),
        args.rate_limit,
        args.rate_window(),
        args.extraction_timeout(),
    ));

    let app = handlers::router(state, args.max_upload_bytes);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, "scan gateway listening");
    tracing::info!(base_url = %args.api_base_url, model = %args.model, "extraction backend");
    tracing::info!(
        "Rate limit: {} batches per {} seconds per client",
        args.rate_limit,
        args.rate_window
    );
    tracing::info!(timeout = ?args.extraction_timeout(), "per-image extraction timeout");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}
