use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ocrgate::api::{create_router, AppState};
use ocrgate::config::Config;
use ocrgate::ocr::build_provider;

#[derive(Parser)]
#[command(name = "ocrgate")]
#[command(about = "Extract text from uploaded images through the Azure Read API")]
struct Args {
    /// Address to bind, overrides OCRGATE_HOST
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on, overrides OCRGATE_PORT
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ocrgate=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!(
        max_dimension = config.ocr.max_image_dimension,
        poll_interval_ms = config.ocr.poll_interval_ms,
        max_poll_attempts = config.ocr.max_poll_attempts,
        "Initializing OCR provider..."
    );
    let provider = build_provider(&config.ocr);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, provider);
    let app = create_router(state);

    tracing::info!("OcrGate starting on http://{}", addr);
    tracing::info!("  Upload:       POST http://{}/extract-text/", addr);
    tracing::info!("  OpenAPI spec: http://{}/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining in-flight requests...");
}
