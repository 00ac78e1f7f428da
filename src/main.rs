use clap::Parser;
use dotenvy::dotenv;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uploadgpt::config::AppConfig;
use uploadgpt::services::answer::GeminiClient;
use uploadgpt::services::sweeper::UploadSweeper;
use uploadgpt::{AppState, create_app};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port for the HTTP server (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory receiving uploads (overrides UPLOAD_DIR)
    #[arg(short, long)]
    upload_dir: Option<PathBuf>,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "uploadgpt=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting UploadGPT...");

    let mut config = AppConfig::from_env();
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(upload_dir) = args.upload_dir {
        config.upload_dir = upload_dir;
    }

    info!(
        "⚙️  Config: Upload Dir={}, Max Size={}MB, Model={}, Timeout={}s",
        config.upload_dir.display(),
        config.max_upload_size / 1024 / 1024,
        config.gemini_model,
        config.request_timeout_secs
    );
    if config.gemini_api_key.is_none() {
        warn!("🔑 No AI API key configured, /uploadgpt requests will fail until one is set");
    }

    let requester = Arc::new(GeminiClient::new(&config)?);
    let state = AppState::new(config.clone(), requester);
    state.receiver.ensure_dirs().await?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let sweeper_handle = if config.upload_retention_hours > 0 {
        let sweeper = UploadSweeper::new(
            config.upload_dir.clone(),
            config.compressed_dir(),
            Duration::from_secs(config.upload_retention_hours * 3600),
            shutdown_rx,
        );
        Some(tokio::spawn(sweeper.run()))
    } else {
        None
    };

    let app = create_app(state);

    let addr = SocketAddr::new(args.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("✅ Server ready at http://{}", addr);
    info!("📖 Swagger UI: http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .await?;

    if let Some(handle) = sweeper_handle {
        if let Err(e) = handle.await {
            error!("Upload sweeper task failed: {}", e);
        }
    }

    info!("🛑 Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, starting graceful shutdown...");
        },
    }
}
