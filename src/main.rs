use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use viewvault_server::media::{DiskMediaStore, MediaStore};
use viewvault_server::server::{self, metrics, RequestsLoggingLevel, ServerConfig};
use viewvault_server::store::{PlatformStore, SqlitePlatformStore, VideoStore};
use viewvault_server::user::UserManager;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite platform database file.
    #[clap(value_parser = parse_path)]
    pub platform_db: PathBuf,

    /// Path to the media directory holding uploaded blobs.
    #[clap(long, value_parser = parse_path)]
    pub media_path: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .expect("Failed to initialize tracing");

    // Default media path to a sibling of the database file if not specified
    let media_path = match cli_args.media_path {
        Some(path) => path,
        None => cli_args
            .platform_db
            .parent()
            .map(|p| p.join("media"))
            .unwrap_or_else(|| PathBuf::from("media")),
    };

    info!(
        "Opening SQLite platform database at {:?}...",
        cli_args.platform_db
    );
    let store: Arc<dyn PlatformStore> = Arc::new(SqlitePlatformStore::new(&cli_args.platform_db)?);
    let user_manager = Arc::new(UserManager::new(store.clone()));

    info!("Serving media from {:?}...", media_path);
    let media: Arc<dyn MediaStore> = Arc::new(DiskMediaStore::new(&media_path)?);

    info!("Initializing metrics...");
    metrics::init_metrics();
    metrics::init_content_metrics(store.video_count()?);

    let config = ServerConfig {
        requests_logging_level: cli_args.logging_level,
        port: cli_args.port,
        frontend_dir_path: cli_args.frontend_dir_path,
    };

    info!("Ready to serve at port {}!", cli_args.port);
    info!("Metrics available at port {}!", cli_args.metrics_port);
    server::run_server(config, store, user_manager, media, cli_args.metrics_port).await
}
