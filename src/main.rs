use anyhow::{Context, Result};
use clap::Parser;
use log_server::{CaptureService, LogServerConfiguration, StoreMode};
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use tracing_subscriber::EnvFilter;

/// Captures HTTP requests sent to /i/... and lets you browse them under /o/...
#[derive(Parser, Debug)]
#[command(name = "log-server")]
#[command(version)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "LOG_SERVER_BIND", default_value = "127.0.0.1:8000")]
    bind: SocketAddr,

    /// `namespaced` keys captures by /i/<id>/<path>, `flat` by /i/<path>
    #[arg(long, env = "LOG_SERVER_MODE", default_value = "namespaced")]
    mode: StoreMode,

    /// File the captured requests are persisted to
    #[arg(long, env = "LOG_SERVER_CACHE_FILE", default_value = ".cache.json")]
    cache_file: PathBuf,

    /// Minimum time between two writes of the cache file, in milliseconds
    #[arg(long, env = "LOG_SERVER_DEBOUNCE_MS", default_value_t = 1000)]
    debounce_ms: u64,

    /// Number of captures returned per path
    #[arg(long, env = "LOG_SERVER_HISTORY", default_value_t = 10)]
    history: usize,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn configuration(&self) -> LogServerConfiguration {
        let mut configuration = LogServerConfiguration::new(self.mode);
        configuration.set_bind_address(self.bind);
        configuration.set_cache_file(self.cache_file.clone());
        configuration.set_debounce_window(Duration::from_millis(self.debounce_ms));
        configuration.set_history_limit(self.history);
        configuration
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let configuration = args.configuration();

    let service = Arc::new(CaptureService::from_configuration(configuration));
    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::warn!("Couldn't listen for Ctrl-C, running until killed");
            std::future::pending::<()>().await;
        }
    };

    log_server::run(service, shutdown)
        .await
        .context("Log server failed")
}
