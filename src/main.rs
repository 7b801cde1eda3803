//! hn-proxy: an HTML-rewriting forward proxy.
//!
//! ```text
//!   client ──▶ axum catch-all ──▶ gateway ──▶ pooled reqwest client ──▶ upstream
//!                                   │
//!   client ◀── text/html? rewrite ◀─┘   (links/forms → proxy, ™ after 6-letter words)
//!              otherwise raw bytes
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use hn_proxy::config::{load_config, Overrides};
use hn_proxy::lifecycle::{signals, startup, Shutdown};
use hn_proxy::observability::logging;

#[derive(Parser, Debug)]
#[command(name = "hn-proxy", version)]
#[command(about = "HTML-rewriting forward proxy for one upstream", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "HNPROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Host to bind.
    #[arg(long, env = "HNPROXY_HOST")]
    host: Option<String>,

    /// Port to bind.
    #[arg(short, long, env = "HNPROXY_PORT")]
    port: Option<u16>,

    /// Upstream base URL (http:// or https://).
    #[arg(short, long, env = "HNPROXY_UPSTREAM")]
    upstream: Option<String>,

    /// Upstream timeout in seconds.
    #[arg(long, env = "HNPROXY_TIMEOUT")]
    timeout: Option<f64>,

    /// Maximum request/response body size in bytes.
    #[arg(long, env = "HNPROXY_MAX_BODY_SIZE")]
    max_body_size: Option<usize>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "HNPROXY_LOG_LEVEL")]
    log_level: Option<String>,

    /// Externally visible base URL used when rewriting links.
    #[arg(long, env = "HNPROXY_PUBLIC_URL")]
    public_url: Option<String>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            host: self.host.clone(),
            port: self.port,
            upstream: self.upstream.clone(),
            timeout_secs: self.timeout,
            max_body_size: self.max_body_size,
            log_level: self.log_level.clone(),
            public_url: self.public_url.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref(), cli.overrides()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("hn-proxy: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&config.observability) {
        eprintln!("hn-proxy: failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "hn-proxy starting");

    let shutdown = Shutdown::new();
    signals::spawn_signal_watcher(shutdown.clone());

    match startup::run(config, &shutdown).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "hn-proxy failed");
            ExitCode::FAILURE
        }
    }
}
