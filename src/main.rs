//! Sniff Mux command line tool
//!
//! Runs the multiplexer until Ctrl+C.

use std::path::PathBuf;

use clap::Parser;
use log::{info, warn};

use sniff_mux::common::{init_logger, MuxError, Result};
use sniff_mux::config::{load_config, ConfigOverrides, ConfigValidator};
use sniff_mux::{Mux, APP_NAME, VERSION};

/// Sniff Mux: route HTTP and TLS arriving on one port to separate backends
#[derive(Parser, Debug)]
#[command(author, version = VERSION, about, long_about = None)]
struct Args {
    /// JSON configuration file (defaults to sniff-mux.json if present)
    #[arg(short, long, env = "SNIFF_MUX_CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(short, long)]
    listen: Option<String>,

    /// Backend for plaintext connections
    #[arg(long)]
    plaintext_backend: Option<String>,

    /// Backend for TLS connections
    #[arg(long)]
    tls_backend: Option<String>,

    /// How long to wait for the first byte, in milliseconds
    #[arg(long)]
    classify_timeout_ms: Option<u64>,

    /// Backend connect timeout in seconds
    #[arg(long)]
    connect_timeout: Option<u64>,

    /// Relay buffer size in bytes
    #[arg(long)]
    buffer_size: Option<usize>,

    /// Listen backlog
    #[arg(long)]
    backlog: Option<u32>,

    /// Seconds to wait for in-flight connections on shutdown
    #[arg(long)]
    shutdown_timeout: Option<u64>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            listen: self.listen.clone(),
            plaintext_backend: self.plaintext_backend.clone(),
            tls_backend: self.tls_backend.clone(),
            classify_timeout_ms: self.classify_timeout_ms,
            connect_timeout: self.connect_timeout,
            buffer_size: self.buffer_size,
            backlog: self.backlog,
            shutdown_timeout: self.shutdown_timeout,
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref(), &args.overrides())?;
    config.validate()?;

    if args.print_config {
        let json = serde_json::to_string_pretty(&config)
            .map_err(|e| MuxError::Other(format!("Failed to serialize configuration: {}", e)))?;
        println!("{}", json);
        return Ok(());
    }

    init_logger(&config.log_level);
    info!("Starting {} v{}", APP_NAME, VERSION);

    for warning in config.check_warnings() {
        warn!("{}", warning);
    }

    let handle = Mux::new(config).start()?;
    info!("Multiplexer ready on {}, press Ctrl+C to stop", handle.local_addr());

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Ctrl+C received, shutting down");
            handle.shutdown().await?;
            handle.wait().await
        }
        // Only a fatal error ends the loop without a shutdown request
        result = handle.wait() => result,
    }
}
