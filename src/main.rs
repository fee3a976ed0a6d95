//! bzx-service: AI correction/translation/chat backend for Rime
//!
//! Usage:
//!   bzx-service                       → serve on /tmp/bzx_rime_{req,resp}.txt
//!   bzx-service --config my.toml      → explicit config file
//!   bzx-service --debug               → verbose logging
//!   bzx-service --dump-config         → print the default config and exit

use anyhow::Context;
use bzx::{Service, ServiceContext};
use bzx_core::{config::API_KEY_ENV, BridgeConfig};
use clap::Parser;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const CONFIG_TOML: &str = "bzx_config.toml";
const CONFIG_JSON: &str = "bzx_config.json";
const LOG_PREFIX: &str = "bzx_service.log";
const LOG_FILES_KEPT: usize = 3;

#[derive(Parser)]
#[command(
    name = "bzx-service",
    about = "File-mailbox bridge from Rime to an AI chat endpoint",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    /// Config file (TOML or JSON). Default: bzx_config.toml next to the binary
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    /// Channel name; files are {name}_req.txt and {name}_resp.txt
    #[arg(long)]
    name: Option<String>,

    /// Directory for rotated log files
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Do not send the wake-up keystroke after responding
    #[arg(long, default_value_t = false)]
    no_notify: bool,

    /// Print the default config as TOML and exit
    #[arg(long, default_value_t = false)]
    dump_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.dump_config {
        print!("{}", BridgeConfig::default().to_toml());
        return Ok(());
    }

    let exe_dir = exe_dir();
    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(exe_dir.join(CONFIG_TOML));
    candidates.push(exe_dir.join(CONFIG_JSON));

    let loaded = BridgeConfig::load(&candidates);
    let mut config = loaded.config;
    config.apply_env();
    if cli.debug {
        config.debug = true;
    }
    if let Some(name) = cli.name {
        config.channel_name = name;
    }
    if let Some(dir) = cli.log_dir {
        config.log_dir = Some(dir);
    }
    if cli.no_notify {
        config.notify = false;
    }

    let log_dir = config.log_dir.clone().unwrap_or_else(|| exe_dir.clone());
    let _guard = init_tracing(config.debug, &log_dir);

    for warning in &loaded.warnings {
        warn!("{}", warning);
    }
    match &loaded.source {
        Some(path) => info!("Config: {}", path.display()),
        None => info!("Config: built-in defaults"),
    }

    info!("bzx-service {} starting", env!("CARGO_PKG_VERSION"));
    info!("API: {}", config.api_url);
    info!("Model: {}", config.model);
    info!("Channel: {}", config.channel_name);
    info!("Context aware: {}", config.context_aware);
    info!("Segmenter: {:?}", config.segmenter);
    info!("Logs: {}", log_dir.display());
    if config.api_key.is_empty() {
        warn!(
            "No API key configured (set api_key or {}); requests may be rejected",
            API_KEY_ENV
        );
    }

    let service = Service::new(ServiceContext::from_config(config));

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received");
        token.cancel();
    });

    service
        .run(cancel)
        .await
        .context("bridge service failed")?;
    info!("Service stopped");
    Ok(())
}

fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// stderr plus a daily rolling file. The returned guard flushes the file
/// writer and must live until exit.
fn init_tracing(debug: bool, log_dir: &Path) -> Option<WorkerGuard> {
    let default_filter = if debug { "warn,bzx=debug" } else { "warn,bzx=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_PREFIX)
        .max_log_files(LOG_FILES_KEPT)
        .build(log_dir);

    let (file_layer, guard) = match appender {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        Err(e) => {
            eprintln!("File logging disabled ({}): {}", log_dir.display(), e);
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Ctrl-C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("SIGTERM handler unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
