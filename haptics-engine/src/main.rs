//! Haptics Engine (haptics-engine) - Main entry point
//!
//! Drives a `HapticEngine` on the simulated backend from JSON-lines
//! commands on stdin, one reply per line on stdout. Logs go to stderr (or
//! the configured log file).
//!
//! Request:  `{"method": "playWaveform", "args": {"timings": [100], "amplitudes": [255]}}`
//! Reply:    `{"ok": null}` or `{"error": {"code": "...", "message": "..."}}`

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use haptics_common::config::{ConfigOverrides, ConfigResolver, EngineConfig};
use haptics_common::events::CapabilityTier;
use haptics_engine::asset::FsAssetSource;
use haptics_engine::backend::SimulatedBackend;
use haptics_engine::command::Command;
use haptics_engine::HapticEngine;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for haptics-engine
#[derive(Parser, Debug)]
#[command(name = "haptics-engine")]
#[command(about = "Haptic pattern playback engine driven by JSON-lines commands")]
#[command(version)]
struct Args {
    /// Path to TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory pattern files are resolved against
    #[arg(short, long)]
    asset_root: Option<PathBuf>,

    /// Log level (overrides config file)
    #[arg(long)]
    log_level: Option<String>,

    /// Capability tier the simulated device reports
    #[arg(long, default_value = "full")]
    tier: CapabilityTier,

    /// Simulated device lacks native pattern parsing
    #[arg(long)]
    legacy_patterns: bool,
}

/// One line of input
#[derive(Debug, Deserialize)]
struct Request {
    method: String,
    #[serde(default)]
    args: Value,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = resolve_config(&args, std::io::stderr)?;
    init_tracing(&config)?;

    info!("Starting haptics engine (tier: {})", args.tier);
    info!("Asset root: {}", config.asset_root.display());

    let mut backend =
        SimulatedBackend::with_tier(args.tier).with_auto_complete(config.simulated_completion);
    if args.legacy_patterns {
        backend = backend.with_legacy_patterns();
    }

    let engine = HapticEngine::new(
        Arc::new(backend),
        Arc::new(FsAssetSource::new(config.asset_root.clone())),
        config,
    )
    .context("Failed to initialize haptic engine")?;
    info!("Haptic engine initialized");

    let mut events = engine.subscribe_events();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => info!(event = event.event_type(), "{}", json),
                    Err(e) => warn!("Failed to serialize event: {}", e),
                },
                Err(RecvError::Lagged(skipped)) => warn!("Event log lagged by {} events", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    info!("Input closed");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let reply = handle_line(&engine, &line).await;
                stdout.write_all(reply.to_string().as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
            _ = &mut shutdown => break,
        }
    }

    engine.release().await;
    info!("Shutdown complete");
    Ok(())
}

/// Parse, dispatch and render one request line
async fn handle_line(engine: &HapticEngine, line: &str) -> Value {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            return json!({
                "error": { "code": "INVALID_ARGS", "message": format!("Malformed request: {}", e) }
            })
        }
    };
    debug!("Request: {}", request.method);

    let result = match Command::from_method_call(&request.method, &request.args) {
        Ok(command) => engine.dispatch(command).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(reply) => json!({ "ok": reply }),
        Err(e) => {
            warn!("{} failed: {}", request.method, e);
            json!({ "error": { "code": e.code(), "message": e.to_string() } })
        }
    }
}

/// Resolve the configuration under a temporary stderr subscriber
///
/// The final subscriber depends on the resolved logging section, so
/// resolution diagnostics (missing config file, asset root source) are
/// written through a bootstrap one at the CLI level.
fn resolve_config<W>(args: &Args, writer: W) -> Result<EngineConfig>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(level_filter(args.log_level.as_deref().unwrap_or("info"))?)
        .with_writer(writer)
        .finish();

    tracing::subscriber::with_default(bootstrap, || {
        ConfigResolver::new(ConfigOverrides {
            config_path: args.config.clone(),
            asset_root: args.asset_root.clone(),
            log_level: args.log_level.clone(),
        })
        .resolve()
    })
    .context("Failed to resolve configuration")
}

/// `RUST_LOG` if set, else `level` for both haptics crates
fn level_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(format!("haptics_engine={level},haptics_common={level}"))
            .with_context(|| format!("Invalid log level '{}'", level)),
    }
}

/// Install the global subscriber
///
/// `RUST_LOG` wins over the configured level. Output goes to stderr, or to
/// the configured log file without ANSI colors.
fn init_tracing(config: &EngineConfig) -> Result<()> {
    let filter = level_filter(&config.logging.level)?;

    let (stderr_layer, file_layer) = match &config.logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            (None, Some(layer))
        }
        None => (
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
            None,
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    /// Writer that collects formatted log output in memory
    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'w> MakeWriter<'w> for Capture {
        type Writer = Capture;

        fn make_writer(&'w self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_missing_config_warning_is_logged() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let args = Args::parse_from([
            "haptics-engine",
            "--config",
            missing.to_str().unwrap(),
            "--asset-root",
            dir.path().to_str().unwrap(),
        ]);

        let capture = Capture::default();
        let config = resolve_config(&args, capture.clone()).unwrap();
        assert_eq!(config.asset_root, dir.path());

        let output = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("not found, using defaults"), "log output: {}", output);
        assert!(output.contains("Asset root"), "log output: {}", output);
    }
}
