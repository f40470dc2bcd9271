//! Retap replay daemon entry point.
//!
//! Wires configuration, logging, the manipulation pipeline, and the JSON
//! replay plumbing together:
//!
//! ```text
//! main()
//!  └─ load_config()          -- explicit path argument or platform default
//!  └─ Pipeline::new()        -- stages built from the configured rule set
//!  └─ Dispatcher::spawn()    -- single pipeline-owner Tokio task
//!       ├─ stdin reader      -- producer thread admitting JSON lines
//!       └─ StdoutSink        -- forwarded entries re-encoded as JSON lines
//! ```
//!
//! The process exits when stdin is exhausted or on Ctrl-C; either path
//! tears the pipeline down without a partial flush.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use retap_daemon::config::{config_file_path, load_config};
use retap_daemon::replay::{spawn_stdin_reader, StdoutSink};
use retap_engine::{Clock, Dispatcher, EventSink, MonotonicClock, Pipeline};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Resolve the config file: explicit argument or the platform default.
    let config_path = match std::env::args_os().nth(1) {
        Some(path) => PathBuf::from(path),
        None => config_file_path().context("no config path argument and no platform default")?,
    };
    let config = load_config(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    // Initialise structured logging. Level comes from the config and is
    // overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.daemon.log_level.clone())),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(config = %config_path.display(), "retap daemon starting");

    let sink: Arc<dyn EventSink> = Arc::new(StdoutSink);
    let pipeline = Pipeline::new(&config.rules, sink).context("building pipeline")?;
    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
    let (handle, mut dispatcher) = Dispatcher::spawn(pipeline, Arc::clone(&clock));

    let reader = spawn_stdin_reader(handle.clone(), clock);

    info!("retap daemon ready; reading JSON events from stdin");

    // Run until the input stream ends or a shutdown signal arrives.
    tokio::select! {
        result = &mut dispatcher => {
            result.context("dispatcher task panicked")?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("installing Ctrl-C handler")?;
            info!("shutdown signal received");
            handle.shutdown();
            dispatcher.await.context("dispatcher task panicked")?;
        }
    }

    // The reader thread ends once stdin closes; do not block shutdown on a
    // still-open stdin.
    if reader.is_finished() {
        let _ = reader.join();
    }

    info!("retap daemon stopped");
    Ok(())
}
