//! Handler for the `run` command: the long-running scan loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tracing::{info, warn};

use crate::app::{App, Config, StatusWriter};
use crate::breaker::BreakerConfig;
use crate::cli::{banner, BreakerPreset, RunArgs};
use crate::engine::ScanOptions;
use crate::error::Result;

/// Execute the `run` command: build the engine, start the breaker's
/// monitoring loop and (if configured) the real-time price-update path,
/// then loop scan cycles on `scan_interval_ms` until Ctrl+C.
pub async fn execute(config_path: &std::path::Path, args: &RunArgs) -> Result<()> {
    let mut config = Config::load(config_path)?;
    if args.json_logs {
        config.logging.format = "json".to_string();
    }
    if let Some(interval) = args.scan_interval_ms {
        config.engine.scan_interval_ms = interval;
    }
    if let Some(preset) = args.breaker_preset {
        config.breaker = match preset {
            BreakerPreset::Conservative => BreakerConfig::conservative(),
            BreakerPreset::Moderate => BreakerConfig::moderate(),
            BreakerPreset::Aggressive => BreakerConfig::aggressive(),
        };
    }
    config.init_logging();

    if !args.no_banner {
        banner::print_banner();
    }

    info!(venues = ?config.engine.venues, "arbitrex starting");

    let app = App::build(&config).await?;
    app.breaker.start_monitoring();
    app.engine.start_realtime();

    let status_writer = config.status_file.clone().map(|path| Arc::new(StatusWriter::new(path, config.engine.venues.clone())));

    let scan_interval = Duration::from_millis(config.engine.scan_interval_ms);
    let engine = Arc::clone(&app.engine);
    let breaker = Arc::clone(&app.breaker);
    let writer = status_writer.clone();

    let loop_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(scan_interval);
        loop {
            interval.tick().await;
            let found = engine.scan(&ScanOptions::default()).await;
            info!(found = found.len(), active = engine.get_active().len(), "scan cycle complete");

            if let Some(writer) = &writer {
                let state = breaker.get_state(&crate::breaker::BreakerScope::Global);
                writer.update_breaker(state.tripped, 0);
                writer.update_runtime(engine.get_active().len(), found.len());
                if let Err(e) = writer.write() {
                    warn!(error = %e, "failed to write status file");
                }
            }
        }
    });

    signal::ctrl_c().await.ok();
    info!("shutdown signal received");

    loop_task.abort();
    app.engine.stop_realtime().await;
    app.breaker.stop_monitoring();

    info!("arbitrex stopped");
    Ok(())
}
