use anyhow::Result;
use replay_service::{
    config::AppConfig,
    dashboard_server::{self, DashboardState},
    frame::Frame,
    metrics_server,
    observability,
    pipeline::Pipeline,
    sinks::{frame_channel, DashboardSink},
    sources::{ApplianceCsvLoader, DataLocation, ReplaySource, Window},
    transform::FrameBuilder,
};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

// One thread: load, then step/compute/render/sleep. The HTTP servers share it.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    // A dataset that cannot be loaded aborts startup.
    let loader = ApplianceCsvLoader::new(DataLocation::parse(&cfg.dataset.source), cfg.dataset.day_first);
    let dataset = Arc::new(loader.load().await?);

    let (settings_tx, settings_rx) = watch::channel(cfg.display.clone());
    let settings_tx = Arc::new(settings_tx);
    let (frames_tx, frames_rx) = frame_channel();

    if let Some(dashboard_cfg) = &cfg.dashboard {
        dashboard_server::spawn(&dashboard_cfg.bind_addr, DashboardState::new(settings_tx.clone(), frames_rx)).await?;
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("interrupt received, stopping replay"),
                Err(e) => tracing::error!(error = %e, "failed to listen for interrupt"),
            }
            cancel.cancel();
        });
    }

    tracing::info!(
        mode = ?cfg.replay.mode,
        rows = dataset.len(),
        interval_seconds = cfg.display.interval_seconds,
        "starting replay"
    );

    let pipeline: Pipeline<_, Window, Frame, _> = Pipeline {
        source: ReplaySource::new(dataset, cfg.replay.mode, settings_rx, cancel),
        transform: Arc::new(FrameBuilder::new(cfg.replay.trailing_limit())),
        sink: DashboardSink::new(frames_tx),
    };

    pipeline.run().await?;

    Ok(())
}
