use std::net::SocketAddr;

use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static PROM_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder and serve `GET /metrics` on `bind_addr`.
pub fn init(bind_addr: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics bind address '{bind_addr}': {e}"))?;

    let handle = PrometheusBuilder::new().install_recorder()?;
    // Only the first call installs a recorder; later handles are dropped.
    let _ = PROM_HANDLE.set(handle);
    describe_metrics();

    tokio::spawn(async move {
        let app = Router::new().route("/metrics", get(metrics_handler));

        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                if let Err(e) = axum::serve(listener, app.into_make_service()).await {
                    tracing::error!(error = %e, "metrics server error");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to bind metrics listener");
            }
        }
    });

    Ok(())
}

fn describe_metrics() {
    metrics::describe_counter!("dataset_rows_loaded_total", "Rows parsed from the appliance dataset");
    metrics::describe_counter!("dataset_load_errors_total", "Dataset loads that failed");
    metrics::describe_counter!("replay_frames_total", "Frames handed to the rendering layer");
    metrics::describe_counter!("replay_unavailable_panels_total", "Panels reported unavailable, by panel");
    metrics::describe_gauge!("replay_visible_rows", "Rows in the current visible window");
    metrics::describe_histogram!("replay_frame_latency_seconds", "Time from window emission to render");
    metrics::describe_counter!("dashboard_settings_updates_total", "Accepted display settings updates");
}

async fn metrics_handler() -> String {
    PROM_HANDLE.get().map(PrometheusHandle::render).unwrap_or_default()
}
