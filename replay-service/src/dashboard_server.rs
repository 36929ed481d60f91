use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use tokio::sync::watch;
use tokio_stream::{wrappers::WatchStream, Stream, StreamExt};

use crate::{config::DisplaySettings, sinks::FrameReceiver};

/// Shared between handlers: the settings writer and the latest published frame.
#[derive(Clone)]
pub struct DashboardState {
    settings: Arc<watch::Sender<DisplaySettings>>,
    frames: FrameReceiver,
}

impl DashboardState {
    pub fn new(settings: Arc<watch::Sender<DisplaySettings>>, frames: FrameReceiver) -> Self {
        Self { settings, frames }
    }
}

pub fn router(state: DashboardState) -> Router {
    Router::new()
        .route("/settings", get(get_settings).put(put_settings))
        .route("/frame", get(latest_frame))
        .route("/frames/stream", get(frame_stream))
        .with_state(state)
}

/// Bind `bind_addr` and serve the dashboard API in the background.
pub async fn spawn(bind_addr: &str, state: DashboardState) -> anyhow::Result<SocketAddr> {
    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid dashboard bind address '{bind_addr}': {e}"))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    let app = router(state);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app.into_make_service()).await {
            tracing::error!(error = %e, "dashboard server error");
        }
    });

    tracing::info!(addr = %local_addr, "dashboard server listening");
    Ok(local_addr)
}

async fn get_settings(State(state): State<DashboardState>) -> Json<DisplaySettings> {
    Json(state.settings.borrow().clone())
}

/// Replace the display settings. Picked up at the next replay step.
async fn put_settings(
    State(state): State<DashboardState>,
    Json(settings): Json<DisplaySettings>,
) -> Result<StatusCode, (StatusCode, String)> {
    if let Err(e) = settings.validate() {
        tracing::warn!(error = %e, "rejected display settings");
        return Err((StatusCode::BAD_REQUEST, e.to_string()));
    }

    tracing::info!(
        devices = ?settings.devices,
        interval_seconds = settings.interval_seconds,
        "display settings updated"
    );
    metrics::counter!("dashboard_settings_updates_total").increment(1);
    state.settings.send_replace(settings);

    Ok(StatusCode::NO_CONTENT)
}

async fn latest_frame(State(state): State<DashboardState>) -> Response {
    let frame = state.frames.borrow().clone();
    match frame {
        Some(frame) => Json(&*frame).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn frame_stream(State(state): State<DashboardState>) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = WatchStream::new(state.frames.clone())
        .filter_map(|frame| frame)
        .map(|frame| Event::default().event("frame").json_data(&*frame));

    Sse::new(stream).keep_alive(KeepAlive::default())
}
