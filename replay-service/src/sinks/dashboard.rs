use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;

use crate::{
    frame::Frame,
    pipeline::{Envelope, PipelineError, Sink},
};

pub type FrameSender = watch::Sender<Option<Arc<Frame>>>;
pub type FrameReceiver = watch::Receiver<Option<Arc<Frame>>>;

pub fn frame_channel() -> (FrameSender, FrameReceiver) {
    watch::channel(None)
}

/// Hands each frame to the rendering layer: a log summary plus the latest
/// frame published on a watch channel for the dashboard server.
pub struct DashboardSink {
    frames: FrameSender,
}

impl DashboardSink {
    pub fn new(frames: FrameSender) -> Self {
        Self { frames }
    }

    fn render(&self, env: Envelope<Frame>) {
        let frame = env.payload;

        let latest = frame
            .latest
            .ready()
            .map(|l| format!("{} {}", l.date, l.time))
            .unwrap_or_default();
        let (peak_power, non_peak_power) = frame
            .peak_power
            .ready()
            .map(|p| (p.peak, p.non_peak))
            .unwrap_or_default();
        tracing::info!(
            step = frame.step,
            visible_rows = frame.visible_rows,
            latest = %latest,
            peak_power,
            non_peak_power,
            "frame rendered"
        );
        for (panel, notice) in frame.notices() {
            tracing::warn!(panel, %notice, "panel unavailable");
        }

        metrics::counter!("replay_frames_total").increment(1);
        metrics::gauge!("replay_visible_rows").set(frame.visible_rows as f64);
        if let Ok(latency) = std::time::SystemTime::now().duration_since(env.emitted_at) {
            metrics::histogram!("replay_frame_latency_seconds").record(latency.as_secs_f64());
        }

        // No receivers is fine: the dashboard server is optional.
        self.frames.send_replace(Some(Arc::new(frame)));
    }
}

#[async_trait::async_trait]
impl Sink<Frame> for DashboardSink {
    async fn run<S>(&self, mut input: S) -> Result<(), PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<Frame>, PipelineError>> + Send + Unpin + 'static,
    {
        let mut rendered = 0usize;

        while let Some(item) = input.next().await {
            let env = match item {
                Ok(env) => env,
                Err(e) => {
                    tracing::error!(error = %e, "error in upstream pipeline for DashboardSink");
                    continue;
                }
            };

            self.render(env);
            rendered += 1;
        }

        tracing::info!(frames = rendered, "replay stream closed");
        Ok(())
    }
}
