use std::sync::Arc;

use appliance_data::{Dataset, Reading};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{
    config::{DisplaySettings, ReplayMode},
    pipeline::{Envelope, EnvelopeStream, PipelineError, Source},
};

/// The rows exposed to the renderer at one replay step.
#[derive(Debug, Clone)]
pub struct Window {
    pub step: usize,
    pub visible_rows: usize,
    pub dataset: Arc<Dataset>,
    /// Settings snapshot taken at the top of this step.
    pub settings: DisplaySettings,
}

impl Window {
    pub fn readings(&self) -> &[Reading] {
        &self.dataset.readings()[..self.visible_rows]
    }

    pub fn is_empty(&self) -> bool {
        self.visible_rows == 0
    }
}

/// Replays an in-memory dataset as a stream of windows, sleeping between steps.
///
/// Stops when the mode runs out of rows, when a fixed window turns out empty,
/// or when `cancel` fires.
pub struct ReplaySource {
    dataset: Arc<Dataset>,
    mode: ReplayMode,
    settings: watch::Receiver<DisplaySettings>,
    cancel: CancellationToken,
}

impl ReplaySource {
    pub fn new(
        dataset: Arc<Dataset>,
        mode: ReplayMode,
        settings: watch::Receiver<DisplaySettings>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            dataset,
            mode,
            settings,
            cancel,
        }
    }
}

#[async_trait::async_trait]
impl Source<Window> for ReplaySource {
    async fn stream(&self) -> EnvelopeStream<Window> {
        let dataset = self.dataset.clone();
        let mode = self.mode;
        let settings_rx = self.settings.clone();
        let cancel = self.cancel.clone();

        let s = async_stream::stream! {
            let mut step = 0usize;
            loop {
                if cancel.is_cancelled() {
                    tracing::info!(step, "replay cancelled");
                    break;
                }

                let Some(visible_rows) = mode.visible_rows(step, dataset.len()) else {
                    tracing::info!(steps = step, "replay finished");
                    break;
                };

                let settings = DisplaySettings::clone(&settings_rx.borrow());
                let interval = settings.interval();
                let window = Window {
                    step,
                    visible_rows,
                    dataset: dataset.clone(),
                    settings,
                };
                yield Ok::<_, PipelineError>(Envelope::now(window));

                if visible_rows == 0 {
                    tracing::warn!("no data available to display, stopping replay");
                    break;
                }
                if mode == ReplayMode::Progressive && visible_rows == dataset.len() {
                    tracing::info!(steps = step + 1, "replay finished");
                    break;
                }

                step += 1;
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!(step, "replay cancelled");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        };

        Box::pin(s)
    }
}
