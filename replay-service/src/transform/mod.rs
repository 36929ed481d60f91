use std::collections::BTreeSet;

use appliance_data::{
    queries::{self, Metric},
    Device, Reading,
};

use crate::{
    frame::{DailyCostRow, Frame, LatestReading, Notice, Panel, PartitionChart, Series, TrendChart, VoltageChart},
    pipeline::{Envelope, PipelineError, Transform},
    sources::Window,
};

/// Pure computation of every view over one visible window.
///
/// Rules:
/// - trend charts keep the trailing `trailing_rows` rows of the window;
/// - device filters only keep devices whose column exists in the dataset;
/// - peak/non-peak totals and daily costs cover the whole window.
pub fn build_frame(window: &Window, trailing_rows: Option<usize>) -> Frame {
    let devices: Vec<Device> = window.settings.devices.iter().copied().collect();
    let rows = window.readings();
    let Some(last) = rows.last() else {
        return Frame::no_data(window.step, devices);
    };

    let columns = window.dataset.columns();
    let selected = &window.settings.devices;
    let power_devices: BTreeSet<Device> = selected.intersection(&columns.power).copied().collect();
    let current_devices: BTreeSet<Device> = selected.intersection(&columns.current).copied().collect();

    let tail = queries::trailing(rows, trailing_rows);

    let power_trend = if power_devices.is_empty() {
        Panel::Unavailable(Notice::NoValidDevices)
    } else {
        Panel::Ready(trend(tail, &power_devices, Metric::Power))
    };

    let current_trend = if current_devices.is_empty() {
        Panel::Unavailable(Notice::NoCurrentData)
    } else {
        Panel::Ready(trend(tail, &current_devices, Metric::Current))
    };

    let voltage = if rows.iter().all(|r| r.voltage.is_none()) {
        Panel::Unavailable(Notice::NoVoltageData)
    } else {
        Panel::Ready(VoltageChart {
            labels: tail.iter().map(Reading::label).collect(),
            values: tail.iter().map(|r| r.voltage).collect(),
        })
    };

    let daily_costs = if columns.costs.is_empty() {
        Panel::Unavailable(Notice::NoCostData)
    } else {
        Panel::Ready(
            queries::daily_costs(rows, &columns.costs)
                .into_iter()
                .map(|day| DailyCostRow {
                    date: day.date.to_string(),
                    total: day.total(),
                    costs: day.costs,
                })
                .collect(),
        )
    };

    Frame {
        step: window.step,
        visible_rows: rows.len(),
        devices,
        latest: Panel::Ready(LatestReading {
            date: last.date.clone(),
            time: last.time.clone(),
            hour_category: last.hour_category,
            power: last.power.clone(),
            current: last.current.clone(),
            voltage: last.voltage,
        }),
        power_trend,
        current_trend,
        voltage,
        peak_power: partition_panel(rows, &power_devices, Metric::Power, Notice::NoPeakPowerData),
        peak_current: partition_panel(rows, &current_devices, Metric::Current, Notice::NoPeakCurrentData),
        daily_costs,
    }
}

fn trend(rows: &[Reading], devices: &BTreeSet<Device>, metric: Metric) -> TrendChart {
    TrendChart {
        unit: metric.unit(),
        labels: rows.iter().map(Reading::label).collect(),
        series: devices
            .iter()
            .map(|device| Series {
                device: *device,
                values: rows.iter().map(|r| metric.value(r, *device)).collect(),
            })
            .collect(),
    }
}

fn partition_panel(
    rows: &[Reading],
    devices: &BTreeSet<Device>,
    metric: Metric,
    empty: Notice,
) -> Panel<PartitionChart> {
    let totals = queries::partition_totals(rows, devices, metric);
    if totals.is_empty() {
        return Panel::Unavailable(empty);
    }

    Panel::Ready(PartitionChart {
        unit: metric.unit(),
        peak: totals.peak,
        non_peak: totals.non_peak,
        peak_rows: totals.peak_rows,
        non_peak_rows: totals.non_peak_rows,
    })
}

#[derive(Clone, Default)]
pub struct FrameBuilder {
    trailing_rows: Option<usize>,
}

impl FrameBuilder {
    pub fn new(trailing_rows: Option<usize>) -> Self {
        Self { trailing_rows }
    }
}

#[async_trait::async_trait]
impl Transform<Window, Frame> for FrameBuilder {
    async fn apply(&self, input: Envelope<Window>) -> Result<Envelope<Frame>, PipelineError> {
        let frame = build_frame(&input.payload, self.trailing_rows);

        for (panel, notice) in frame.notices() {
            metrics::counter!("replay_unavailable_panels_total", "panel" => panel).increment(1);
            tracing::debug!(panel, %notice, step = frame.step, "panel unavailable");
        }

        Ok(Envelope {
            payload: frame,
            emitted_at: input.emitted_at,
        })
    }
}
