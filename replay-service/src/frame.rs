//! Chart-ready views handed to the rendering layer once per replay step.

use std::{collections::BTreeMap, fmt};

use appliance_data::{Device, HourCategory};
use serde::Serialize;

/// Why a panel could not be rendered this step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    NoData,
    NoValidDevices,
    NoCurrentData,
    NoVoltageData,
    NoPeakPowerData,
    NoPeakCurrentData,
    NoCostData,
}

impl Notice {
    pub const fn message(self) -> &'static str {
        match self {
            Notice::NoData => "No data available to display.",
            Notice::NoValidDevices => "No valid data for selected devices.",
            Notice::NoCurrentData => "No current data for selected devices.",
            Notice::NoVoltageData => "No voltage data available.",
            Notice::NoPeakPowerData => "No data for peak/non-peak power usage.",
            Notice::NoPeakCurrentData => "No data for peak/non-peak current usage.",
            Notice::NoCostData => "No cost data available.",
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Panel<T> {
    Ready(T),
    Unavailable(Notice),
}

impl<T> Panel<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Panel::Ready(v) => Some(v),
            Panel::Unavailable(_) => None,
        }
    }

    pub fn notice(&self) -> Option<Notice> {
        match self {
            Panel::Ready(_) => None,
            Panel::Unavailable(n) => Some(*n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestReading {
    pub date: String,
    pub time: String,
    pub hour_category: HourCategory,
    pub power: BTreeMap<Device, f64>,
    pub current: BTreeMap<Device, f64>,
    pub voltage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub device: Device,
    pub values: Vec<Option<f64>>,
}

/// Line chart: one series per device over shared x labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendChart {
    pub unit: &'static str,
    pub labels: Vec<String>,
    pub series: Vec<Series>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoltageChart {
    pub labels: Vec<String>,
    pub values: Vec<Option<f64>>,
}

/// Two-bar chart: selected devices summed per side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionChart {
    pub unit: &'static str,
    pub peak: f64,
    pub non_peak: f64,
    pub peak_rows: usize,
    pub non_peak_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCostRow {
    pub date: String,
    pub costs: BTreeMap<Device, f64>,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub step: usize,
    pub visible_rows: usize,
    pub devices: Vec<Device>,
    pub latest: Panel<LatestReading>,
    pub power_trend: Panel<TrendChart>,
    pub current_trend: Panel<TrendChart>,
    pub voltage: Panel<VoltageChart>,
    pub peak_power: Panel<PartitionChart>,
    pub peak_current: Panel<PartitionChart>,
    pub daily_costs: Panel<Vec<DailyCostRow>>,
}

impl Frame {
    /// Frame for an empty window: every panel unavailable.
    pub fn no_data(step: usize, devices: Vec<Device>) -> Self {
        Self {
            step,
            visible_rows: 0,
            devices,
            latest: Panel::Unavailable(Notice::NoData),
            power_trend: Panel::Unavailable(Notice::NoData),
            current_trend: Panel::Unavailable(Notice::NoData),
            voltage: Panel::Unavailable(Notice::NoData),
            peak_power: Panel::Unavailable(Notice::NoData),
            peak_current: Panel::Unavailable(Notice::NoData),
            daily_costs: Panel::Unavailable(Notice::NoData),
        }
    }

    /// `(panel name, notice)` for every unavailable panel.
    pub fn notices(&self) -> Vec<(&'static str, Notice)> {
        [
            ("latest", self.latest.notice()),
            ("power_trend", self.power_trend.notice()),
            ("current_trend", self.current_trend.notice()),
            ("voltage", self.voltage.notice()),
            ("peak_power", self.peak_power.notice()),
            ("peak_current", self.peak_current.notice()),
            ("daily_costs", self.daily_costs.notice()),
        ]
        .into_iter()
        .filter_map(|(panel, notice)| notice.map(|n| (panel, n)))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panels_serialize_with_status_tag() {
        let ready: Panel<u32> = Panel::Ready(3);
        assert_eq!(serde_json::to_value(&ready).unwrap(), serde_json::json!({"status": "ready", "data": 3}));

        let missing: Panel<u32> = Panel::Unavailable(Notice::NoVoltageData);
        assert_eq!(
            serde_json::to_value(&missing).unwrap(),
            serde_json::json!({"status": "unavailable", "data": "no_voltage_data"})
        );
    }

    #[test]
    fn no_data_frame_reports_every_panel() {
        let frame = Frame::no_data(0, vec![Device::Pc]);
        let notices = frame.notices();
        assert_eq!(notices.len(), 7);
        assert!(notices.iter().all(|(_, n)| *n == Notice::NoData));
    }

    #[test]
    fn partition_notices_name_their_metric() {
        assert_eq!(Notice::NoPeakPowerData.to_string(), "No data for peak/non-peak power usage.");
        assert_eq!(Notice::NoPeakCurrentData.to_string(), "No data for peak/non-peak current usage.");
    }
}
