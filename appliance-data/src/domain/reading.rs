use std::{collections::BTreeMap, fmt};

use time::{Date, PrimitiveDateTime};

use super::Device;

/// Time-of-day pricing bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HourCategory {
    Peak,
    #[cfg_attr(feature = "serde", serde(rename = "Non-Peak"))]
    NonPeak,
}

impl HourCategory {
    pub const PEAK_START_HOUR: u8 = 8;
    pub const PEAK_END_HOUR: u8 = 18;

    /// Peak iff `8 <= hour < 18`.
    pub const fn from_hour(hour: u8) -> Self {
        if hour >= Self::PEAK_START_HOUR && hour < Self::PEAK_END_HOUR {
            HourCategory::Peak
        } else {
            HourCategory::NonPeak
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            HourCategory::Peak => "Peak",
            HourCategory::NonPeak => "Non-Peak",
        }
    }
}

impl fmt::Display for HourCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the appliance dataset.
///
/// Maps only hold entries for columns the source carried and cells that were
/// not empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub date: String,
    pub time: String,
    pub timestamp: PrimitiveDateTime,
    pub power: BTreeMap<Device, f64>,
    pub current: BTreeMap<Device, f64>,
    pub voltage: Option<f64>,
    pub costs: BTreeMap<Device, f64>,
    pub hour_category: HourCategory,
}

impl Reading {
    pub fn new(date: impl Into<String>, time: impl Into<String>, timestamp: PrimitiveDateTime) -> Self {
        Self {
            date: date.into(),
            time: time.into(),
            timestamp,
            power: BTreeMap::new(),
            current: BTreeMap::new(),
            voltage: None,
            costs: BTreeMap::new(),
            hour_category: HourCategory::from_hour(timestamp.hour()),
        }
    }

    pub fn calendar_date(&self) -> Date {
        self.timestamp.date()
    }

    /// `Date Time` as written in the source, used as a chart axis label.
    pub fn label(&self) -> String {
        format!("{} {}", self.date, self.time)
    }
}
