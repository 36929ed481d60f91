use std::collections::BTreeSet;

use super::{Device, Reading};

/// Optional columns found in the source header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Columns {
    pub power: BTreeSet<Device>,
    pub current: BTreeSet<Device>,
    pub costs: BTreeSet<Device>,
    pub voltage: bool,
}

impl Columns {
    pub const VOLTAGE: &'static str = "Voltage";

    pub fn full() -> Self {
        Self {
            power: Device::ALL.into_iter().collect(),
            current: Device::ALL.into_iter().collect(),
            costs: Device::ALL.into_iter().collect(),
            voltage: true,
        }
    }

    pub fn from_headers<'a>(headers: impl IntoIterator<Item = &'a str>) -> Self {
        let headers: Vec<&str> = headers.into_iter().map(str::trim).collect();
        let has = |name: &str| headers.contains(&name);

        Self {
            power: Device::ALL.into_iter().filter(|d| has(d.power_column())).collect(),
            current: Device::ALL.into_iter().filter(|d| has(d.current_column())).collect(),
            costs: Device::ALL.into_iter().filter(|d| has(d.cost_column())).collect(),
            voltage: has(Self::VOLTAGE),
        }
    }
}

/// The whole table, loaded once and never mutated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Columns,
    readings: Vec<Reading>,
}

impl Dataset {
    pub fn new(columns: Columns, readings: Vec<Reading>) -> Self {
        Self { columns, readings }
    }

    pub fn columns(&self) -> &Columns {
        &self.columns
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}
