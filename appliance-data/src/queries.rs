use std::collections::{BTreeMap, BTreeSet};

use time::Date;

use crate::domain::{Device, HourCategory, Reading};

/// Which per-device value of a reading to aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Power,
    Current,
    Cost,
}

impl Metric {
    pub const fn unit(self) -> &'static str {
        match self {
            Metric::Power => "kWh",
            Metric::Current => "A",
            Metric::Cost => "cost",
        }
    }

    pub fn value(self, reading: &Reading, device: Device) -> Option<f64> {
        let values = match self {
            Metric::Power => &reading.power,
            Metric::Current => &reading.current,
            Metric::Cost => &reading.costs,
        };
        values.get(&device).copied()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PartitionTotals {
    pub peak: f64,
    pub non_peak: f64,
    pub peak_rows: usize,
    pub non_peak_rows: usize,
}

impl PartitionTotals {
    pub fn total(&self) -> f64 {
        self.peak + self.non_peak
    }

    pub fn is_empty(&self) -> bool {
        self.peak_rows == 0 && self.non_peak_rows == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyCost {
    pub date: Date,
    pub costs: BTreeMap<Device, f64>,
}

impl DailyCost {
    pub fn total(&self) -> f64 {
        self.costs.values().sum()
    }
}

/// The last `limit` readings, or all of them when `limit` is `None`.
pub fn trailing(readings: &[Reading], limit: Option<usize>) -> &[Reading] {
    match limit {
        Some(n) if n < readings.len() => &readings[readings.len() - n..],
        _ => readings,
    }
}

/// Split readings into (Peak, Non-Peak), preserving order.
pub fn partition(readings: &[Reading]) -> (Vec<&Reading>, Vec<&Reading>) {
    readings.iter().partition(|r| r.hour_category == HourCategory::Peak)
}

/// Sum of `metric` over `devices` for one set of readings. Missing values count as zero.
pub fn sum<'a>(readings: impl IntoIterator<Item = &'a Reading>, devices: &BTreeSet<Device>, metric: Metric) -> f64 {
    readings
        .into_iter()
        .flat_map(|r| devices.iter().filter_map(move |d| metric.value(r, *d)))
        .sum()
}

/// Peak and Non-Peak sums of `metric` across `devices`, one scalar per side.
pub fn partition_totals(readings: &[Reading], devices: &BTreeSet<Device>, metric: Metric) -> PartitionTotals {
    let (peak, non_peak) = partition(readings);

    PartitionTotals {
        peak: sum(peak.iter().copied(), devices, metric),
        non_peak: sum(non_peak.iter().copied(), devices, metric),
        peak_rows: peak.len(),
        non_peak_rows: non_peak.len(),
    }
}

/// Cost columns of `devices` summed per calendar date, dates ascending.
pub fn daily_costs(readings: &[Reading], devices: &BTreeSet<Device>) -> Vec<DailyCost> {
    let mut by_date: BTreeMap<Date, BTreeMap<Device, f64>> = BTreeMap::new();

    for r in readings {
        let day = by_date.entry(r.calendar_date()).or_default();
        for device in devices {
            *day.entry(*device).or_insert(0.0) += Metric::Cost.value(r, *device).unwrap_or(0.0);
        }
    }

    by_date
        .into_iter()
        .map(|(date, costs)| DailyCost { date, costs })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use time::{macros::date, PrimitiveDateTime, Time};

    fn reading(day: Date, hour: u8, pc_power: f64) -> Reading {
        let ts = PrimitiveDateTime::new(day, Time::from_hms(hour, 0, 0).unwrap());
        let mut r = Reading::new(day.to_string(), format!("{hour:02}:00:00"), ts);
        r.power.insert(Device::Pc, pc_power);
        r.current.insert(Device::Pc, pc_power / 10.0);
        r.costs.insert(Device::Pc, pc_power * 0.5);
        r.costs.insert(Device::Tv, 1.0);
        r
    }

    fn pc() -> BTreeSet<Device> {
        BTreeSet::from([Device::Pc])
    }

    #[test]
    fn partition_totals_split_on_peak_hours() {
        let day = date!(2024 - 03 - 01);
        let readings: Vec<Reading> = [(7, 1.0), (8, 2.0), (17, 3.0), (18, 4.0)]
            .into_iter()
            .map(|(h, p)| reading(day, h, p))
            .collect();

        let totals = partition_totals(&readings, &pc(), Metric::Power);

        assert_relative_eq!(totals.peak, 5.0);
        assert_relative_eq!(totals.non_peak, 5.0);
        assert_eq!(totals.peak_rows, 2);
        assert_eq!(totals.non_peak_rows, 2);
    }

    #[test]
    fn partition_is_a_disjoint_cover_for_every_prefix() {
        let day = date!(2024 - 03 - 01);
        let readings: Vec<Reading> = (0u8..24).map(|h| reading(day, h, f64::from(h) * 1.5)).collect();

        for end in 0..=readings.len() {
            let window = &readings[..end];
            let totals = partition_totals(window, &pc(), Metric::Power);
            assert_relative_eq!(totals.total(), sum(window, &pc(), Metric::Power));
            assert_eq!(totals.peak_rows + totals.non_peak_rows, window.len());
        }
    }

    #[test]
    fn missing_devices_contribute_zero() {
        let readings = vec![reading(date!(2024 - 03 - 01), 9, 2.0)];
        let devices = BTreeSet::from([Device::Pc, Device::TableFan]);

        let totals = partition_totals(&readings, &devices, Metric::Power);
        assert_relative_eq!(totals.peak, 2.0);

        let empty = partition_totals(&[], &devices, Metric::Power);
        assert!(empty.is_empty());
    }

    #[test]
    fn trailing_keeps_last_rows() {
        let day = date!(2024 - 03 - 01);
        let readings: Vec<Reading> = (0u8..5).map(|h| reading(day, h, 1.0)).collect();

        assert_eq!(trailing(&readings, Some(2)).len(), 2);
        assert_eq!(trailing(&readings, Some(2))[0].timestamp.hour(), 3);
        assert_eq!(trailing(&readings, Some(10)).len(), 5);
        assert_eq!(trailing(&readings, None).len(), 5);
    }

    #[test]
    fn daily_costs_group_by_calendar_date() {
        let readings = vec![
            reading(date!(2024 - 03 - 01), 7, 2.0),
            reading(date!(2024 - 03 - 01), 20, 4.0),
            reading(date!(2024 - 03 - 02), 9, 6.0),
        ];
        let devices = BTreeSet::from([Device::Pc, Device::Tv]);

        let days = daily_costs(&readings, &devices);

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, date!(2024 - 03 - 01));
        assert_relative_eq!(days[0].costs[&Device::Pc], 3.0);
        assert_relative_eq!(days[0].costs[&Device::Tv], 2.0);
        assert_relative_eq!(days[0].total(), 5.0);
        assert_relative_eq!(days[1].costs[&Device::Pc], 3.0);
    }
}
