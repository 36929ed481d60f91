use anyhow::{bail, Result};
use appliance_data::{
    queries::{self, Metric},
    Device,
};
use replay_service::{
    observability,
    sources::{appliance_csv::dataset_fingerprint, ApplianceCsvLoader, DataLocation},
};
use std::env;

/// Load an appliance dataset once and log its peak/non-peak and daily cost totals.
///
/// Usage:
///   dataset_summary <csv_path_or_url> [--day-first]
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(source) = args.iter().find(|a| !a.starts_with("--")) else {
        bail!("usage: dataset_summary <csv_path_or_url> [--day-first]");
    };
    let day_first = args.iter().any(|a| a == "--day-first");

    let dataset = ApplianceCsvLoader::new(DataLocation::parse(source), day_first).load().await?;
    let readings = dataset.readings();

    tracing::info!(
        rows = dataset.len(),
        fingerprint = %dataset_fingerprint(&dataset),
        first = %readings.first().map(|r| r.label()).unwrap_or_default(),
        last = %readings.last().map(|r| r.label()).unwrap_or_default(),
        "dataset summary"
    );

    let columns = dataset.columns();
    for (metric, devices) in [(Metric::Power, &columns.power), (Metric::Current, &columns.current)] {
        let totals = queries::partition_totals(readings, devices, metric);
        tracing::info!(
            metric = ?metric,
            unit = metric.unit(),
            peak = totals.peak,
            non_peak = totals.non_peak,
            peak_rows = totals.peak_rows,
            non_peak_rows = totals.non_peak_rows,
            "peak vs non-peak"
        );
    }

    for day in queries::daily_costs(readings, &columns.costs) {
        tracing::info!(
            date = %day.date,
            fan = day.costs.get(&Device::TableFan).copied().unwrap_or_default(),
            pc = day.costs.get(&Device::Pc).copied().unwrap_or_default(),
            tv = day.costs.get(&Device::Tv).copied().unwrap_or_default(),
            total = day.total(),
            "daily cost"
        );
    }

    Ok(())
}
