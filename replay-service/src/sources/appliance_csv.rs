use std::{
    collections::{BTreeMap, BTreeSet},
    fs::File,
    io::Read,
    path::PathBuf,
};

use appliance_data::{Columns, Dataset, Device, Reading};
use csv::StringRecord;
use time::{macros::format_description, Date, PrimitiveDateTime, Time};

use crate::pipeline::PipelineError;

/// Where the dataset lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataLocation {
    File(PathBuf),
    Url(String),
}

impl DataLocation {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            DataLocation::Url(trimmed.to_string())
        } else {
            DataLocation::File(PathBuf::from(trimmed))
        }
    }
}

/// Loader for the appliance readings CSV.
///
/// Expected header columns (by name):
/// - Date, Time (required)
/// - Table Fan, PC, TV (power, kWh)
/// - Table Fan Current, PC Current, TV Current (A)
/// - Voltage (V)
/// - Fan Cost, PC Cost, TV Cost
///
/// Device columns and `Voltage` may be missing; the affected views then report
/// themselves unavailable during replay.
pub struct ApplianceCsvLoader {
    location: DataLocation,
    day_first: bool,
}

impl ApplianceCsvLoader {
    pub fn new(location: DataLocation, day_first: bool) -> Self {
        Self { location, day_first }
    }

    pub async fn load(&self) -> Result<Dataset, PipelineError> {
        let res = match &self.location {
            DataLocation::File(path) => {
                // Blocking read; the file is loaded once before the replay starts.
                File::open(path)
                    .map_err(|e| PipelineError::Source(format!("failed to open CSV file {}: {e}", path.display())))
                    .and_then(|file| read_dataset(file, self.day_first))
            }
            DataLocation::Url(url) => match fetch(url).await {
                Ok(body) => read_dataset(body.as_slice(), self.day_first),
                Err(e) => Err(e),
            },
        };

        match res {
            Ok(dataset) => {
                metrics::counter!("dataset_rows_loaded_total").increment(dataset.len() as u64);
                tracing::info!(
                    rows = dataset.len(),
                    fingerprint = %dataset_fingerprint(&dataset),
                    "dataset loaded"
                );
                Ok(dataset)
            }
            Err(e) => {
                metrics::counter!("dataset_load_errors_total").increment(1);
                Err(e)
            }
        }
    }
}

async fn fetch(url: &str) -> Result<Vec<u8>, PipelineError> {
    let response = reqwest::get(url)
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| PipelineError::Source(format!("failed to fetch {url}: {e}")))?;
    let body = response
        .bytes()
        .await
        .map_err(|e| PipelineError::Source(format!("failed to read body of {url}: {e}")))?;
    Ok(body.to_vec())
}

/// Parse a whole CSV table. Any malformed row fails the whole load.
pub fn read_dataset<R: Read>(reader: R, day_first: bool) -> Result<Dataset, PipelineError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| PipelineError::Source(format!("failed to read CSV headers: {e}")))?
        .clone();

    for required in ["Date", "Time"] {
        if !headers.iter().any(|h| h == required) {
            return Err(PipelineError::Source(format!("missing column '{required}' in CSV header")));
        }
    }
    let columns = Columns::from_headers(headers.iter());

    let mut readings = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| PipelineError::Source(format!("failed to read CSV record: {e}")))?;
        // Header is line 1.
        let reading = record_to_reading(&record, &headers, &columns, day_first)
            .map_err(|e| PipelineError::Source(format!("line {}: {e}", idx + 2)))?;
        readings.push(reading);
    }

    Ok(Dataset::new(columns, readings))
}

fn parse_optional_f64(name: &str, s: &str) -> Result<Option<f64>, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse()
        .map(Some)
        .map_err(|e| format!("invalid {name} '{trimmed}': {e}"))
}

fn record_to_reading(
    record: &StringRecord,
    headers: &StringRecord,
    columns: &Columns,
    day_first: bool,
) -> Result<Reading, String> {
    let get = |name: &str| -> Result<&str, String> {
        headers
            .iter()
            .position(|h| h == name)
            .and_then(|idx| record.get(idx))
            .ok_or_else(|| format!("missing column '{name}' in CSV record"))
    };

    let date = get("Date")?;
    let time = get("Time")?;
    let timestamp = parse_timestamp(date, time, day_first)?;
    let mut reading = Reading::new(date, time, timestamp);

    let fill = |devices: &BTreeSet<Device>,
                column: fn(Device) -> &'static str,
                target: &mut BTreeMap<Device, f64>|
     -> Result<(), String> {
        for device in devices {
            if let Some(v) = parse_optional_f64(column(*device), get(column(*device))?)? {
                target.insert(*device, v);
            }
        }
        Ok(())
    };
    fill(&columns.power, Device::power_column, &mut reading.power)?;
    fill(&columns.current, Device::current_column, &mut reading.current)?;
    fill(&columns.costs, Device::cost_column, &mut reading.costs)?;

    if columns.voltage {
        reading.voltage = parse_optional_f64(Columns::VOLTAGE, get(Columns::VOLTAGE)?)?;
    }

    Ok(reading)
}

fn parse_date(raw: &str, day_first: bool) -> Result<Date, time::error::Parse> {
    let iso = Date::parse(raw, format_description!("[year]-[month padding:none]-[day padding:none]"));
    if iso.is_ok() {
        return iso;
    }

    if day_first {
        Date::parse(raw, format_description!("[day padding:none]/[month padding:none]/[year]"))
            .or_else(|_| Date::parse(raw, format_description!("[day padding:none]-[month padding:none]-[year]")))
            .or_else(|_| Date::parse(raw, format_description!("[day padding:none].[month padding:none].[year]")))
    } else {
        Date::parse(raw, format_description!("[month padding:none]/[day padding:none]/[year]"))
            .or_else(|_| Date::parse(raw, format_description!("[month padding:none]-[day padding:none]-[year]")))
    }
}

fn parse_time(raw: &str) -> Result<Time, time::error::Parse> {
    Time::parse(raw, format_description!("[hour padding:none]:[minute]:[second]"))
        .or_else(|_| Time::parse(raw, format_description!("[hour padding:none]:[minute]:[second].[subsecond]")))
        .or_else(|_| Time::parse(raw, format_description!("[hour padding:none]:[minute]")))
}

/// Combine the `Date` and `Time` cells into one timestamp.
pub fn parse_timestamp(date: &str, time: &str, day_first: bool) -> Result<PrimitiveDateTime, String> {
    let d = parse_date(date.trim(), day_first).map_err(|e| format!("invalid Date '{date}': {e}"))?;
    let t = parse_time(time.trim()).map_err(|e| format!("invalid Time '{time}': {e}"))?;
    Ok(PrimitiveDateTime::new(d, t))
}

fn hash_str(hasher: &mut blake3::Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

fn hash_values(hasher: &mut blake3::Hasher, values: &BTreeMap<Device, f64>) {
    hasher.update(&(values.len() as u64).to_le_bytes());
    for (device, v) in values {
        hash_str(hasher, device.name());
        hasher.update(&v.to_bits().to_le_bytes());
    }
}

/// Content hash of the parsed table. Same input, same fingerprint.
pub fn dataset_fingerprint(dataset: &Dataset) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(dataset.len() as u64).to_le_bytes());

    for r in dataset.readings() {
        hash_str(&mut hasher, &r.date);
        hash_str(&mut hasher, &r.time);
        hash_values(&mut hasher, &r.power);
        hash_values(&mut hasher, &r.current);
        hash_values(&mut hasher, &r.costs);
        match r.voltage {
            Some(v) => {
                hasher.update(&[1]);
                hasher.update(&v.to_bits().to_le_bytes());
            }
            None => {
                hasher.update(&[0]);
            }
        }
    }

    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use appliance_data::{queries, HourCategory};
    use approx::assert_relative_eq;
    use std::io::Write;
    use time::macros::{date, datetime};

    const FULL: &str = "\
Date,Time,Table Fan,PC,TV,Table Fan Current,PC Current,TV Current,Voltage,Fan Cost,PC Cost,TV Cost
2024-01-01,07:00:00,0.05,1,0.1,0.2,0.5,0.4,230,0.01,0.2,0.03
2024-01-01,08:00:00,0.05,2,0.1,0.2,0.6,0.4,229.5,0.01,0.4,0.03
2024-01-01,17:00:00,0.06,3,0.2,0.3,0.7,0.5,231,0.02,0.6,0.05
2024-01-02,18:00:00,0.04,4,,0.2,0.8,,,0.01,0.8,
";

    #[test]
    fn reads_full_schema() {
        let dataset = read_dataset(FULL.as_bytes(), false).unwrap();

        assert_eq!(dataset.len(), 4);
        assert_eq!(dataset.columns(), &Columns::full());

        let first = &dataset.readings()[0];
        assert_eq!(first.timestamp, datetime!(2024-01-01 07:00:00));
        assert_eq!(first.hour_category, HourCategory::NonPeak);
        assert_relative_eq!(first.power[&Device::Pc], 1.0);
        assert_relative_eq!(first.current[&Device::TableFan], 0.2);
        assert_eq!(first.voltage, Some(230.0));
        assert_relative_eq!(first.costs[&Device::Tv], 0.03);

        let categories: Vec<HourCategory> = dataset.readings().iter().map(|r| r.hour_category).collect();
        assert_eq!(
            categories,
            vec![HourCategory::NonPeak, HourCategory::Peak, HourCategory::Peak, HourCategory::NonPeak]
        );
    }

    #[test]
    fn empty_cells_are_missing_values() {
        let dataset = read_dataset(FULL.as_bytes(), false).unwrap();
        let last = &dataset.readings()[3];

        assert!(!last.power.contains_key(&Device::Tv));
        assert!(!last.current.contains_key(&Device::Tv));
        assert_eq!(last.voltage, None);
        assert!(!last.costs.contains_key(&Device::Tv));
    }

    #[test]
    fn missing_device_columns_are_tolerated() {
        let csv = "Date,Time,PC,Voltage\n2024-01-01,09:30,1.5,230\n";
        let dataset = read_dataset(csv.as_bytes(), false).unwrap();

        assert_eq!(dataset.columns().power, BTreeSet::from([Device::Pc]));
        assert!(dataset.columns().current.is_empty());
        assert!(dataset.columns().costs.is_empty());
        assert_eq!(dataset.readings()[0].timestamp, datetime!(2024-01-01 09:30:00));
    }

    #[test]
    fn missing_date_column_is_fatal() {
        let csv = "Time,PC\n09:00:00,1\n";
        let res = read_dataset(csv.as_bytes(), false);
        assert!(matches!(res, Err(PipelineError::Source(msg)) if msg.contains("'Date'")));
    }

    #[test]
    fn malformed_values_are_fatal() {
        let bad_number = "Date,Time,PC\n2024-01-01,09:00:00,lots\n";
        assert!(matches!(read_dataset(bad_number.as_bytes(), false), Err(PipelineError::Source(_))));

        let bad_time = "Date,Time,PC\n2024-01-01,25:00:00,1\n";
        assert!(matches!(read_dataset(bad_time.as_bytes(), false), Err(PipelineError::Source(_))));
    }

    #[test]
    fn empty_table_loads_as_empty_dataset() {
        let dataset = read_dataset("Date,Time,PC\n".as_bytes(), false).unwrap();
        assert!(dataset.is_empty());
    }

    #[test]
    fn day_first_swaps_ambiguous_dates() {
        assert_eq!(parse_timestamp("03/04/2024", "8:05:00", false).unwrap(), datetime!(2024-03-04 08:05:00));
        assert_eq!(parse_timestamp("03/04/2024", "8:05:00", true).unwrap(), datetime!(2024-04-03 08:05:00));
        assert_eq!(parse_timestamp("31.12.2023", "23:59", true).unwrap(), datetime!(2023-12-31 23:59:00));
        assert_eq!(parse_timestamp("2024-1-5", "00:00:00", true).unwrap(), datetime!(2024-01-05 00:00:00));
        assert!(parse_timestamp("31/12/2023", "10:00", false).is_err());
    }

    #[test]
    fn loading_twice_is_deterministic() {
        let a = read_dataset(FULL.as_bytes(), false).unwrap();
        let b = read_dataset(FULL.as_bytes(), false).unwrap();

        assert_eq!(dataset_fingerprint(&a), dataset_fingerprint(&b));

        let cats = |d: &Dataset| d.readings().iter().map(|r| r.hour_category).collect::<Vec<_>>();
        assert_eq!(cats(&a), cats(&b));

        let all = Device::ALL.into_iter().collect::<BTreeSet<_>>();
        let days_a = queries::daily_costs(a.readings(), &all);
        let days_b = queries::daily_costs(b.readings(), &all);
        assert_eq!(days_a, days_b);
        assert_eq!(days_a[0].date, date!(2024 - 01 - 01));
    }

    #[test]
    fn fingerprint_changes_with_content() {
        let a = read_dataset(FULL.as_bytes(), false).unwrap();
        let altered = FULL.replace("229.5", "229.6");
        let b = read_dataset(altered.as_bytes(), false).unwrap();
        assert_ne!(dataset_fingerprint(&a), dataset_fingerprint(&b));
    }

    #[test]
    fn string_hash_uses_full_width_length_prefix() {
        let mut hasher = blake3::Hasher::new();
        hash_str(&mut hasher, "2024-01-01");

        let mut expected = blake3::Hasher::new();
        expected.update(&10u64.to_le_bytes());
        expected.update(b"2024-01-01");
        assert_eq!(hasher.finalize(), expected.finalize());
    }

    #[test]
    fn bundled_sample_dataset_loads() {
        let dataset = read_dataset(&include_bytes!("../../../data/Appliance_Data.csv")[..], false).unwrap();

        assert_eq!(dataset.len(), 48);
        assert_eq!(dataset.columns(), &Columns::full());
        let peak = dataset
            .readings()
            .iter()
            .filter(|r| r.hour_category == HourCategory::Peak)
            .count();
        assert_eq!(peak, 20);
    }

    #[test]
    fn data_location_detects_urls() {
        assert_eq!(
            DataLocation::parse("https://example.com/a.csv"),
            DataLocation::Url("https://example.com/a.csv".to_string())
        );
        assert_eq!(
            DataLocation::parse("Appliance_Data.csv"),
            DataLocation::File(PathBuf::from("Appliance_Data.csv"))
        );
    }

    #[tokio::test]
    async fn loader_reads_local_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();

        let loader = ApplianceCsvLoader::new(DataLocation::File(file.path().to_path_buf()), false);
        let dataset = loader.load().await.unwrap();
        assert_eq!(dataset.len(), 4);
    }

    async fn serve_csv(body: &'static str) -> std::net::SocketAddr {
        let app = axum::Router::new().route("/readings.csv", axum::routing::get(move || async move { body }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service()).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn loader_fetches_remote_csv() {
        let addr = serve_csv(FULL).await;

        let location = DataLocation::parse(&format!("http://{addr}/readings.csv"));
        assert!(matches!(location, DataLocation::Url(_)));

        let dataset = ApplianceCsvLoader::new(location, false).load().await.unwrap();
        assert_eq!(dataset.len(), 4);
        assert_eq!(dataset.columns(), &Columns::full());
    }

    #[tokio::test]
    async fn loader_fails_on_http_error_status() {
        let addr = serve_csv(FULL).await;

        let location = DataLocation::parse(&format!("http://{addr}/missing.csv"));
        let res = ApplianceCsvLoader::new(location, false).load().await;
        assert!(matches!(res, Err(PipelineError::Source(msg)) if msg.contains("404")));
    }

    #[tokio::test]
    async fn loader_fails_on_missing_file() {
        let loader = ApplianceCsvLoader::new(DataLocation::File(PathBuf::from("/nonexistent/readings.csv")), false);
        assert!(matches!(loader.load().await, Err(PipelineError::Source(_))));
    }
}
