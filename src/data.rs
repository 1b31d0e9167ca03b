//! Data loading and management
//!
//! Loads OHLC price series from CSV files and normalises them into the
//! ascending, duplicate-free sequence the backtester expects.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use itertools::Itertools;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{Candle, Instrument};

// =============================================================================
// Data Sources
// =============================================================================

/// Anything that can serve a candle series for an instrument
pub trait MarketDataSource {
    /// Candles for `instrument` within the inclusive `[start, end]` range,
    /// ascending and free of duplicate timestamps
    fn candles(
        &self,
        instrument: &Instrument,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Candle>>;
}

/// One CSV file per instrument: `{dir}/{INSTRUMENT}.csv`
#[derive(Debug, Clone)]
pub struct CsvDataSource {
    dir: PathBuf,
}

impl CsvDataSource {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        CsvDataSource {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, instrument: &Instrument) -> PathBuf {
        self.dir.join(format!("{}.csv", instrument.as_str()))
    }
}

impl MarketDataSource for CsvDataSource {
    fn candles(
        &self,
        instrument: &Instrument,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Candle>> {
        let path = self.path_for(instrument);
        if !path.exists() {
            anyhow::bail!("Data file not found: {}", path.display());
        }

        let candles = load_csv(&path).context(format!("Failed to load data for {}", instrument))?;
        let total = candles.len();
        let candles = filter_candles_by_date(prepare_series(candles), start, end);

        if start.is_some() || end.is_some() {
            info!(
                "Loaded {} candles for {} (filtered from {} total)",
                candles.len(),
                instrument,
                total
            );
        } else {
            info!("Loaded {} candles for {}", candles.len(), instrument);
        }

        Ok(candles)
    }
}

// =============================================================================
// CSV Data Loading
// =============================================================================

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    s.parse::<DateTime<Utc>>().ok().or_else(|| {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|ndt| ndt.and_utc())
    })
}

fn parse_field(record: &csv::StringRecord, idx: usize, name: &str) -> Result<f64> {
    record
        .get(idx)
        .context(format!("Missing {} column", name))?
        .trim()
        .parse()
        .context(format!("Failed to parse {}", name))
}

/// Load OHLC data from a CSV file with a `time,open,high,low,close` header.
///
/// Extra columns are ignored. Rows failing candle validation are skipped.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Candle>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path).context("Failed to open CSV file")?;

    let mut candles = Vec::new();
    let mut invalid_count = 0;

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.context(format!("Failed to read row {}", row_idx + 1))?;

        let time_str = record.get(0).context("Missing time column")?.trim();
        let time = parse_timestamp(time_str)
            .context(format!("Failed to parse datetime: {}", time_str))?;

        let open = parse_field(&record, 1, "open")?;
        let high = parse_field(&record, 2, "high")?;
        let low = parse_field(&record, 3, "low")?;
        let close = parse_field(&record, 4, "close")?;

        match Candle::new(time, open, high, low, close) {
            Ok(candle) => candles.push(candle),
            Err(e) => {
                invalid_count += 1;
                warn!(
                    "Skipping invalid candle at row {} in {:?}: {}",
                    row_idx + 2, // +2 for 1-indexed and header row
                    path.file_name().unwrap_or_default(),
                    e
                );
            }
        }
    }

    if invalid_count > 0 {
        warn!(
            "Skipped {} invalid candles out of {} in {:?}",
            invalid_count,
            invalid_count + candles.len(),
            path.file_name().unwrap_or_default()
        );
    }

    Ok(candles)
}

/// Write candles as `time,open,high,low,close` (RFC 3339 times)
pub fn save_csv(path: impl AsRef<Path>, candles: &[Candle]) -> Result<()> {
    let path = path.as_ref();
    let mut file = File::create(path).context("Failed to create output file")?;

    writeln!(file, "time,open,high,low,close")?;
    for candle in candles {
        writeln!(
            file,
            "{},{},{},{},{}",
            candle.time.to_rfc3339(),
            candle.open,
            candle.high,
            candle.low,
            candle.close
        )?;
    }

    info!("Saved {} rows to {}", candles.len(), path.display());
    Ok(())
}

/// Sort ascending by time and drop repeated timestamps (first occurrence wins)
pub fn prepare_series(candles: Vec<Candle>) -> Vec<Candle> {
    let total = candles.len();
    let series: Vec<Candle> = candles
        .into_iter()
        .sorted_by_key(|c| c.time)
        .dedup_by(|a, b| a.time == b.time)
        .collect();

    if series.len() < total {
        warn!("Dropped {} duplicate timestamps", total - series.len());
    }
    series
}

/// Filter candles by date range (inclusive on both ends)
pub fn filter_candles_by_date(
    candles: Vec<Candle>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Vec<Candle> {
    candles
        .into_iter()
        .filter(|c| {
            let after_start = start.is_none_or(|s| c.time >= s);
            let before_end = end.is_none_or(|e| c.time <= e);
            after_start && before_end
        })
        .collect()
}

/// Parse a date string (RFC 3339, YYYY-MM-DD HH:MM:SS or YYYY-MM-DD) to DateTime<Utc>
pub fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    if let Some(dt) = parse_timestamp(date_str) {
        return Ok(dt);
    }

    // YYYY-MM-DD means start of day
    if let Some(ndt) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .ok()
        .and_then(|nd| nd.and_hms_opt(0, 0, 0))
    {
        return Ok(ndt.and_utc());
    }

    anyhow::bail!(
        "Failed to parse date: {}. Use YYYY-MM-DD or YYYY-MM-DD HH:MM:SS format",
        date_str
    )
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, 2, hour, 0, 0).unwrap()
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("fx_backtester_data_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_prepare_series_sorts_and_dedups() {
        let candles = vec![
            Candle::new_unchecked(t(2), 1.2, 1.2, 1.2, 1.2),
            Candle::new_unchecked(t(0), 1.0, 1.0, 1.0, 1.0),
            Candle::new_unchecked(t(2), 9.9, 9.9, 9.9, 9.9),
            Candle::new_unchecked(t(1), 1.1, 1.1, 1.1, 1.1),
        ];
        let series = prepare_series(candles);
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].time, t(0));
        assert_eq!(series[2].time, t(2));
        assert_eq!(series[2].open, 1.2);
    }

    #[test]
    fn test_filter_candles_by_date_inclusive() {
        let candles: Vec<Candle> = (0..5)
            .map(|h| Candle::new_unchecked(t(h), 1.0, 1.0, 1.0, 1.0))
            .collect();
        let filtered = filter_candles_by_date(candles.clone(), Some(t(1)), Some(t(3)));
        assert_eq!(filtered.len(), 3);
        assert_eq!(filter_candles_by_date(candles, None, None).len(), 5);
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2020-03-02").unwrap(), t(0));
        assert_eq!(parse_date("2020-03-02 05:00:00").unwrap(), t(5));
        assert_eq!(parse_date("2020-03-02T05:00:00Z").unwrap(), t(5));
        assert!(parse_date("02/03/2020").is_err());
    }

    #[test]
    fn test_load_csv_skips_invalid_rows() {
        let path = temp_path("load.csv");
        std::fs::write(
            &path,
            "time,open,high,low,close,volume\n\
             2020-03-02 00:00:00,1.10,1.12,1.09,1.11,100\n\
             2020-03-02 01:00:00,1.10,1.08,1.09,1.11,100\n\
             2020-03-02T02:00:00Z,1.11,1.13,1.10,1.12,100\n",
        )
        .unwrap();

        let candles = load_csv(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].time, t(0));
        assert_eq!(candles[1].time, t(2));
        assert_eq!(candles[1].close, 1.12);
    }

    #[test]
    fn test_csv_source_reads_instrument_file() {
        let dir = temp_path("source");
        std::fs::create_dir_all(&dir).unwrap();
        let candles: Vec<Candle> = (0..4)
            .map(|h| Candle::new_unchecked(t(h), 1.0, 1.1, 0.9, 1.05))
            .collect();
        save_csv(dir.join("EUR_USD.csv"), &candles).unwrap();

        let source = CsvDataSource::new(&dir);
        let loaded = source
            .candles(&Instrument::new("eur_usd"), Some(t(1)), None)
            .unwrap();
        assert_eq!(loaded.len(), 3);
        assert!(source.candles(&Instrument::new("GBP_JPY"), None, None).is_err());

        std::fs::remove_dir_all(&dir).ok();
    }
}
