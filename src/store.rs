// SQLite candle store
//
// Persists one OHLC series per table, keyed by bar time, so that imports are
// idempotent and backtests can load a date range without re-parsing CSVs.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::data::MarketDataSource;
use crate::{Candle, Instrument};

/// Bar times are stored in a fixed-width UTC format so text order is time order
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn format_time(time: DateTime<Utc>) -> String {
    time.format(TIME_FORMAT).to_string()
}

fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, TIME_FORMAT)
        .ok()
        .map(|ndt| ndt.and_utc())
}

/// Table names are interpolated into SQL, so only plain identifiers pass
pub fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub struct CandleStore {
    conn: Connection,
    table: String,
}

impl CandleStore {
    /// Open (or create) `path` and make sure `table` exists
    pub fn open(path: impl AsRef<Path>, table: &str) -> Result<Self> {
        if !is_valid_table_name(table) {
            anyhow::bail!("Invalid table name: {:?}", table);
        }

        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        let store = Self {
            conn,
            table: table.to_string(),
        };
        store.create_table()?;
        info!("Candle store {} opened (table {})", path.display(), table);

        Ok(store)
    }

    fn create_table(&self) -> Result<()> {
        self.conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    time TEXT PRIMARY KEY,
                    open REAL NOT NULL,
                    high REAL NOT NULL,
                    low REAL NOT NULL,
                    close REAL NOT NULL
                )",
                self.table
            ),
            [],
        )?;
        debug!("Table {} created/verified", self.table);
        Ok(())
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Insert candles, ignoring times already present. Returns rows inserted.
    pub fn insert_candles(&mut self, candles: &[Candle]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR IGNORE INTO {} (time, open, high, low, close) VALUES (?1, ?2, ?3, ?4, ?5)",
                self.table
            ))?;
            for candle in candles {
                inserted += stmt.execute(params![
                    format_time(candle.time),
                    candle.open,
                    candle.high,
                    candle.low,
                    candle.close,
                ])?;
            }
        }
        tx.commit()?;

        debug!(
            "Inserted {} of {} candles into {}",
            inserted,
            candles.len(),
            self.table
        );
        Ok(inserted)
    }

    /// Candles within the inclusive `[start, end]` range, ordered by time
    pub fn load(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Candle>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT time, open, high, low, close FROM {}
             WHERE (?1 IS NULL OR time >= ?1) AND (?2 IS NULL OR time <= ?2)
             ORDER BY time",
            self.table
        ))?;

        let rows = stmt
            .query_map(
                params![start.map(format_time), end.map(format_time)],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, f64>(4)?,
                    ))
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        let mut candles = Vec::with_capacity(rows.len());
        for (time, open, high, low, close) in rows {
            let Some(time) = parse_time(&time) else {
                warn!("Skipping row with unparseable time {:?} in {}", time, self.table);
                continue;
            };
            match Candle::new(time, open, high, low, close) {
                Ok(candle) => candles.push(candle),
                Err(e) => warn!("Skipping invalid candle at {} in {}: {}", time, self.table, e),
            }
        }

        debug!("Loaded {} candles from {}", candles.len(), self.table);
        Ok(candles)
    }

    pub fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", self.table), [], |row| {
                row.get(0)
            })?;
        Ok(n as usize)
    }
}

impl MarketDataSource for CandleStore {
    /// Serves this store's table regardless of `instrument`
    fn candles(
        &self,
        instrument: &Instrument,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Candle>> {
        let candles = self.load(start, end)?;
        info!("Loaded {} candles for {} from {}", candles.len(), instrument, self.table);
        Ok(candles)
    }
}
