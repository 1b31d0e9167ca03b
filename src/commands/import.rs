//! Import command implementation

use anyhow::Result;
use fx_backtester::data;
use fx_backtester::store::CandleStore;
use tracing::info;

pub fn run(csv_path: String, db_path: String, table: String) -> Result<()> {
    info!("Importing {} into {} (table {})", csv_path, db_path, table);

    let candles = data::prepare_series(data::load_csv(&csv_path)?);
    let mut store = CandleStore::open(&db_path, &table)?;
    let inserted = store.insert_candles(&candles)?;
    let total = store.count()?;

    println!("\n{}", "=".repeat(60));
    println!("IMPORT COMPLETE");
    println!("{}", "=".repeat(60));
    println!("Source:             {}", csv_path);
    println!("Candles read:       {}", candles.len());
    println!("Rows inserted:      {}", inserted);
    println!("Already present:    {}", candles.len() - inserted);
    println!("Rows in table:      {}", total);
    println!("{}", "=".repeat(60));

    Ok(())
}
