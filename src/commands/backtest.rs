//! Backtest command implementation

use anyhow::Result;
use fx_backtester::gateway::{OrderGateway, OrderRequest, PaperGateway};
use fx_backtester::position::position_size;
use fx_backtester::stats::max_drawdown;
use fx_backtester::strategies::create_generator;
use fx_backtester::{compute_stats, report, Backtester, Config, Order};
use tracing::{info, warn};

pub struct BacktestArgs {
    pub config_path: String,
    pub cash: Option<f64>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub db: Option<String>,
    pub export: bool,
    pub paper: bool,
    pub risk: f64,
}

pub fn run(args: BacktestArgs) -> Result<()> {
    info!("Starting backtest");

    let mut config = Config::from_file(&args.config_path)?;
    info!("Loaded configuration from: {}", args.config_path);

    if let Some(cash) = args.cash {
        info!("Overriding initial cash to: {:.2}", cash);
        config.backtest.initial_cash = cash;
    }
    if args.start.is_some() {
        config.backtest.start_date = args.start;
    }
    if args.end.is_some() {
        config.backtest.end_date = args.end;
    }

    let candles = super::load_candles(&config, args.db.as_deref())?;

    let generator = create_generator(&config.strategy);
    info!("Generating orders with {}", generator.name());
    let mut orders = generator.generate_orders(&candles);

    info!("Running backtest...");
    let backtester = Backtester::from_config(&config.backtest);
    let result = backtester.run(&candles, &mut orders);
    let stats = compute_stats(&orders, config.pip_scale());

    let first = candles.first().map(|c| c.time.format("%Y-%m-%d").to_string());
    let last = candles.last().map(|c| c.time.format("%Y-%m-%d").to_string());
    let final_equity = result.final_equity().unwrap_or(config.backtest.initial_cash);

    println!("\n{}", "=".repeat(60));
    println!("BACKTEST RESULTS: {} {}", config.instrument, generator.name());
    println!("{}", "=".repeat(60));
    println!(
        "Period:             {} to {} ({} bars)",
        first.unwrap_or_default(),
        last.unwrap_or_default(),
        candles.len()
    );
    println!("Initial Cash:       {:.2}", config.backtest.initial_cash);
    println!("Final Equity:       {:.2}", final_equity);
    println!(
        "Max Drawdown:       {:.2}%",
        max_drawdown(&result.equity_curve) * 100.0
    );
    println!("{}", "-".repeat(60));
    println!("{}", stats);
    println!("{}", "=".repeat(60));

    if args.export {
        let stem = format!("{}_{}", config.instrument, generator.name());
        let dir = &config.backtest.results_dir;

        report::write_orders_csv(report::results_path(dir, &format!("{}_orders", stem), "csv")?, &orders)?;
        report::write_equity_csv(
            report::results_path(dir, &format!("{}_equity", stem), "csv")?,
            &[(generator.name().to_string(), result.equity_curve.clone())],
        )?;
        report::write_stats_json(report::results_path(dir, &format!("{}_stats", stem), "json")?, &stats)?;
        println!("Results exported to {}/", dir);
    }

    if args.paper {
        submit_pending(&config, &orders, final_equity, args.risk)?;
    }

    Ok(())
}

/// Send the orders still resting at the end of the series to a paper
/// gateway, sized by risk. The account is assumed to be in the quote currency.
fn submit_pending(config: &Config, orders: &[Order], balance: f64, risk_pct: f64) -> Result<()> {
    let mut gateway = PaperGateway::new();
    let pip_scale = config.pip_scale();

    for order in orders.iter().filter(|o| o.is_pending()) {
        let Some(stop) = order.stop_loss() else {
            warn!("Order #{} has no stop-loss, not submitted", order.id());
            continue;
        };
        let sl_pips = (order.entry() - stop).abs() * pip_scale;
        let lots = position_size(balance, risk_pct, sl_pips, &config.instrument, 1.0);

        let request = OrderRequest::from_order(order, &config.instrument, lots);
        match gateway.place_order(&request) {
            Ok(id) => info!("Order #{} submitted as paper order {}", order.id(), id),
            Err(e) => warn!("Order #{} rejected: {}", order.id(), e),
        }
    }

    println!("\n{}", "=".repeat(60));
    println!("PAPER ORDERS");
    println!("{}", "=".repeat(60));
    for (id, request) in gateway.pending_orders() {
        println!(
            "  {:>3}  {:?} {} {:>+10.0} @ {:?}  TP {:?}  SL {:?}",
            id,
            request.kind,
            request.instrument,
            request.signed_units(),
            request.price,
            request.take_profit,
            request.stop_loss
        );
    }
    println!("{}", "=".repeat(60));

    Ok(())
}
