//! Retail equity analytics CLI
//!
//! Loads a local daily price history CSV plus the company's financial
//! statement exports, runs the ensemble forecast pipeline, and prints the
//! model comparison, forecast, backtest reality check, ratios and verdict.

use anyhow::{Context, Result};
use clap::Parser;
use equilens::application::forecast::run_ensemble_forecast;
use equilens::application::verdict::generate_verdict;
use equilens::config::ForecastConfig;
use equilens::domain::market::MIN_HISTORY_ROWS;
use equilens::infrastructure::provider::{CsvPriceHistory, PriceHistoryProvider};
use equilens::infrastructure::statements::StatementLoader;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Retail-sector equity analytics dashboard core", long_about = None)]
struct Args {
    /// Ticker symbol; price history is read from <data-dir>/<symbol>.csv
    #[arg(short, long, default_value = "DMART")]
    symbol: String,

    /// Company name used in statement export file names
    #[arg(short, long, default_value = "Avenue Supermarts")]
    company: String,

    /// Directory holding price history and statement CSV exports
    #[arg(short, long, default_value = "data")]
    data_dir: String,

    /// Projection horizon in calendar days (1-30)
    #[arg(long, default_value_t = 30)]
    horizon: usize,

    /// Trailing P/E used by the verdict score (0 = unknown)
    #[arg(long, default_value_t = 0.0)]
    trailing_pe: f64,

    /// Emit the full outcome as JSON instead of the text report
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let provider = CsvPriceHistory::new(&args.data_dir);
    let series = provider
        .fetch_history(&args.symbol)
        .with_context(|| format!("loading price history for {}", args.symbol))?;

    let statements = StatementLoader::new(&args.data_dir).load(&args.company);
    let growth = statements.growth_metrics();
    let ratios = statements.efficiency_ratios();

    let config = ForecastConfig::new(args.horizon);
    info!(symbol = %args.symbol, horizon = config.horizon, "running forecast pipeline");
    let outcome = run_ensemble_forecast(&series, &config);
    let verdict = generate_verdict(&series, &growth, args.trailing_pe);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!("\n══════════════════════════════════════════════════════");
    println!("  {} — ENSEMBLE FORECAST", args.symbol.to_uppercase());
    println!("══════════════════════════════════════════════════════");

    if outcome.is_sentinel() {
        println!(
            "\n  Not enough price history ({} rows, need {}).",
            series.len(),
            MIN_HISTORY_ROWS
        );
        return Ok(());
    }

    println!("\n  Model comparison (held-out tail):");
    println!(
        "    {:<20} {:>8} {:>10} {:>10} {:>10}",
        "Model", "R2", "RMSE", "MAE", "MAPE %"
    );
    for score in &outcome.comparison {
        println!(
            "    {:<20} {:>8.4} {:>10.4} {:>10.4} {:>10.4}",
            score.name, score.report.r2, score.report.rmse, score.report.mae, score.report.mape
        );
    }
    println!("\n  Selected model: {}", outcome.model_name);

    if let Some(last) = series.last() {
        println!("\n  Last close:   {:>10.2}  ({})", last.close, last.date);
    }
    println!(
        "  Target price: {:>10.2}  ({} days out)",
        outcome.target_price, config.horizon
    );
    if let Some(first) = outcome.points.first() {
        println!("  First step:   {:>10.2}  ({})", first.close, first.date);
    }

    if !outcome.reality_check.is_empty() {
        println!("\n  Reality check (fresh model per checkpoint):");
        for (label, entry) in &outcome.reality_check {
            println!(
                "    {:<12} {}  actual {:>10.2}  predicted {:>10.2}",
                label, entry.date, entry.actual, entry.predicted
            );
        }
    }

    println!("\n  Efficiency ratios:");
    println!("    Inventory turnover: {:.2}", ratios.inventory_turnover);
    let current_ratio = if ratios.current_ratio > 0.0 {
        ratios.current_ratio
    } else {
        statements.current_ratio_fallback()
    };
    println!("    Current ratio:      {:.2}", current_ratio);
    println!("    Quick ratio:        {:.2}", ratios.quick_ratio);
    println!("    Payables turnover:  {:.2}", ratios.payables_turnover);

    println!("\n  Verdict: {}\n", verdict.rating.label());
    println!("  {}\n", verdict.summary);

    Ok(())
}
