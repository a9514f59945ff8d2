use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;
use prettytable::Table;
use prettytable::row;
use rolling_portfolio::CsvDirectoryProvider;
use rolling_portfolio::InstrumentRegistry;
use rolling_portfolio::MetricValue;
use rolling_portfolio::Pipeline;
use rolling_portfolio::PipelineConfig;
use rolling_portfolio::analytics::PortfolioAnalytics;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(name = "rolling-portfolio", about = "Rolling max-Sharpe vs equal-weight backtest")]
struct Args {
  /// JSON map of symbol -> [inception, is_short].
  instruments: PathBuf,
  /// Directory holding one `<SYMBOL>.csv` price file per instrument and benchmark.
  prices: PathBuf,
  #[clap(short, long, default_value = "^GSPC")]
  benchmark: String,
  /// First benchmark date (YYYY-MM-DD); defaults to the earliest inception.
  #[clap(long)]
  benchmark_start: Option<NaiveDate>,
  #[clap(short, long, default_value_t = 14)]
  window: usize,
  /// Fail instead of dropping instruments with too little price history.
  #[clap(long)]
  strict: bool,
}

fn fmt_metric(v: MetricValue) -> String {
  match v {
    MetricValue::Defined(x) => format!("{x:.4}"),
    undefined => undefined.to_string(),
  }
}

fn fmt_last(series: &rolling_portfolio::MetricSeries) -> String {
  series
    .last_defined()
    .map(|x| format!("{x:.4}"))
    .unwrap_or_else(|| "n/a".to_string())
}

fn add_portfolio(table: &mut Table, name: &str, a: &PortfolioAnalytics) {
  let (alpha, beta) = a
    .regression
    .map(|r| (format!("{:.4}", r.alpha), format!("{:.4}", r.beta)))
    .unwrap_or_else(|| ("n/a".into(), "n/a".into()));

  table.add_row(row![
    name,
    fmt_last(&a.cumulative_returns),
    fmt_metric(a.sharpe),
    fmt_metric(a.sortino),
    fmt_metric(a.max_drawdown),
    fmt_metric(a.var),
    fmt_metric(a.cvar),
    fmt_last(&a.rolling_volatility),
    fmt_last(&a.information_ratio),
    alpha,
    beta
  ]);
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let args = Args::parse();

  let registry = InstrumentRegistry::from_path(&args.instruments)
    .with_context(|| format!("loading {}", args.instruments.display()))?;
  info!(instruments = registry.len(), "registry loaded");

  let mut config = PipelineConfig {
    benchmark: args.benchmark,
    benchmark_start: args.benchmark_start,
    drop_invalid: !args.strict,
    ..PipelineConfig::default()
  };
  config.analytics.window = args.window;

  let pipeline = Pipeline::new(config)?;
  let provider = CsvDirectoryProvider::new(&args.prices);
  let report = pipeline.run(&registry, &provider)?;

  let mut table = Table::new();
  table.add_row(row![
    "portfolio", "cum. return", "sharpe", "sortino", "max dd", "VaR", "CVaR", "vol", "IR", "alpha", "beta"
  ]);
  add_portfolio(&mut table, "naive", &report.naive);
  add_portfolio(&mut table, "optimized", &report.optimized);
  table.add_row(row![
    "benchmark",
    fmt_last(&report.benchmark.cumulative_returns),
    fmt_metric(report.benchmark.sharpe),
    "",
    "",
    fmt_metric(report.benchmark.var),
    fmt_metric(report.benchmark.cvar),
    fmt_last(&report.benchmark.rolling_volatility),
    "",
    "",
    ""
  ]);
  table.printstd();

  if !report.non_converged.is_empty() {
    println!(
      "optimizer stopped at the iteration cap on {} of {} dates",
      report.non_converged.len(),
      report.solutions.len()
    );
  }

  if let Some(last) = report.solutions.last() {
    let mut weights = Table::new();
    weights.add_row(row!["symbol", format!("weight on {}", last.date)]);
    for (member, w) in last.members.iter().zip(last.weights.iter()) {
      let symbol = report.symbols.get(*member).cloned().unwrap_or_default();
      weights.add_row(row![symbol, format!("{w:.4}")]);
    }
    weights.printstd();
  }

  Ok(())
}
