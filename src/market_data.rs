//! # Market Data
//!
//! Provider seam for adjusted closing prices and the dated price table the
//! return builder consumes. Per-instrument fetches run concurrently and are
//! joined before anything downstream starts.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use chrono::NaiveDate;
use csv::ReaderBuilder;
use rayon::prelude::*;
use serde::Deserialize;
use tracing::debug;
use tracing::info;

use crate::error::PortfolioError;
use crate::error::Result;
use crate::instrument::InstrumentRegistry;
use crate::portfolio::ReturnSeries;

/// One adjusted close.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PricePoint {
  pub date: NaiveDate,
  pub close: f64,
}

impl PricePoint {
  pub fn new(date: NaiveDate, close: f64) -> Self {
    Self { date, close }
  }
}

/// Source of historical prices.
///
/// Implementations return ascending trading-day closes on or after `start`;
/// fewer rows than requested is fine when history is shorter.
pub trait MarketDataProvider: Send + Sync {
  fn fetch(&self, symbol: &str, start: NaiveDate) -> Result<Vec<PricePoint>>;
}

/// Provider backed by series held in memory.
#[derive(Clone, Debug, Default)]
pub struct InMemoryProvider {
  series: HashMap<String, Vec<PricePoint>>,
}

impl InMemoryProvider {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, symbol: impl AsRef<str>, points: Vec<PricePoint>) {
    self.series.insert(symbol.as_ref().to_uppercase(), points);
  }

  pub fn with_series(mut self, symbol: impl AsRef<str>, points: Vec<PricePoint>) -> Self {
    self.insert(symbol, points);
    self
  }
}

impl MarketDataProvider for InMemoryProvider {
  fn fetch(&self, symbol: &str, start: NaiveDate) -> Result<Vec<PricePoint>> {
    let points = self
      .series
      .get(&symbol.to_uppercase())
      .ok_or_else(|| PortfolioError::unavailable(symbol, "unknown symbol"))?;

    let mut out: Vec<PricePoint> = points.iter().filter(|p| p.date >= start).copied().collect();
    out.sort_by_key(|p| p.date);
    Ok(out)
  }
}

#[derive(Deserialize)]
struct CsvRow {
  #[serde(alias = "Date")]
  date: String,
  #[serde(default, alias = "Close")]
  close: Option<f64>,
  #[serde(default, rename = "Adj Close", alias = "adj_close")]
  adj_close: Option<f64>,
}

/// Reads `<dir>/<SYMBOL>.csv` files with a date column and `Adj Close` or
/// `close` prices; the adjusted close wins when both are present.
#[derive(Clone, Debug)]
pub struct CsvDirectoryProvider {
  dir: PathBuf,
}

impl CsvDirectoryProvider {
  pub fn new(dir: impl AsRef<Path>) -> Self {
    Self {
      dir: dir.as_ref().to_path_buf(),
    }
  }

  fn path_for(&self, symbol: &str) -> PathBuf {
    self.dir.join(format!("{}.csv", symbol.to_uppercase()))
  }
}

impl MarketDataProvider for CsvDirectoryProvider {
  fn fetch(&self, symbol: &str, start: NaiveDate) -> Result<Vec<PricePoint>> {
    let path = self.path_for(symbol);
    debug!("reading prices for {symbol} from {}", path.display());

    let mut reader = ReaderBuilder::new()
      .has_headers(true)
      .trim(csv::Trim::All)
      .from_path(&path)
      .map_err(|e| PortfolioError::unavailable(symbol, e.to_string()))?;

    let mut out = Vec::new();
    for row in reader.deserialize() {
      let row: CsvRow = row?;
      let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d")
        .map_err(|e| PortfolioError::data(symbol, format!("bad date '{}': {e}", row.date)))?;
      let close = row
        .adj_close
        .or(row.close)
        .ok_or_else(|| PortfolioError::data(symbol, format!("no close on {date}")))?;
      if date >= start {
        out.push(PricePoint::new(date, close));
      }
    }

    out.sort_by_key(|p| p.date);
    Ok(out)
  }
}

/// Dates x instruments price grid. A cell is `None` before the instrument's
/// first observation.
#[derive(Clone, Debug, Default)]
pub struct PriceTable {
  pub dates: Vec<NaiveDate>,
  pub symbols: Vec<String>,
  /// One column per symbol, each `dates.len()` long.
  pub columns: Vec<Vec<Option<f64>>>,
  /// Distinct closes the provider returned per symbol, before forward fill.
  pub observed: Vec<usize>,
}

impl PriceTable {
  /// Align per-symbol series on the union of their dates.
  ///
  /// Gaps after an instrument's first observation carry the last close forward.
  pub fn from_series(symbols: Vec<String>, series: Vec<Vec<PricePoint>>) -> Result<Self> {
    if symbols.len() != series.len() {
      return Err(PortfolioError::Config(format!(
        "{} symbols but {} price series",
        symbols.len(),
        series.len()
      )));
    }

    for (symbol, points) in symbols.iter().zip(series.iter()) {
      if let Some(p) = points.iter().find(|p| !(p.close.is_finite() && p.close > 0.0)) {
        return Err(PortfolioError::data(
          symbol,
          format!("non-positive close {} on {}", p.close, p.date),
        ));
      }
    }

    let dates: Vec<NaiveDate> = series
      .iter()
      .flat_map(|s| s.iter().map(|p| p.date))
      .collect::<BTreeSet<_>>()
      .into_iter()
      .collect();

    let observed = series
      .iter()
      .map(|points| points.iter().map(|p| p.date).collect::<BTreeSet<_>>().len())
      .collect();

    let columns = series
      .iter()
      .map(|points| {
        let by_date: HashMap<NaiveDate, f64> = points.iter().map(|p| (p.date, p.close)).collect();
        let mut last = None;
        dates
          .iter()
          .map(|d| {
            if let Some(&close) = by_date.get(d) {
              last = Some(close);
            }
            last
          })
          .collect()
      })
      .collect();

    Ok(Self {
      dates,
      symbols,
      columns,
      observed,
    })
  }

  pub fn n_dates(&self) -> usize {
    self.dates.len()
  }

  pub fn n_instruments(&self) -> usize {
    self.symbols.len()
  }

  /// Raw observation count of column `col`; padded cells do not count.
  pub fn observed(&self, col: usize) -> usize {
    self
      .observed
      .get(col)
      .copied()
      .unwrap_or_else(|| self.columns.get(col).map_or(0, |c| c.iter().flatten().count()))
  }

  pub fn column(&self, symbol: &str) -> Option<&[Option<f64>]> {
    self
      .symbols
      .iter()
      .position(|s| s.eq_ignore_ascii_case(symbol))
      .map(|i| self.columns[i].as_slice())
  }
}

fn fetch_one(provider: &dyn MarketDataProvider, symbol: &str, start: NaiveDate) -> Result<Vec<PricePoint>> {
  let points = provider.fetch(symbol, start).map_err(|e| match e {
    PortfolioError::DataUnavailable { .. } | PortfolioError::Data { .. } => e,
    other => PortfolioError::unavailable(symbol, other.to_string()),
  })?;

  if points.is_empty() {
    return Err(PortfolioError::unavailable(symbol, "provider returned no prices"));
  }
  Ok(points)
}

/// Fetch every registered instrument from its inception date, concurrently.
///
/// Any failed or empty fetch aborts the whole universe.
pub fn fetch_universe(provider: &dyn MarketDataProvider, registry: &InstrumentRegistry) -> Result<PriceTable> {
  if registry.is_empty() {
    return Err(PortfolioError::Config("no instruments registered".into()));
  }

  let instruments: Vec<_> = registry.iter().collect();
  let series = instruments
    .par_iter()
    .map(|inst| fetch_one(provider, &inst.symbol, inst.inception))
    .collect::<Result<Vec<_>>>()?;

  info!("fetched prices for {} instruments", series.len());
  PriceTable::from_series(registry.symbols(), series)
}

/// Benchmark closes converted to simple daily returns; the first date is dropped.
pub fn fetch_benchmark(provider: &dyn MarketDataProvider, symbol: &str, start: NaiveDate) -> Result<ReturnSeries> {
  let points = fetch_one(provider, symbol, start)?;
  benchmark_returns(symbol, &points)
}

pub(crate) fn benchmark_returns(symbol: &str, points: &[PricePoint]) -> Result<ReturnSeries> {
  if points.len() < 2 {
    return Err(PortfolioError::data(symbol, "benchmark needs at least 2 closes"));
  }
  if let Some(p) = points.iter().find(|p| !(p.close.is_finite() && p.close > 0.0)) {
    return Err(PortfolioError::data(
      symbol,
      format!("non-positive close {} on {}", p.close, p.date),
    ));
  }

  let dates = points[1..].iter().map(|p| p.date).collect();
  let values = points
    .windows(2)
    .map(|w| w[1].close / w[0].close - 1.0)
    .collect();
  ReturnSeries::new(dates, values)
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use approx::assert_relative_eq;

  use super::*;
  use crate::instrument::Instrument;

  fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 2, day).unwrap()
  }

  #[test]
  fn price_table_aligns_on_union_and_pads_gaps() {
    let a = vec![
      PricePoint::new(d(1), 10.0),
      PricePoint::new(d(2), 11.0),
      PricePoint::new(d(4), 12.0),
    ];
    let b = vec![PricePoint::new(d(3), 50.0), PricePoint::new(d(4), 51.0)];

    let table = PriceTable::from_series(vec!["A".into(), "B".into()], vec![a, b]).unwrap();
    assert_eq!(table.dates, vec![d(1), d(2), d(3), d(4)]);
    assert_eq!(
      table.column("A").unwrap(),
      &[Some(10.0), Some(11.0), Some(11.0), Some(12.0)]
    );
    assert_eq!(table.column("b").unwrap(), &[None, None, Some(50.0), Some(51.0)]);
    assert_eq!(table.observed, vec![3, 2]);
  }

  #[test]
  fn observed_ignores_forward_filled_cells() {
    let early = vec![PricePoint::new(d(1), 7.0)];
    let full = (1..=5).map(|i| PricePoint::new(d(i), 10.0 + i as f64)).collect();

    let table = PriceTable::from_series(vec!["EARLY".into(), "FULL".into()], vec![early, full]).unwrap();
    assert_eq!(table.column("EARLY").unwrap().iter().flatten().count(), 5);
    assert_eq!(table.observed(0), 1);
    assert_eq!(table.observed(1), 5);
  }

  #[test]
  fn price_table_rejects_non_positive_closes() {
    let bad = vec![PricePoint::new(d(1), 10.0), PricePoint::new(d(2), 0.0)];
    assert!(matches!(
      PriceTable::from_series(vec!["X".into()], vec![bad]),
      Err(PortfolioError::Data { .. })
    ));
  }

  #[test]
  fn fetch_universe_fails_on_missing_or_empty_series() {
    let provider = InMemoryProvider::new()
      .with_series("AAA", vec![PricePoint::new(d(1), 1.0), PricePoint::new(d(2), 1.1)])
      .with_series("EMPTY", vec![PricePoint::new(d(1), 1.0)]);

    let mut registry = InstrumentRegistry::new();
    registry.register(Instrument::long("AAA", d(1))).unwrap();
    registry.register(Instrument::long("EMPTY", d(5))).unwrap();
    assert!(matches!(
      fetch_universe(&provider, &registry),
      Err(PortfolioError::DataUnavailable { .. })
    ));

    let mut registry = InstrumentRegistry::new();
    registry.register(Instrument::long("AAA", d(1))).unwrap();
    registry.register(Instrument::long("ZZZ", d(1))).unwrap();
    assert!(matches!(
      fetch_universe(&provider, &registry),
      Err(PortfolioError::DataUnavailable { .. })
    ));
  }

  #[test]
  fn fetch_universe_respects_inception() {
    let provider = InMemoryProvider::new()
      .with_series(
        "AAA",
        vec![
          PricePoint::new(d(1), 1.0),
          PricePoint::new(d(2), 1.1),
          PricePoint::new(d(3), 1.2),
        ],
      )
      .with_series(
        "BBB",
        vec![
          PricePoint::new(d(1), 5.0),
          PricePoint::new(d(2), 5.5),
          PricePoint::new(d(3), 6.0),
        ],
      );

    let mut registry = InstrumentRegistry::new();
    registry.register(Instrument::long("AAA", d(1))).unwrap();
    registry.register(Instrument::long("BBB", d(2))).unwrap();

    let table = fetch_universe(&provider, &registry).unwrap();
    assert_eq!(table.n_dates(), 3);
    assert_eq!(table.columns[1], vec![None, Some(5.5), Some(6.0)]);
  }

  #[test]
  fn csv_provider_reads_adjusted_closes() {
    let dir = tempfile::tempdir().unwrap();
    let mut file = std::fs::File::create(dir.path().join("SPY.csv")).unwrap();
    writeln!(file, "date,adj_close").unwrap();
    writeln!(file, "2021-02-02,101.0").unwrap();
    writeln!(file, "2021-02-01,100.0").unwrap();
    writeln!(file, "2021-01-29,99.0").unwrap();

    let provider = CsvDirectoryProvider::new(dir.path());
    let points = provider.fetch("spy", d(1)).unwrap();
    assert_eq!(points, vec![PricePoint::new(d(1), 100.0), PricePoint::new(d(2), 101.0)]);

    let bench = fetch_benchmark(&provider, "SPY", d(1)).unwrap();
    assert_eq!(bench.dates, vec![d(2)]);
    assert_relative_eq!(bench.values[0], 0.01, epsilon = 1e-12);

    assert!(matches!(
      provider.fetch("QQQ", d(1)),
      Err(PortfolioError::DataUnavailable { .. })
    ));
  }

  #[test]
  fn csv_provider_prefers_adjusted_column() {
    let dir = tempfile::tempdir().unwrap();
    let mut file = std::fs::File::create(dir.path().join("QQQ.csv")).unwrap();
    writeln!(file, "Date,Open,Close,Adj Close").unwrap();
    writeln!(file, "2021-02-01,9.0,10.0,9.5").unwrap();
    writeln!(file, "2021-02-02,9.0,11.0,").unwrap();

    let points = CsvDirectoryProvider::new(dir.path()).fetch("QQQ", d(1)).unwrap();
    assert_eq!(points, vec![PricePoint::new(d(1), 9.5), PricePoint::new(d(2), 11.0)]);
  }
}
