//! # Return Series Builder
//!
//! $$
//! r_{i,t} = s_i\left(\frac{P_{i,t}}{P_{i,t-1}} - 1\right),\quad s_i\in\{-1,1\}
//! $$
//!
//! Converts an aligned price table into a signed percentage-return matrix.

use chrono::NaiveDate;
use tracing::warn;

use crate::error::PortfolioError;
use crate::error::Result;
use crate::instrument::InstrumentRegistry;
use crate::market_data::PriceTable;

/// Dates x instruments returns. A cell is `None` until the instrument has two
/// consecutive prices.
#[derive(Clone, Debug, Default)]
pub struct ReturnMatrix {
  pub dates: Vec<NaiveDate>,
  pub symbols: Vec<String>,
  /// One column per symbol, each `dates.len()` long.
  pub columns: Vec<Vec<Option<f64>>>,
}

impl ReturnMatrix {
  pub fn n_dates(&self) -> usize {
    self.dates.len()
  }

  pub fn n_instruments(&self) -> usize {
    self.symbols.len()
  }

  pub fn get(&self, row: usize, col: usize) -> Option<f64> {
    self.columns.get(col).and_then(|c| c.get(row)).copied().flatten()
  }

  /// Observed returns of column `col` in rows `0..=row`.
  pub fn history(&self, col: usize, row: usize) -> Vec<f64> {
    self.columns[col][..=row].iter().flatten().copied().collect()
  }
}

fn pct_change(column: &[Option<f64>]) -> Vec<Option<f64>> {
  let mut out = vec![None; column.len()];
  for t in 1..column.len() {
    if let (Some(prev), Some(cur)) = (column[t - 1], column[t]) {
      out[t] = Some(cur / prev - 1.0);
    }
  }
  out
}

fn column_returns(table: &PriceTable, col: usize, sign: f64) -> Result<Vec<Option<f64>>> {
  let symbol = &table.symbols[col];
  let column = &table.columns[col];

  let observed = table.observed(col);
  if observed < 2 {
    return Err(PortfolioError::data(
      symbol,
      format!("{observed} valid price observation(s), need at least 2"),
    ));
  }

  Ok(
    pct_change(column)
      .into_iter()
      .map(|r| r.map(|v| sign * v))
      .collect(),
  )
}

fn direction_of(registry: &InstrumentRegistry, symbol: &str) -> Result<f64> {
  registry
    .get(symbol)
    .map(|i| i.direction())
    .ok_or_else(|| PortfolioError::Config(format!("{symbol} is not in the instrument registry")))
}

/// Build the signed return matrix. Any instrument with fewer than two prices
/// fails the build.
pub fn build_return_matrix(table: &PriceTable, registry: &InstrumentRegistry) -> Result<ReturnMatrix> {
  let columns = (0..table.n_instruments())
    .map(|col| {
      let sign = direction_of(registry, &table.symbols[col])?;
      column_returns(table, col, sign)
    })
    .collect::<Result<Vec<_>>>()?;

  Ok(ReturnMatrix {
    dates: table.dates.clone(),
    symbols: table.symbols.clone(),
    columns,
  })
}

/// Like [`build_return_matrix`] but drops instruments failing with a data
/// error, only failing when none remain.
pub fn build_return_matrix_lenient(
  table: &PriceTable,
  registry: &InstrumentRegistry,
) -> Result<ReturnMatrix> {
  let mut symbols = Vec::new();
  let mut columns = Vec::new();
  let mut last_err = None;

  for col in 0..table.n_instruments() {
    let sign = direction_of(registry, &table.symbols[col])?;
    match column_returns(table, col, sign) {
      Ok(c) => {
        symbols.push(table.symbols[col].clone());
        columns.push(c);
      }
      Err(e @ PortfolioError::Data { .. }) => {
        warn!("dropping instrument: {e}");
        last_err = Some(e);
      }
      Err(e) => return Err(e),
    }
  }

  if columns.is_empty() {
    return Err(last_err.unwrap_or_else(|| PortfolioError::InsufficientData("empty price table".into())));
  }

  Ok(ReturnMatrix {
    dates: table.dates.clone(),
    symbols,
    columns,
  })
}
