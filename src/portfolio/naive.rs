//! # Naive Portfolio
//!
//! $$
//! R_t = \frac{1}{|A_t|}\sum_{i\in A_t} r_{i,t}
//! $$
//!
//! Equal-weight baseline over each date's active set.

use super::active_set::active_sets;
use super::optimizer::equal_weights;
use super::returns::ReturnMatrix;
use super::types::ReturnSeries;
use super::types::dot;
use super::types::round_to;
use crate::error::Result;

/// Equal-weight portfolio returns from the second date onward.
pub fn naive_portfolio(matrix: &ReturnMatrix, rounding_decimals: u32) -> Result<ReturnSeries> {
  let sets = active_sets(matrix)?;
  let dates = sets.iter().map(|a| a.date).collect();
  let values = sets
    .iter()
    .map(|a| round_to(dot(&a.returns, &equal_weights(a.len())), rounding_decimals))
    .collect();

  ReturnSeries::new(dates, values)
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;
  use crate::error::PortfolioError;

  fn matrix(columns: Vec<Vec<Option<f64>>>) -> ReturnMatrix {
    let n = columns[0].len();
    ReturnMatrix {
      dates: (1..=n as u32)
        .map(|d| NaiveDate::from_ymd_opt(2022, 4, d).unwrap())
        .collect(),
      symbols: (0..columns.len()).map(|i| format!("S{i}")).collect(),
      columns,
    }
  }

  #[test]
  fn averages_only_active_members() {
    let m = matrix(vec![
      vec![None, Some(0.01), Some(0.02), Some(0.03)],
      vec![None, Some(0.03), Some(0.04), Some(-0.03)],
      vec![None, None, None, Some(0.06)],
    ]);

    let series = naive_portfolio(&m, 4).unwrap();
    assert_eq!(series.dates, m.dates[1..].to_vec());
    assert_eq!(series.values, vec![0.02, 0.03, 0.02]);
  }

  #[test]
  fn rounds_to_requested_precision() {
    let m = matrix(vec![
      vec![None, Some(0.012_34)],
      vec![None, Some(0.000_01)],
      vec![None, Some(0.0)],
    ]);
    let series = naive_portfolio(&m, 4).unwrap();
    assert_eq!(series.values, vec![0.0041]);
  }

  #[test]
  fn empty_date_is_an_error() {
    let m = matrix(vec![vec![None, None, Some(0.01)]]);
    assert!(matches!(
      naive_portfolio(&m, 4),
      Err(PortfolioError::InsufficientData(_))
    ));
  }
}
