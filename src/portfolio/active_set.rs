//! # Active-Set Resolver
//!
//! Per-date selection of the instruments that have an observed return.

use chrono::NaiveDate;

use super::returns::ReturnMatrix;
use crate::error::PortfolioError;
use crate::error::Result;

/// Instruments with a return on one date, in matrix column order.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveSet {
  /// Row in the return matrix.
  pub row: usize,
  pub date: NaiveDate,
  /// Column indices of the active instruments.
  pub members: Vec<usize>,
  /// Observed returns, aligned with `members`.
  pub returns: Vec<f64>,
}

impl ActiveSet {
  pub fn len(&self) -> usize {
    self.members.len()
  }

  pub fn is_empty(&self) -> bool {
    self.members.is_empty()
  }
}

/// Active set for a single row. An empty set is an error.
pub fn resolve_active_set(matrix: &ReturnMatrix, row: usize) -> Result<ActiveSet> {
  let date = *matrix
    .dates
    .get(row)
    .ok_or_else(|| PortfolioError::InsufficientData(format!("row {row} is outside the return matrix")))?;

  let (members, returns): (Vec<usize>, Vec<f64>) = (0..matrix.n_instruments())
    .filter_map(|col| matrix.get(row, col).map(|r| (col, r)))
    .unzip();

  if members.is_empty() {
    return Err(PortfolioError::InsufficientData(format!(
      "no active instruments on {date}"
    )));
  }

  Ok(ActiveSet {
    row,
    date,
    members,
    returns,
  })
}

/// Active sets for every date after the first.
pub fn active_sets(matrix: &ReturnMatrix) -> Result<Vec<ActiveSet>> {
  (1..matrix.n_dates())
    .map(|row| resolve_active_set(matrix, row))
    .collect()
}
