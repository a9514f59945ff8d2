//! # Portfolio Types
//!
//! $$
//! \mathbf{w}^\*=\arg\max_{\mathbf{w}} \frac{\mathbb E[R_p]-r_f}{\sigma_p}
//! $$
//!
//! Shared configuration, result containers and the dated return series handed
//! from the portfolio builders to the analytics engine.

use chrono::NaiveDate;

use crate::error::PortfolioError;
use crate::error::Result;

/// Runtime configuration for [`MeanVarianceOptimizer`](super::MeanVarianceOptimizer).
#[derive(Clone, Debug)]
pub struct OptimizerConfig {
  /// Annualization factor for mean and covariance.
  pub trading_days: f64,
  /// Annual risk-free rate subtracted from the annualized portfolio return.
  pub risk_free: f64,
  /// Hard cap on solver iterations per date.
  pub max_iters: u64,
  /// Nelder-Mead simplex standard-deviation tolerance.
  pub sd_tolerance: f64,
  /// Decimal places kept in realized portfolio returns.
  pub rounding_decimals: u32,
}

impl Default for OptimizerConfig {
  fn default() -> Self {
    Self {
      trading_days: 252.0,
      risk_free: 0.04,
      max_iters: 2000,
      sd_tolerance: 1e-10,
      rounding_decimals: 4,
    }
  }
}

/// One scalar return per date.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReturnSeries {
  pub dates: Vec<NaiveDate>,
  pub values: Vec<f64>,
}

impl ReturnSeries {
  /// Build a series; dates must be strictly increasing and match `values` in length.
  pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
    if dates.len() != values.len() {
      return Err(PortfolioError::Config(format!(
        "return series has {} dates but {} values",
        dates.len(),
        values.len()
      )));
    }
    if dates.windows(2).any(|w| w[0] >= w[1]) {
      return Err(PortfolioError::Config(
        "return series dates must be strictly increasing".into(),
      ));
    }
    Ok(Self { dates, values })
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn get(&self, date: NaiveDate) -> Option<f64> {
    self
      .dates
      .binary_search(&date)
      .ok()
      .map(|i| self.values[i])
  }

  /// Values of `self` looked up on another date index; `None` where missing.
  pub fn reindex(&self, dates: &[NaiveDate]) -> Vec<Option<f64>> {
    dates.iter().map(|&d| self.get(d)).collect()
  }

  /// Dates present in both series with the paired values.
  pub fn intersect(&self, other: &ReturnSeries) -> (Vec<NaiveDate>, Vec<f64>, Vec<f64>) {
    let mut dates = Vec::new();
    let mut left = Vec::new();
    let mut right = Vec::new();
    let (mut i, mut j) = (0, 0);

    while i < self.dates.len() && j < other.dates.len() {
      match self.dates[i].cmp(&other.dates[j]) {
        std::cmp::Ordering::Less => i += 1,
        std::cmp::Ordering::Greater => j += 1,
        std::cmp::Ordering::Equal => {
          dates.push(self.dates[i]);
          left.push(self.values[i]);
          right.push(other.values[j]);
          i += 1;
          j += 1;
        }
      }
    }

    (dates, left, right)
  }
}

/// Optimizer state carried from one date's solve into the next.
#[derive(Clone, Debug, PartialEq)]
pub struct WarmStart {
  /// Active-set size the weights were solved for.
  pub active_size: usize,
  /// Solved weights.
  pub weights: Vec<f64>,
}

/// Outcome of a single date's weight selection.
#[derive(Clone, Debug)]
pub struct DateSolution {
  pub date: NaiveDate,
  /// Column indices of the active instruments, in matrix order.
  pub members: Vec<usize>,
  /// Weights the solver started from.
  pub initial_guess: Vec<f64>,
  /// Solved weights, one per member.
  pub weights: Vec<f64>,
  /// Annualized Sharpe ratio of the solved weights on the historical sample.
  pub sharpe: f64,
  /// False when the iteration cap was hit or the solver bailed out.
  pub converged: bool,
  pub iterations: u64,
  /// Rounded dot product of the date's observed returns with `weights`.
  pub realized_return: f64,
}

impl DateSolution {
  pub fn warm_start(&self) -> WarmStart {
    WarmStart {
      active_size: self.members.len(),
      weights: self.weights.clone(),
    }
  }
}

/// Output of a full sequential optimizer run.
#[derive(Clone, Debug, Default)]
pub struct OptimizedPortfolio {
  pub returns: ReturnSeries,
  pub solutions: Vec<DateSolution>,
}

impl OptimizedPortfolio {
  /// Dates whose solve stopped before reaching tolerance.
  pub fn non_converged(&self) -> Vec<NaiveDate> {
    self
      .solutions
      .iter()
      .filter(|s| !s.converged)
      .map(|s| s.date)
      .collect()
  }
}

/// Round to `decimals` places, ties to even.
pub fn round_to(x: f64, decimals: u32) -> f64 {
  let scale = 10f64.powi(decimals as i32);
  (x * scale).round_ties_even() / scale
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
  a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
