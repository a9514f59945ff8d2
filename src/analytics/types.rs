//! # Analytics Types
//!
//! Metric values that can be explicitly undefined, dated metric series, and
//! the analytics configuration.

use std::fmt;

use chrono::NaiveDate;

use crate::error::PortfolioError;
use crate::error::Result;

/// Denominators below this magnitude are treated as zero.
pub const ZERO_TOLERANCE: f64 = 1e-12;

/// Why a metric has no value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UndefinedReason {
  /// Not enough observations (e.g. inside the first rolling window).
  InsufficientData,
  /// The ratio's denominator (volatility, standard deviation) is zero.
  DivisionByZero,
  /// The sample the statistic is taken over is empty (no negative returns,
  /// no tail observations).
  EmptySample,
}

/// A scalar metric or one point of a metric series.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MetricValue {
  Defined(f64),
  Undefined(UndefinedReason),
}

impl MetricValue {
  pub const INSUFFICIENT: Self = Self::Undefined(UndefinedReason::InsufficientData);
  pub const DIV_ZERO: Self = Self::Undefined(UndefinedReason::DivisionByZero);
  pub const EMPTY: Self = Self::Undefined(UndefinedReason::EmptySample);

  /// `num / den`, or `DivisionByZero` when `den` is (numerically) zero.
  pub fn ratio(num: f64, den: f64) -> Self {
    if !den.is_finite() || den.abs() < ZERO_TOLERANCE {
      Self::DIV_ZERO
    } else {
      Self::Defined(num / den)
    }
  }

  pub fn value(&self) -> Option<f64> {
    match self {
      Self::Defined(v) => Some(*v),
      Self::Undefined(_) => None,
    }
  }

  pub fn is_defined(&self) -> bool {
    matches!(self, Self::Defined(_))
  }

  pub fn reason(&self) -> Option<UndefinedReason> {
    match self {
      Self::Defined(_) => None,
      Self::Undefined(r) => Some(*r),
    }
  }

  pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
    match self {
      Self::Defined(v) => Self::Defined(f(v)),
      undefined => undefined,
    }
  }
}

impl fmt::Display for MetricValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      MetricValue::Defined(v) => write!(f, "{v:.4}"),
      MetricValue::Undefined(UndefinedReason::InsufficientData) => write!(f, "n/a (insufficient data)"),
      MetricValue::Undefined(UndefinedReason::DivisionByZero) => write!(f, "n/a (zero denominator)"),
      MetricValue::Undefined(UndefinedReason::EmptySample) => write!(f, "n/a (empty sample)"),
    }
  }
}

/// A metric aligned to a portfolio's date index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricSeries {
  pub dates: Vec<NaiveDate>,
  pub values: Vec<MetricValue>,
}

impl MetricSeries {
  pub fn new(dates: Vec<NaiveDate>, values: Vec<MetricValue>) -> Self {
    debug_assert_eq!(dates.len(), values.len());
    Self { dates, values }
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn get(&self, date: NaiveDate) -> Option<MetricValue> {
    self
      .dates
      .binary_search(&date)
      .ok()
      .map(|i| self.values[i])
  }

  /// Dated values that are defined.
  pub fn defined(&self) -> Vec<(NaiveDate, f64)> {
    self
      .dates
      .iter()
      .zip(self.values.iter())
      .filter_map(|(&d, v)| v.value().map(|x| (d, x)))
      .collect()
  }

  /// Number of undefined entries before the first defined one.
  pub fn leading_undefined(&self) -> usize {
    self.values.iter().take_while(|v| !v.is_defined()).count()
  }

  pub fn last_defined(&self) -> Option<f64> {
    self.values.iter().rev().find_map(|v| v.value())
  }
}

/// Configuration of [`AnalyticsEngine`](super::AnalyticsEngine).
#[derive(Clone, Debug)]
pub struct AnalyticsConfig {
  /// Rolling window length in trading days.
  pub window: usize,
  /// Annualization factor.
  pub trading_days: f64,
  /// Annual risk-free rate used by the rolling Sharpe ratio.
  pub risk_free: f64,
  /// VaR/CVaR confidence level.
  pub confidence: f64,
  /// Minimum sample size for VaR/CVaR.
  pub min_var_observations: usize,
}

impl Default for AnalyticsConfig {
  fn default() -> Self {
    Self {
      window: 14,
      trading_days: 252.0,
      risk_free: 0.03,
      confidence: 0.95,
      min_var_observations: 5,
    }
  }
}

impl AnalyticsConfig {
  pub fn validate(&self) -> Result<()> {
    if self.window < 2 {
      return Err(PortfolioError::Config(format!(
        "rolling window must be at least 2, got {}",
        self.window
      )));
    }
    if !(self.confidence > 0.0 && self.confidence < 1.0) {
      return Err(PortfolioError::Config(format!(
        "confidence must be in (0, 1), got {}",
        self.confidence
      )));
    }
    if !(self.trading_days > 0.0) {
      return Err(PortfolioError::Config("trading_days must be positive".into()));
    }
    if self.min_var_observations == 0 {
      return Err(PortfolioError::Config("min_var_observations must be positive".into()));
    }
    Ok(())
  }

  pub fn daily_risk_free(&self) -> f64 {
    self.risk_free / self.trading_days
  }

  pub fn annualizer(&self) -> f64 {
    self.trading_days.sqrt()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ratio_flags_zero_denominators() {
    assert_eq!(MetricValue::ratio(1.0, 2.0), MetricValue::Defined(0.5));
    assert_eq!(MetricValue::ratio(1.0, 0.0), MetricValue::DIV_ZERO);
    assert_eq!(MetricValue::ratio(1.0, 1e-15), MetricValue::DIV_ZERO);
  }

  #[test]
  fn config_validation() {
    assert!(AnalyticsConfig::default().validate().is_ok());
    let bad = AnalyticsConfig {
      window: 1,
      ..AnalyticsConfig::default()
    };
    assert!(bad.validate().is_err());
    let bad = AnalyticsConfig {
      confidence: 1.0,
      ..AnalyticsConfig::default()
    };
    assert!(bad.validate().is_err());
  }
}
