//! # Performance Ratios
//!
//! $$
//! S=\frac{\bar r - r_f^{d}}{\hat\sigma}\sqrt{N},\qquad
//! IR=\frac{\overline{r-b}}{\hat\sigma_{r-b}}\sqrt{N}
//! $$
//!
//! Point and rolling risk-adjusted return ratios.

use super::rolling::rolling_apply;
use super::rolling::rolling_apply_pair;
use super::rolling::std_of;
use super::types::MetricValue;
use crate::portfolio::moments::sample_mean;

/// `mean / std * sqrt(trading_days)` over the whole sample.
pub fn sharpe_ratio(returns: &[f64], trading_days: f64) -> MetricValue {
  match std_of(returns) {
    MetricValue::Defined(std) => MetricValue::ratio(sample_mean(returns), std).map(|s| s * trading_days.sqrt()),
    undefined => undefined,
  }
}

/// Like [`sharpe_ratio`] with the standard deviation of negative returns only.
pub fn sortino_ratio(returns: &[f64], trading_days: f64) -> MetricValue {
  let downside: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
  if downside.is_empty() {
    return MetricValue::EMPTY;
  }

  match std_of(&downside) {
    MetricValue::Defined(std) => MetricValue::ratio(sample_mean(returns), std).map(|s| s * trading_days.sqrt()),
    undefined => undefined,
  }
}

/// Trailing-window annualized Sharpe ratio in excess of the daily risk-free rate.
pub fn rolling_sharpe(returns: &[f64], window: usize, daily_risk_free: f64, trading_days: f64) -> Vec<MetricValue> {
  rolling_apply(returns, window, |w| match std_of(w) {
    MetricValue::Defined(std) => {
      MetricValue::ratio(sample_mean(w) - daily_risk_free, std).map(|s| s * trading_days.sqrt())
    }
    undefined => undefined,
  })
}

/// Trailing-window information ratio against a benchmark aligned to `returns`.
pub fn information_ratio(
  returns: &[f64],
  benchmark: &[Option<f64>],
  window: usize,
  trading_days: f64,
) -> Vec<MetricValue> {
  rolling_apply_pair(returns, benchmark, window, |p, b| {
    let active: Vec<f64> = p.iter().zip(b.iter()).map(|(x, y)| x - y).collect();
    match std_of(&active) {
      MetricValue::Defined(std) => {
        MetricValue::ratio(sample_mean(&active), std).map(|s| s * trading_days.sqrt())
      }
      undefined => undefined,
    }
  })
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;

  use super::*;

  #[test]
  fn zero_returns_leave_ratios_undefined() {
    let zeros = [0.0; 30];
    assert_eq!(sharpe_ratio(&zeros, 252.0), MetricValue::DIV_ZERO);
    assert_eq!(sortino_ratio(&zeros, 252.0), MetricValue::EMPTY);
    assert!(rolling_sharpe(&zeros, 14, 0.0, 252.0)
      .iter()
      .skip(13)
      .all(|v| *v == MetricValue::DIV_ZERO));
  }

  #[test]
  fn sharpe_matches_closed_form() {
    let r = [0.01, 0.03];
    let expected = 0.02 / (2.0f64.sqrt() * 0.01) * 252.0f64.sqrt();
    assert_relative_eq!(sharpe_ratio(&r, 252.0).value().unwrap(), expected, epsilon = 1e-9);
  }

  #[test]
  fn sortino_uses_downside_deviation() {
    let r = [0.02, -0.01, 0.03, -0.03];
    let downside_std = 2.0f64.sqrt() * 0.01;
    let expected = 0.0025 / downside_std * 252.0f64.sqrt();
    assert_relative_eq!(sortino_ratio(&r, 252.0).value().unwrap(), expected, epsilon = 1e-9);

    assert_eq!(sortino_ratio(&[0.01, -0.02], 252.0), MetricValue::INSUFFICIENT);
  }

  #[test]
  fn information_ratio_of_identical_series_is_undefined() {
    let r = [0.01, -0.02, 0.015, 0.0, 0.007];
    let b: Vec<Option<f64>> = r.iter().copied().map(Some).collect();
    let ir = information_ratio(&r, &b, 3, 252.0);
    assert_eq!(ir[..2], [MetricValue::INSUFFICIENT; 2]);
    assert!(ir[2..].iter().all(|v| *v == MetricValue::DIV_ZERO));
  }

  #[test]
  fn information_ratio_tracks_excess_return() {
    let r = [0.02, 0.01, 0.03];
    let b = [Some(0.01), Some(0.01), Some(0.01)];
    let ir = information_ratio(&r, &b, 3, 252.0);
    // active returns 0.01, 0.0, 0.02: mean 0.01, std 0.01
    assert_relative_eq!(ir[2].value().unwrap(), 252.0f64.sqrt(), epsilon = 1e-9);
  }
}
