//! # Rolling Windows
//!
//! $$
//! \hat\sigma_t=\sqrt{\tfrac{1}{w-1}\textstyle\sum_{s=t-w+1}^{t}(r_s-\bar r_t)^2}
//! $$
//!
//! Trailing-window helpers. The first `window - 1` outputs are always
//! `InsufficientData`.

use super::types::MetricValue;
use crate::portfolio::moments::sample_covariance;
use crate::portfolio::moments::sample_mean;
use crate::portfolio::moments::sample_variance;

/// Apply `f` to every trailing window of `values`.
pub fn rolling_apply(values: &[f64], window: usize, f: impl Fn(&[f64]) -> MetricValue) -> Vec<MetricValue> {
  (0..values.len())
    .map(|t| {
      if window == 0 || t + 1 < window {
        MetricValue::INSUFFICIENT
      } else {
        f(&values[t + 1 - window..=t])
      }
    })
    .collect()
}

/// Apply `f` to trailing windows of paired observations. A window with any
/// missing partner value is `InsufficientData`.
pub fn rolling_apply_pair(
  x: &[f64],
  y: &[Option<f64>],
  window: usize,
  f: impl Fn(&[f64], &[f64]) -> MetricValue,
) -> Vec<MetricValue> {
  let n = x.len().min(y.len());
  (0..n)
    .map(|t| {
      if window == 0 || t + 1 < window {
        return MetricValue::INSUFFICIENT;
      }
      let start = t + 1 - window;
      let ys: Option<Vec<f64>> = y[start..=t].iter().copied().collect();
      match ys {
        Some(ys) => f(&x[start..=t], &ys),
        None => MetricValue::INSUFFICIENT,
      }
    })
    .collect()
}

pub fn rolling_mean(values: &[f64], window: usize) -> Vec<MetricValue> {
  rolling_apply(values, window, |w| MetricValue::Defined(sample_mean(w)))
}

/// Rolling sample standard deviation (ddof 1).
pub fn rolling_std(values: &[f64], window: usize) -> Vec<MetricValue> {
  rolling_apply(values, window, std_of)
}

/// Rolling `cov(x, y) / var(y)`.
pub fn rolling_beta(x: &[f64], y: &[Option<f64>], window: usize) -> Vec<MetricValue> {
  rolling_apply_pair(x, y, window, |xs, ys| {
    match (sample_covariance(xs, ys), sample_variance(ys)) {
      (Some(cov), Some(var)) => MetricValue::ratio(cov, var),
      _ => MetricValue::INSUFFICIENT,
    }
  })
}

pub(crate) fn std_of(xs: &[f64]) -> MetricValue {
  match sample_variance(xs) {
    Some(v) => MetricValue::Defined(v.max(0.0).sqrt()),
    None => MetricValue::INSUFFICIENT,
  }
}
