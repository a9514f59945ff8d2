//! # Benchmark Regression
//!
//! $$
//! r_t=\alpha+\beta b_t+\varepsilon_t
//! $$
//!
//! Ordinary least squares of portfolio returns on benchmark returns, with
//! t-statistics and two-sided Student-t p-values.

use nalgebra::DMatrix;
use nalgebra::DVector;
use statrs::distribution::ContinuousCDF;
use statrs::distribution::StudentsT;

use super::types::MetricValue;
use super::types::ZERO_TOLERANCE;
use crate::error::PortfolioError;
use crate::error::Result;
use crate::portfolio::moments::sample_variance;

#[derive(Debug, Clone)]
pub struct OlsResult {
  pub beta: Vec<f64>,
  pub std_err: Vec<f64>,
  pub sse: f64,
  pub nobs: usize,
  pub k: usize,
}

/// OLS of `y` on the rows of `x`.
pub fn ols(y: &[f64], x: &[Vec<f64>]) -> Result<OlsResult> {
  if y.len() != x.len() {
    return Err(PortfolioError::Config("OLS y/x row mismatch".into()));
  }
  let n = y.len();
  let k = x.first().map(|row| row.len()).unwrap_or(0);
  if k == 0 || x.iter().any(|row| row.len() != k) {
    return Err(PortfolioError::Config("OLS design matrix must be rectangular and non-empty".into()));
  }
  if n <= k {
    return Err(PortfolioError::InsufficientData(format!(
      "OLS needs more than {k} observations, got {n}"
    )));
  }

  let mut flat_x = Vec::with_capacity(n * k);
  for row in x {
    flat_x.extend_from_slice(row);
  }

  let x_mat = DMatrix::from_row_slice(n, k, &flat_x);
  let y_vec = DVector::from_row_slice(y);

  let xtx = x_mat.transpose() * &x_mat;
  let xtx_inv = xtx
    .try_inverse()
    .ok_or(PortfolioError::DivisionByZero("OLS: singular design matrix"))?;

  let beta = &xtx_inv * x_mat.transpose() * &y_vec;
  let fitted = &x_mat * &beta;
  let residuals = y_vec - fitted;
  let sse = residuals.iter().map(|u| u * u).sum::<f64>();
  let sigma2 = sse / (n - k) as f64;
  let std_err = (0..k)
    .map(|i| (xtx_inv[(i, i)] * sigma2).max(0.0).sqrt())
    .collect();

  Ok(OlsResult {
    beta: beta.iter().copied().collect(),
    std_err,
    sse,
    nobs: n,
    k,
  })
}

/// Alpha/beta of a portfolio against a benchmark.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionSummary {
  /// Intercept times the annualization factor.
  pub alpha: f64,
  pub alpha_t: MetricValue,
  pub alpha_p: MetricValue,
  pub beta: f64,
  pub beta_t: MetricValue,
  pub beta_p: MetricValue,
  pub r_squared: MetricValue,
  pub nobs: usize,
}

fn two_sided_p(t: MetricValue, df: f64) -> MetricValue {
  match (t, StudentsT::new(0.0, 1.0, df)) {
    (MetricValue::Defined(t), Ok(dist)) => MetricValue::Defined((2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0)),
    (MetricValue::Defined(_), Err(_)) => MetricValue::INSUFFICIENT,
    (undefined, _) => undefined,
  }
}

/// Regress aligned portfolio returns `y` on benchmark returns `x`.
pub fn alpha_beta(y: &[f64], x: &[f64], trading_days: f64) -> Result<RegressionSummary> {
  if y.len() != x.len() {
    return Err(PortfolioError::Config("regression inputs must be aligned".into()));
  }

  if x.len() > 2 && sample_variance(x).unwrap_or(0.0) < ZERO_TOLERANCE {
    return Err(PortfolioError::DivisionByZero("alpha/beta regression: benchmark has no variance"));
  }

  let design: Vec<Vec<f64>> = x.iter().map(|&b| vec![1.0, b]).collect();
  let fit = ols(y, &design)?;

  let df = (fit.nobs - fit.k) as f64;
  let alpha_t = MetricValue::ratio(fit.beta[0], fit.std_err[0]);
  let beta_t = MetricValue::ratio(fit.beta[1], fit.std_err[1]);

  let mean_y = y.iter().sum::<f64>() / y.len() as f64;
  let sst: f64 = y.iter().map(|v| (v - mean_y).powi(2)).sum();
  let r_squared = if sst < ZERO_TOLERANCE {
    MetricValue::DIV_ZERO
  } else {
    MetricValue::Defined(1.0 - fit.sse / sst)
  };

  Ok(RegressionSummary {
    alpha: fit.beta[0] * trading_days,
    alpha_t,
    alpha_p: two_sided_p(alpha_t, df),
    beta: fit.beta[1],
    beta_t,
    beta_p: two_sided_p(beta_t, df),
    r_squared,
    nobs: fit.nobs,
  })
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;

  use super::*;

  #[test]
  fn recovers_known_coefficients() {
    let x = [0.01, -0.02, 0.015, 0.003, -0.007, 0.012, -0.001, 0.02];
    let noise = [0.0004, -0.0003, 0.0001, -0.0002, 0.0003, -0.0001, 0.0002, -0.0004];
    let y: Vec<f64> = x
      .iter()
      .zip(noise.iter())
      .map(|(b, e)| 0.0005 + 1.5 * b + e)
      .collect();

    let summary = alpha_beta(&y, &x, 252.0).unwrap();
    assert_relative_eq!(summary.beta, 1.5, epsilon = 0.05);
    assert_relative_eq!(summary.alpha / 252.0, 0.0005, epsilon = 0.0005);
    assert!(summary.beta_t.value().unwrap() > 10.0);
    assert!(summary.beta_p.value().unwrap() < 0.01);
    assert!(summary.r_squared.value().unwrap() > 0.95);
    assert_eq!(summary.nobs, 8);
  }

  #[test]
  fn exact_fit_has_undefined_t_stats() {
    let x = [0.01, 0.02, 0.03, 0.04];
    let y: Vec<f64> = x.iter().map(|b| 2.0 * b).collect();
    let summary = alpha_beta(&y, &x, 252.0).unwrap();
    assert_relative_eq!(summary.beta, 2.0, epsilon = 1e-9);
    assert_eq!(summary.beta_t, MetricValue::DIV_ZERO);
    assert_eq!(summary.beta_p, MetricValue::DIV_ZERO);
  }

  #[test]
  fn degenerate_inputs_are_errors() {
    assert!(matches!(
      alpha_beta(&[0.01, 0.02], &[0.01, 0.03], 252.0),
      Err(PortfolioError::InsufficientData(_))
    ));
    assert!(matches!(
      alpha_beta(&[0.01, 0.02, 0.03], &[0.01, 0.01, 0.01], 252.0),
      Err(PortfolioError::DivisionByZero(_))
    ));
  }
}
