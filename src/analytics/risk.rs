//! # Risk Metrics
//!
//! $$
//! DD_t=\frac{W_t-\max_{s\le t}W_s}{\max_{s\le t}W_s},\qquad W_t=\prod_{s\le t}(1+r_s)
//! $$
//!
//! Wealth, drawdown and historical VaR/CVaR over a single return series.

use super::types::MetricValue;

/// Compounded wealth index starting from 1.
pub fn wealth_index(returns: &[f64]) -> Vec<f64> {
  returns
    .iter()
    .scan(1.0, |w, &r| {
      *w *= 1.0 + r;
      Some(*w)
    })
    .collect()
}

/// Cumulative return `W_t - 1`.
pub fn cumulative_returns(returns: &[f64]) -> Vec<f64> {
  wealth_index(returns).into_iter().map(|w| w - 1.0).collect()
}

/// Drawdown from the running wealth peak; zero at every new peak.
pub fn drawdown(returns: &[f64]) -> Vec<MetricValue> {
  let mut peak = f64::NEG_INFINITY;
  wealth_index(returns)
    .into_iter()
    .map(|w| {
      peak = peak.max(w);
      if peak <= 0.0 {
        MetricValue::DIV_ZERO
      } else {
        MetricValue::Defined(((w - peak) / peak).min(0.0))
      }
    })
    .collect()
}

/// Deepest drawdown of the series.
pub fn max_drawdown(returns: &[f64]) -> MetricValue {
  if returns.is_empty() {
    return MetricValue::INSUFFICIENT;
  }

  let dd = drawdown(returns);
  if let Some(undefined) = dd.iter().find(|v| !v.is_defined()) {
    return *undefined;
  }
  MetricValue::Defined(dd.iter().filter_map(|v| v.value()).fold(0.0, f64::min))
}

/// Historical VaR: the `1 - confidence` empirical quantile, taking the lower
/// order statistic (`floor(q (n - 1))`).
pub fn value_at_risk(returns: &[f64], confidence: f64, min_observations: usize) -> MetricValue {
  if returns.is_empty() || returns.len() < min_observations {
    return MetricValue::INSUFFICIENT;
  }

  let mut sorted = returns.to_vec();
  sorted.sort_by(|a, b| a.total_cmp(b));
  let q = (1.0 - confidence).clamp(0.0, 1.0);
  let idx = ((q * (sorted.len() - 1) as f64).floor() as usize).min(sorted.len() - 1);
  MetricValue::Defined(sorted[idx])
}

/// Historical CVaR: mean of the observations at or beyond the VaR threshold
/// of the same series.
pub fn conditional_value_at_risk(returns: &[f64], confidence: f64, min_observations: usize) -> MetricValue {
  let var = match value_at_risk(returns, confidence, min_observations) {
    MetricValue::Defined(v) => v,
    undefined => return undefined,
  };

  let tail: Vec<f64> = returns.iter().copied().filter(|&r| r <= var).collect();
  if tail.is_empty() {
    return MetricValue::EMPTY;
  }
  MetricValue::Defined(tail.iter().sum::<f64>() / tail.len() as f64)
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;

  use super::*;

  const SAMPLE: [f64; 5] = [0.01, -0.02, 0.03, -0.01, 0.02];

  #[test]
  fn drawdown_is_non_positive_and_zero_at_peaks() {
    let returns = [0.05, -0.10, 0.02, 0.10, -0.03];
    let dd = drawdown(&returns);
    let wealth = wealth_index(&returns);

    let mut peak = f64::NEG_INFINITY;
    for (w, v) in wealth.iter().zip(dd.iter()) {
      let v = v.value().unwrap();
      assert!(v <= 0.0);
      if *w >= peak {
        peak = *w;
        assert_eq!(v, 0.0);
      }
    }
    assert_relative_eq!(dd[1].value().unwrap(), -0.10, epsilon = 1e-12);
    assert_relative_eq!(max_drawdown(&returns).value().unwrap(), -0.10, epsilon = 1e-12);
  }

  #[test]
  fn cumulative_returns_compound() {
    let cum = cumulative_returns(&[0.10, 0.10]);
    assert_relative_eq!(cum[1], 0.21, epsilon = 1e-12);
  }

  #[test]
  fn small_sample_var_is_worst_observation() {
    let var = value_at_risk(&SAMPLE, 0.95, 5).value().unwrap();
    let cvar = conditional_value_at_risk(&SAMPLE, 0.95, 5).value().unwrap();
    assert_eq!(var, -0.02);
    assert_eq!(cvar, -0.02);
  }

  #[test]
  fn cvar_never_exceeds_var() {
    let returns: Vec<f64> = (0..200)
      .map(|i| ((i * 37 % 101) as f64 - 50.0) / 1000.0)
      .collect();
    for confidence in [0.9, 0.95, 0.99] {
      let var = value_at_risk(&returns, confidence, 5).value().unwrap();
      let cvar = conditional_value_at_risk(&returns, confidence, 5).value().unwrap();
      assert!(cvar <= var, "cvar {cvar} > var {var} at {confidence}");
    }
  }

  #[test]
  fn var_needs_minimum_sample() {
    assert_eq!(value_at_risk(&SAMPLE[..3], 0.95, 5), MetricValue::INSUFFICIENT);
    assert_eq!(conditional_value_at_risk(&[], 0.95, 1), MetricValue::INSUFFICIENT);
  }
}
