//! # Historical Moments
//!
//! $$
//! \Sigma_{ij} = \sigma_i \sigma_j \rho_{ij}
//! $$
//!
//! Sample statistics shared by the optimizer and the analytics engine, and the
//! annualized mean/covariance inputs of a single date's solve.

use super::returns::ReturnMatrix;

pub(crate) fn sample_mean(xs: &[f64]) -> f64 {
  if xs.is_empty() {
    0.0
  } else {
    xs.iter().sum::<f64>() / xs.len() as f64
  }
}

/// Unbiased (ddof 1) variance; `None` below two observations.
pub(crate) fn sample_variance(xs: &[f64]) -> Option<f64> {
  if xs.len() < 2 {
    return None;
  }

  let mean = sample_mean(xs);
  let mut acc = 0.0;
  for &x in xs {
    let d = x - mean;
    acc += d * d;
  }
  Some(acc / (xs.len() - 1) as f64)
}

/// Unbiased (ddof 1) covariance of two equally long samples.
pub(crate) fn sample_covariance(x: &[f64], y: &[f64]) -> Option<f64> {
  let n = x.len().min(y.len());
  if n < 2 {
    return None;
  }

  let mx = sample_mean(&x[..n]);
  let my = sample_mean(&y[..n]);
  let acc: f64 = x.iter().zip(y.iter()).map(|(a, b)| (a - mx) * (b - my)).sum();
  Some(acc / (n - 1) as f64)
}

fn pearson(x: &[f64], y: &[f64]) -> f64 {
  let n = x.len().min(y.len());
  if n < 2 {
    return 0.0;
  }

  let mx = sample_mean(&x[..n]);
  let my = sample_mean(&y[..n]);

  let mut cov = 0.0;
  let mut sx = 0.0;
  let mut sy = 0.0;

  for i in 0..n {
    let dx = x[i] - mx;
    let dy = y[i] - my;
    cov += dx * dy;
    sx += dx * dx;
    sy += dy * dy;
  }

  let denom = (sx * sy).sqrt();
  if denom < 1e-15 {
    0.0
  } else {
    (cov / denom).clamp(-1.0, 1.0)
  }
}

/// Pearson correlation matrix of aligned series. Undefined pairs are zero.
pub fn correlation_matrix(aligned: &[Vec<f64>]) -> Vec<Vec<f64>> {
  let n = aligned.len();
  let mut corr = vec![vec![1.0; n]; n];

  for i in 0..n {
    for j in (i + 1)..n {
      let r = pearson(&aligned[i], &aligned[j]);
      corr[i][j] = r;
      corr[j][i] = r;
    }
  }

  corr
}

/// Covariance from per-asset volatilities and a correlation matrix.
pub fn covariance_matrix(sigmas: &[f64], corr: &[Vec<f64>]) -> Vec<Vec<f64>> {
  let n = sigmas.len();
  let mut cov = vec![vec![0.0; n]; n];

  for i in 0..n {
    for j in 0..n {
      let c_ij = corr
        .get(i)
        .and_then(|row| row.get(j))
        .copied()
        .unwrap_or(if i == j { 1.0 } else { 0.0 });
      cov[i][j] = sigmas[i] * sigmas[j] * c_ij;
    }
  }

  cov
}

/// Annualized inputs of one date's objective.
#[derive(Clone, Debug)]
pub struct HistoricalMoments {
  /// Annualized mean of each member over its own observed history.
  pub mu: Vec<f64>,
  /// Annualized covariance, `sigma_i sigma_j rho_ij`.
  pub cov: Vec<Vec<f64>>,
  /// Smallest per-member observation count.
  pub min_obs: usize,
}

/// Moments of the active members over rows `0..=row`.
///
/// Volatilities use each member's full observed history; correlations use the
/// rows where every member is observed, so the covariance stays positive
/// semi-definite when histories have different lengths.
pub fn historical_moments(
  matrix: &ReturnMatrix,
  members: &[usize],
  row: usize,
  trading_days: f64,
) -> HistoricalMoments {
  let histories: Vec<Vec<f64>> = members.iter().map(|&c| matrix.history(c, row)).collect();

  let mu = histories
    .iter()
    .map(|h| sample_mean(h) * trading_days)
    .collect();
  let sigmas: Vec<f64> = histories
    .iter()
    .map(|h| (sample_variance(h).unwrap_or(0.0) * trading_days).sqrt())
    .collect();
  let min_obs = histories.iter().map(|h| h.len()).min().unwrap_or(0);

  let mut aligned = vec![Vec::new(); members.len()];
  for r in 0..=row {
    let obs: Option<Vec<f64>> = members.iter().map(|&c| matrix.get(r, c)).collect();
    if let Some(obs) = obs {
      for (series, v) in aligned.iter_mut().zip(obs) {
        series.push(v);
      }
    }
  }

  let corr = correlation_matrix(&aligned);
  HistoricalMoments {
    mu,
    cov: covariance_matrix(&sigmas, &corr),
    min_obs,
  }
}
