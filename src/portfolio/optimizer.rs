//! # Rolling Mean-Variance Optimizer
//!
//! $$
//! \max_{\mathbf{w}\in\Delta^{n-1}} \frac{252\,\mathbf{w}^\top\bar{\mathbf r} - r_f}{\sqrt{\mathbf{w}^\top (252\,\Sigma)\mathbf{w}}}
//! $$
//!
//! Day-by-day maximum-Sharpe weights over the active set. The simplex
//! constraint is enforced by a softmax parameterization, and each date's solve
//! is seeded with the previous date's weights whenever the active-set size is
//! unchanged.

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::core::State;
use argmin::core::TerminationReason;
use argmin::solver::neldermead::NelderMead;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::active_set::ActiveSet;
use super::active_set::active_sets;
use super::moments::historical_moments;
use super::returns::ReturnMatrix;
use super::types::DateSolution;
use super::types::OptimizedPortfolio;
use super::types::OptimizerConfig;
use super::types::ReturnSeries;
use super::types::WarmStart;
use super::types::dot;
use super::types::round_to;
use crate::error::Result;

/// Volatility floor keeping the objective finite on degenerate samples.
const VOL_FLOOR: f64 = 1e-10;
/// Smallest weight representable through the logit seed.
const MIN_SEED_WEIGHT: f64 = 1e-12;
/// Seed weights are lifted to this floor before a simplex is built around them.
const SIMPLEX_SEED_FLOOR: f64 = 1e-4;
/// Upper bound on Nelder-Mead restarts per date.
const MAX_RESTARTS: usize = 8;
/// Relative Sharpe gain below which a restart counts as no improvement.
const RESTART_TOLERANCE: f64 = 1e-9;

fn mat_vec_mul(mat: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
  mat
    .iter()
    .map(|row| row.iter().zip(v.iter()).map(|(a, b)| a * b).sum())
    .collect()
}

fn softmax(x: &[f64]) -> Vec<f64> {
  if x.is_empty() {
    return Vec::new();
  }

  let max_x = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
  let exps: Vec<f64> = x.iter().map(|&v| (v - max_x).exp()).collect();
  let sum: f64 = exps.iter().sum();

  if sum < 1e-15 {
    vec![1.0 / x.len() as f64; x.len()]
  } else {
    exps.iter().map(|&e| e / sum).collect()
  }
}

/// Inverse of [`softmax`] up to an additive constant.
fn logits(w: &[f64]) -> Vec<f64> {
  w.iter().map(|&wi| wi.max(MIN_SEED_WEIGHT).ln()).collect()
}

/// Lift every weight to [`SIMPLEX_SEED_FLOOR`] and renormalize.
fn floor_weights(w: &[f64]) -> Vec<f64> {
  normalize(w.iter().map(|&wi| wi.max(SIMPLEX_SEED_FLOOR)).collect())
}

/// Uniform `1/n` weights.
pub fn equal_weights(n: usize) -> Vec<f64> {
  if n == 0 {
    return Vec::new();
  }
  vec![1.0 / n as f64; n]
}

#[derive(Clone)]
struct NegativeSharpe {
  mu: Vec<f64>,
  cov: Vec<Vec<f64>>,
  risk_free: f64,
}

impl NegativeSharpe {
  fn sharpe(&self, w: &[f64]) -> f64 {
    let port_ret = dot(w, &self.mu);
    let port_var = dot(w, &mat_vec_mul(&self.cov, w));
    let vol = port_var.max(0.0).sqrt().max(VOL_FLOOR);
    (port_ret - self.risk_free) / vol
  }
}

impl CostFunction for NegativeSharpe {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
    Ok(-self.sharpe(&softmax(x)))
  }
}

/// Sequential maximum-Sharpe optimizer with explicit warm-start state.
#[derive(Clone, Debug, Default)]
pub struct MeanVarianceOptimizer {
  config: OptimizerConfig,
}

impl MeanVarianceOptimizer {
  pub fn new(config: OptimizerConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &OptimizerConfig {
    &self.config
  }

  /// Seed for an `n`-member solve: the carried weights when the size matches,
  /// uniform weights otherwise.
  pub fn initial_guess(n: usize, carry: Option<&WarmStart>) -> Vec<f64> {
    match carry {
      Some(prev) if prev.active_size == n && prev.weights.len() == n => prev.weights.clone(),
      _ => equal_weights(n),
    }
  }

  /// Solve one date. Never fails: on non-convergence the best iterate is kept
  /// and `converged` is false.
  pub fn solve_date(
    &self,
    matrix: &ReturnMatrix,
    active: &ActiveSet,
    carry: Option<&WarmStart>,
  ) -> DateSolution {
    let n = active.len();
    let guess = Self::initial_guess(n, carry);
    let moments = historical_moments(matrix, &active.members, active.row, self.config.trading_days);
    let cost = NegativeSharpe {
      mu: moments.mu,
      cov: moments.cov,
      risk_free: self.config.risk_free,
    };

    let (weights, converged, iterations) = if n == 1 {
      (vec![1.0], true, 0)
    } else if moments.min_obs < 2 {
      debug!(date = %active.date, "risk not estimable yet, holding seed weights");
      (guess.clone(), true, 0)
    } else {
      self.minimize(cost.clone(), &guess)
    };

    let sharpe = cost.sharpe(&weights);
    let realized_return = round_to(dot(&active.returns, &weights), self.config.rounding_decimals);

    if !converged {
      warn!(
        date = %active.date,
        iterations,
        "optimizer did not converge, using best iterate"
      );
    }
    debug!(date = %active.date, n, iterations, sharpe, realized_return, "solved");

    DateSolution {
      date: active.date,
      members: active.members.clone(),
      initial_guess: guess,
      weights,
      sharpe,
      converged,
      iterations,
      realized_return,
    }
  }

  /// Nelder-Mead restarted from its own best point until a restart no longer
  /// improves the Sharpe ratio. Every restart builds a fresh simplex around the
  /// floored weights, so near-zero seed weights can still grow.
  fn minimize(&self, cost: NegativeSharpe, guess: &[f64]) -> (Vec<f64>, bool, u64) {
    let mut best_w = guess.to_vec();
    let mut best_sharpe = cost.sharpe(&best_w);
    let mut start = floor_weights(guess);
    let mut iterations = 0;
    let mut converged = false;

    for _ in 0..MAX_RESTARTS {
      let budget = self.config.max_iters.saturating_sub(iterations);
      if budget == 0 {
        break;
      }

      let Some((w, run_converged, run_iters)) = self.nelder_mead(cost.clone(), &start, budget) else {
        break;
      };
      iterations += run_iters;

      let sharpe = cost.sharpe(&w);
      let improved = sharpe - best_sharpe > RESTART_TOLERANCE * (1.0 + best_sharpe.abs());
      if sharpe > best_sharpe {
        best_sharpe = sharpe;
        best_w = w;
      }

      converged = run_converged;
      if !run_converged || !improved {
        break;
      }
      start = floor_weights(&best_w);
    }

    (best_w, converged, iterations)
  }

  /// One Nelder-Mead pass in logit space with a unit simplex around `seed`.
  fn nelder_mead(&self, cost: NegativeSharpe, seed: &[f64], max_iters: u64) -> Option<(Vec<f64>, bool, u64)> {
    let n = seed.len();
    let x0 = logits(seed);
    let mut simplex = Vec::with_capacity(n + 1);
    simplex.push(x0.clone());
    for i in 0..n {
      let mut point = x0.clone();
      point[i] += 1.0;
      simplex.push(point);
    }

    let solver = match NelderMead::new(simplex).with_sd_tolerance(self.config.sd_tolerance) {
      Ok(solver) => solver,
      Err(e) => {
        warn!("could not build simplex: {e}");
        return None;
      }
    };

    match Executor::new(cost, solver)
      .configure(|state| state.max_iters(max_iters))
      .run()
    {
      Ok(res) => {
        let converged = matches!(
          res.state.get_termination_reason(),
          Some(TerminationReason::SolverConverged)
        );
        let iterations = res.state.get_iter();
        let best_x = res.state.best_param.unwrap_or(x0);
        Some((normalize(softmax(&best_x)), converged, iterations))
      }
      Err(e) => {
        warn!("solver failed: {e}");
        None
      }
    }
  }

  /// Run the whole date range, carrying the warm start from date to date.
  pub fn run(&self, matrix: &ReturnMatrix) -> Result<OptimizedPortfolio> {
    let sets = active_sets(matrix)?;
    let mut solutions = Vec::with_capacity(sets.len());
    let mut carry: Option<WarmStart> = None;

    for active in &sets {
      let solution = self.solve_date(matrix, active, carry.as_ref());
      carry = Some(solution.warm_start());
      solutions.push(solution);
    }

    let returns = ReturnSeries::new(
      solutions.iter().map(|s| s.date).collect(),
      solutions.iter().map(|s| s.realized_return).collect(),
    )?;
    let portfolio = OptimizedPortfolio { returns, solutions };

    info!(
      dates = portfolio.solutions.len(),
      non_converged = portfolio.non_converged().len(),
      "optimized portfolio built"
    );
    Ok(portfolio)
  }
}

/// Clamp into `[0, 1]` and rescale to sum to one.
fn normalize(mut w: Vec<f64>) -> Vec<f64> {
  for wi in w.iter_mut() {
    *wi = wi.clamp(0.0, 1.0);
  }
  let sum: f64 = w.iter().sum();
  if sum > 1e-15 {
    w.iter_mut().for_each(|wi| *wi /= sum);
    w
  } else {
    equal_weights(w.len())
  }
}
