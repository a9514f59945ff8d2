//! # Risk & Performance Analytics
//!
//! $$
//! \mathrm{VaR}_c = Q_{1-c}(r),\qquad \mathrm{CVaR}_c=\mathbb E[r\mid r\le \mathrm{VaR}_c]
//! $$
//!
//! Stateless metrics over a dated return series, optionally relative to a
//! benchmark. All rolling metrics share one window, annualization factor and
//! confidence level fixed at construction.

pub mod ratios;
pub mod regression;
pub mod risk;
pub mod rolling;
pub mod types;

use tracing::warn;

pub use regression::RegressionSummary;
pub use types::AnalyticsConfig;
pub use types::MetricSeries;
pub use types::MetricValue;
pub use types::UndefinedReason;

use crate::error::Result;
use crate::portfolio::ReturnSeries;

/// Every metric of one portfolio, computed in one pass.
#[derive(Clone, Debug)]
pub struct PortfolioAnalytics {
  pub returns: ReturnSeries,
  pub cumulative_returns: MetricSeries,
  pub drawdown: MetricSeries,
  pub max_drawdown: MetricValue,
  pub rolling_volatility: MetricSeries,
  pub rolling_sharpe: MetricSeries,
  pub sharpe: MetricValue,
  pub sortino: MetricValue,
  pub rolling_beta: MetricSeries,
  pub information_ratio: MetricSeries,
  pub var: MetricValue,
  pub cvar: MetricValue,
  /// `None` when the regression could not be fitted; the reason is logged.
  pub regression: Option<RegressionSummary>,
}

/// Standalone metrics of the benchmark, for side-by-side display.
#[derive(Clone, Debug)]
pub struct BenchmarkAnalytics {
  pub returns: ReturnSeries,
  pub cumulative_returns: MetricSeries,
  pub drawdown: MetricSeries,
  pub rolling_volatility: MetricSeries,
  pub rolling_beta: MetricSeries,
  pub sharpe: MetricValue,
  pub var: MetricValue,
  pub cvar: MetricValue,
}

#[derive(Clone, Debug)]
pub struct AnalyticsEngine {
  config: AnalyticsConfig,
}

impl AnalyticsEngine {
  pub fn new(config: AnalyticsConfig) -> Result<Self> {
    config.validate()?;
    Ok(Self { config })
  }

  pub fn config(&self) -> &AnalyticsConfig {
    &self.config
  }

  fn series(&self, returns: &ReturnSeries, values: Vec<MetricValue>) -> MetricSeries {
    MetricSeries::new(returns.dates.clone(), values)
  }

  pub fn cumulative_returns(&self, returns: &ReturnSeries) -> MetricSeries {
    let values = risk::cumulative_returns(&returns.values)
      .into_iter()
      .map(MetricValue::Defined)
      .collect();
    self.series(returns, values)
  }

  pub fn drawdown(&self, returns: &ReturnSeries) -> MetricSeries {
    self.series(returns, risk::drawdown(&returns.values))
  }

  pub fn max_drawdown(&self, returns: &ReturnSeries) -> MetricValue {
    risk::max_drawdown(&returns.values)
  }

  /// Rolling standard deviation, annualized.
  pub fn rolling_volatility(&self, returns: &ReturnSeries) -> MetricSeries {
    let annualizer = self.config.annualizer();
    let values = rolling::rolling_std(&returns.values, self.config.window)
      .into_iter()
      .map(|v| v.map(|s| s * annualizer))
      .collect();
    self.series(returns, values)
  }

  pub fn rolling_sharpe(&self, returns: &ReturnSeries) -> MetricSeries {
    let values = ratios::rolling_sharpe(
      &returns.values,
      self.config.window,
      self.config.daily_risk_free(),
      self.config.trading_days,
    );
    self.series(returns, values)
  }

  pub fn sharpe(&self, returns: &ReturnSeries) -> MetricValue {
    ratios::sharpe_ratio(&returns.values, self.config.trading_days)
  }

  pub fn sortino(&self, returns: &ReturnSeries) -> MetricValue {
    ratios::sortino_ratio(&returns.values, self.config.trading_days)
  }

  /// Rolling beta on the portfolio's date index; windows touching a date the
  /// benchmark lacks are undefined.
  pub fn rolling_beta(&self, returns: &ReturnSeries, benchmark: &ReturnSeries) -> MetricSeries {
    let aligned = benchmark.reindex(&returns.dates);
    self.series(
      returns,
      rolling::rolling_beta(&returns.values, &aligned, self.config.window),
    )
  }

  pub fn information_ratio(&self, returns: &ReturnSeries, benchmark: &ReturnSeries) -> MetricSeries {
    let aligned = benchmark.reindex(&returns.dates);
    self.series(
      returns,
      ratios::information_ratio(
        &returns.values,
        &aligned,
        self.config.window,
        self.config.trading_days,
      ),
    )
  }

  pub fn value_at_risk(&self, returns: &ReturnSeries) -> MetricValue {
    risk::value_at_risk(
      &returns.values,
      self.config.confidence,
      self.config.min_var_observations,
    )
  }

  /// Tail mean against the VaR of the same series.
  pub fn conditional_value_at_risk(&self, returns: &ReturnSeries) -> MetricValue {
    risk::conditional_value_at_risk(
      &returns.values,
      self.config.confidence,
      self.config.min_var_observations,
    )
  }

  /// OLS alpha/beta over the dates both series share.
  pub fn alpha_beta(&self, returns: &ReturnSeries, benchmark: &ReturnSeries) -> Result<RegressionSummary> {
    let (_, y, x) = returns.intersect(benchmark);
    regression::alpha_beta(&y, &x, self.config.trading_days)
  }

  /// All portfolio metrics. Independent groups run on the rayon pool.
  pub fn analyze(&self, returns: &ReturnSeries, benchmark: &ReturnSeries) -> PortfolioAnalytics {
    let (((cumulative_returns, drawdown), (max_drawdown, rolling_volatility)), ((rolling_sharpe, rolling_beta), information_ratio)) =
      rayon::join(
        || {
          rayon::join(
            || (self.cumulative_returns(returns), self.drawdown(returns)),
            || (self.max_drawdown(returns), self.rolling_volatility(returns)),
          )
        },
        || {
          rayon::join(
            || (self.rolling_sharpe(returns), self.rolling_beta(returns, benchmark)),
            || self.information_ratio(returns, benchmark),
          )
        },
      );

    let regression = match self.alpha_beta(returns, benchmark) {
      Ok(summary) => Some(summary),
      Err(e) => {
        warn!("alpha/beta regression skipped: {e}");
        None
      }
    };

    PortfolioAnalytics {
      returns: returns.clone(),
      cumulative_returns,
      drawdown,
      max_drawdown,
      rolling_volatility,
      rolling_sharpe,
      sharpe: self.sharpe(returns),
      sortino: self.sortino(returns),
      rolling_beta,
      information_ratio,
      var: self.value_at_risk(returns),
      cvar: self.conditional_value_at_risk(returns),
      regression,
    }
  }

  pub fn analyze_benchmark(&self, benchmark: &ReturnSeries) -> BenchmarkAnalytics {
    let ((cumulative_returns, drawdown), (rolling_volatility, rolling_beta)) = rayon::join(
      || (self.cumulative_returns(benchmark), self.drawdown(benchmark)),
      || {
        (
          self.rolling_volatility(benchmark),
          self.rolling_beta(benchmark, benchmark),
        )
      },
    );

    BenchmarkAnalytics {
      returns: benchmark.clone(),
      cumulative_returns,
      drawdown,
      rolling_volatility,
      rolling_beta,
      sharpe: self.sharpe(benchmark),
      var: self.value_at_risk(benchmark),
      cvar: self.conditional_value_at_risk(benchmark),
    }
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;
  use chrono::Duration;
  use chrono::NaiveDate;

  use super::*;

  fn series(values: &[f64]) -> ReturnSeries {
    let start = NaiveDate::from_ymd_opt(2021, 1, 4).unwrap();
    let dates = (0..values.len())
      .map(|i| start + Duration::days(i as i64))
      .collect();
    ReturnSeries::new(dates, values.to_vec()).unwrap()
  }

  fn wavy(n: usize, phase: usize, scale: f64) -> Vec<f64> {
    (0..n)
      .map(|i| (((i + phase) * 7 % 13) as f64 - 6.0) * scale)
      .collect()
  }

  fn engine() -> AnalyticsEngine {
    AnalyticsEngine::new(AnalyticsConfig::default()).unwrap()
  }

  #[test]
  fn rolling_metrics_have_window_minus_one_leading_gaps() {
    let engine = engine();
    let portfolio = series(&wavy(60, 0, 0.002));
    let benchmark = series(&wavy(60, 3, 0.0015));
    let analytics = engine.analyze(&portfolio, &benchmark);

    for s in [
      &analytics.rolling_volatility,
      &analytics.rolling_sharpe,
      &analytics.rolling_beta,
      &analytics.information_ratio,
    ] {
      assert_eq!(s.len(), 60);
      assert_eq!(s.leading_undefined(), 13);
      assert!(s.values[13..].iter().all(|v| v.is_defined()));
      assert!(s.values[..13]
        .iter()
        .all(|v| *v == MetricValue::INSUFFICIENT));
    }
    assert!(analytics.drawdown.values.iter().all(|v| v.value().unwrap() <= 0.0));
    assert!(analytics.regression.is_some());
  }

  #[test]
  fn all_zero_returns() {
    let engine = engine();
    let zeros = series(&[0.0; 20]);

    assert_eq!(engine.sharpe(&zeros), MetricValue::DIV_ZERO);
    assert_eq!(engine.sortino(&zeros), MetricValue::EMPTY);
    assert_eq!(engine.value_at_risk(&zeros), MetricValue::Defined(0.0));
    assert_eq!(engine.conditional_value_at_risk(&zeros), MetricValue::Defined(0.0));
    assert!(engine
      .rolling_sharpe(&zeros)
      .values
      .iter()
      .skip(13)
      .all(|v| *v == MetricValue::DIV_ZERO));
  }

  #[test]
  fn benchmark_gaps_propagate_to_relative_metrics() {
    let engine = AnalyticsEngine::new(AnalyticsConfig {
      window: 3,
      ..AnalyticsConfig::default()
    })
    .unwrap();
    let portfolio = series(&wavy(10, 0, 0.001));
    let mut bench = series(&wavy(10, 5, 0.001));
    bench.dates.remove(5);
    bench.values.remove(5);

    let beta = engine.rolling_beta(&portfolio, &bench);
    assert!(beta.values[5..8]
      .iter()
      .all(|v| *v == MetricValue::INSUFFICIENT));
    assert!(beta.values[8].is_defined());

    let summary = engine.alpha_beta(&portfolio, &bench).unwrap();
    assert_eq!(summary.nobs, 9);
  }

  #[test]
  fn benchmark_beta_against_itself_is_one() {
    let engine = engine();
    let bench = series(&wavy(30, 1, 0.01));
    let analytics = engine.analyze_benchmark(&bench);
    for v in analytics.rolling_beta.defined() {
      assert_relative_eq!(v.1, 1.0, epsilon = 1e-9);
    }
    assert_eq!(analytics.rolling_volatility.leading_undefined(), 13);
  }

  #[test]
  fn rolling_volatility_is_annualized() {
    let engine = AnalyticsEngine::new(AnalyticsConfig {
      window: 2,
      ..AnalyticsConfig::default()
    })
    .unwrap();
    let vol = engine.rolling_volatility(&series(&[0.01, 0.03]));
    let expected = 2.0f64.sqrt() * 0.01 * 252.0f64.sqrt();
    assert_relative_eq!(vol.values[1].value().unwrap(), expected, epsilon = 1e-12);
  }
}
