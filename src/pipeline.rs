//! # Pipeline
//!
//! $$
//! \text{prices}\to r_{i,t}\to A_t\to \mathbf w_t^\*\to R_t\to\text{analytics}
//! $$
//!
//! End-to-end orchestration: fetch, build returns, optimize, analyze.

use chrono::NaiveDate;
use tracing::info;

use crate::analytics::AnalyticsConfig;
use crate::analytics::AnalyticsEngine;
use crate::analytics::BenchmarkAnalytics;
use crate::analytics::PortfolioAnalytics;
use crate::error::PortfolioError;
use crate::error::Result;
use crate::instrument::InstrumentRegistry;
use crate::market_data::MarketDataProvider;
use crate::market_data::PriceTable;
use crate::market_data::fetch_benchmark;
use crate::market_data::fetch_universe;
use crate::portfolio::DateSolution;
use crate::portfolio::MeanVarianceOptimizer;
use crate::portfolio::OptimizerConfig;
use crate::portfolio::ReturnSeries;
use crate::portfolio::build_return_matrix;
use crate::portfolio::build_return_matrix_lenient;
use crate::portfolio::naive_portfolio;

/// Runtime configuration for [`Pipeline`].
#[derive(Clone, Debug)]
pub struct PipelineConfig {
  pub optimizer: OptimizerConfig,
  pub analytics: AnalyticsConfig,
  /// Benchmark symbol fetched through the same provider.
  pub benchmark: String,
  /// First benchmark date; `None` starts at the earliest instrument inception.
  pub benchmark_start: Option<NaiveDate>,
  /// Drop instruments with unusable price history instead of failing the run.
  pub drop_invalid: bool,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      optimizer: OptimizerConfig::default(),
      analytics: AnalyticsConfig::default(),
      benchmark: "^GSPC".to_string(),
      benchmark_start: None,
      drop_invalid: true,
    }
  }
}

/// Everything one run produces. Built once, never mutated.
#[derive(Clone, Debug)]
pub struct PortfolioReport {
  pub naive: PortfolioAnalytics,
  pub optimized: PortfolioAnalytics,
  pub benchmark: BenchmarkAnalytics,
  /// Instruments kept in the return matrix; `DateSolution::members` index into this.
  pub symbols: Vec<String>,
  pub solutions: Vec<DateSolution>,
  pub non_converged: Vec<NaiveDate>,
}

#[derive(Clone, Debug)]
pub struct Pipeline {
  config: PipelineConfig,
  optimizer: MeanVarianceOptimizer,
  analytics: AnalyticsEngine,
}

impl Pipeline {
  pub fn new(config: PipelineConfig) -> Result<Self> {
    let analytics = AnalyticsEngine::new(config.analytics.clone())?;
    let optimizer = MeanVarianceOptimizer::new(config.optimizer.clone());
    Ok(Self {
      config,
      optimizer,
      analytics,
    })
  }

  pub fn config(&self) -> &PipelineConfig {
    &self.config
  }

  /// Fetch the universe and the benchmark concurrently, then run.
  pub fn run(&self, registry: &InstrumentRegistry, provider: &dyn MarketDataProvider) -> Result<PortfolioReport> {
    let start = self
      .config
      .benchmark_start
      .or_else(|| registry.earliest_inception())
      .ok_or_else(|| PortfolioError::Config("no instruments registered".into()))?;

    let (prices, benchmark) = rayon::join(
      || fetch_universe(provider, registry),
      || fetch_benchmark(provider, &self.config.benchmark, start),
    );
    let (prices, benchmark) = (prices?, benchmark?);
    info!(
      dates = prices.n_dates(),
      instruments = prices.n_instruments(),
      benchmark_dates = benchmark.len(),
      "market data ready"
    );

    self.run_with_prices(registry, &prices, &benchmark)
  }

  /// Run on prices and benchmark returns the caller already holds.
  pub fn run_with_prices(
    &self,
    registry: &InstrumentRegistry,
    prices: &PriceTable,
    benchmark: &ReturnSeries,
  ) -> Result<PortfolioReport> {
    let matrix = if self.config.drop_invalid {
      build_return_matrix_lenient(prices, registry)?
    } else {
      build_return_matrix(prices, registry)?
    };
    info!(
      dates = matrix.n_dates(),
      instruments = matrix.n_instruments(),
      "return matrix built"
    );

    let (optimized, naive) = rayon::join(
      || self.optimizer.run(&matrix),
      || naive_portfolio(&matrix, self.config.optimizer.rounding_decimals),
    );
    let (optimized, naive) = (optimized?, naive?);

    let ((naive_analytics, optimized_analytics), benchmark_analytics) = rayon::join(
      || {
        rayon::join(
          || self.analytics.analyze(&naive, benchmark),
          || self.analytics.analyze(&optimized.returns, benchmark),
        )
      },
      || self.analytics.analyze_benchmark(benchmark),
    );
    info!("analytics complete");

    let non_converged = optimized.non_converged();
    Ok(PortfolioReport {
      naive: naive_analytics,
      optimized: optimized_analytics,
      benchmark: benchmark_analytics,
      symbols: matrix.symbols,
      solutions: optimized.solutions,
      non_converged,
    })
  }
}
