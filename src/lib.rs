//! # rolling-portfolio
//!
//! $$
//! \mathbf w_t^\*=\arg\max_{\mathbf w\in\Delta}\frac{\mathbf w^\top\mu_t-r_f}{\sqrt{\mathbf w^\top\Sigma_t\mathbf w}}
//! $$
//!
//! Daily-rebalanced maximum-Sharpe portfolio construction over instruments
//! with staggered inception dates, an equal-weight baseline, and the risk and
//! performance analytics to compare both against a benchmark.

pub mod analytics;
pub mod error;
pub mod instrument;
pub mod market_data;
pub mod pipeline;
pub mod portfolio;

pub use analytics::AnalyticsConfig;
pub use analytics::AnalyticsEngine;
pub use analytics::MetricSeries;
pub use analytics::MetricValue;
pub use error::PortfolioError;
pub use error::Result;
pub use instrument::Instrument;
pub use instrument::InstrumentRegistry;
pub use market_data::CsvDirectoryProvider;
pub use market_data::InMemoryProvider;
pub use market_data::MarketDataProvider;
pub use pipeline::Pipeline;
pub use pipeline::PipelineConfig;
pub use pipeline::PortfolioReport;
pub use portfolio::MeanVarianceOptimizer;
pub use portfolio::OptimizerConfig;
pub use portfolio::ReturnSeries;
