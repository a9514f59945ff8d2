//! # Portfolio
//!
//! $$
//! \sigma_p^2 = \mathbf{w}^\top \Sigma \mathbf{w}
//! $$
//!
//! Return construction, active-set resolution and the two portfolio builders.

pub mod active_set;
pub mod moments;
pub mod naive;
pub mod optimizer;
pub mod returns;
pub mod types;

pub use active_set::ActiveSet;
pub use active_set::active_sets;
pub use active_set::resolve_active_set;
pub use moments::HistoricalMoments;
pub use moments::correlation_matrix;
pub use moments::covariance_matrix;
pub use moments::historical_moments;
pub use naive::naive_portfolio;
pub use optimizer::MeanVarianceOptimizer;
pub use optimizer::equal_weights;
pub use returns::ReturnMatrix;
pub use returns::build_return_matrix;
pub use returns::build_return_matrix_lenient;
pub use types::DateSolution;
pub use types::OptimizedPortfolio;
pub use types::OptimizerConfig;
pub use types::ReturnSeries;
pub use types::WarmStart;
pub use types::round_to;
