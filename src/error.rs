//! # Errors
//!
//! Error taxonomy shared by the data, optimizer and analytics layers.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PortfolioError>;

#[derive(Debug, Error)]
pub enum PortfolioError {
  /// Malformed or too-short price history for one instrument.
  #[error("data error for {symbol}: {reason}")]
  Data { symbol: String, reason: String },

  /// No active instruments on a date, or too few samples for a statistic.
  #[error("insufficient data: {0}")]
  InsufficientData(String),

  /// Market-data retrieval failed, was cancelled, or returned nothing.
  #[error("market data unavailable for {symbol}: {reason}")]
  DataUnavailable { symbol: String, reason: String },

  /// A ratio whose denominator is zero.
  #[error("division by zero in {0}")]
  DivisionByZero(&'static str),

  /// Invalid instrument or pipeline configuration.
  #[error("configuration error: {0}")]
  Config(String),

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Csv(#[from] csv::Error),

  #[error(transparent)]
  Json(#[from] serde_json::Error),
}

impl PortfolioError {
  pub(crate) fn data(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
    Self::Data {
      symbol: symbol.into(),
      reason: reason.into(),
    }
  }

  pub(crate) fn unavailable(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
    Self::DataUnavailable {
      symbol: symbol.into(),
      reason: reason.into(),
    }
  }
}
