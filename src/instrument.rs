//! # Instruments
//!
//! Instrument identity, inception date and direction, plus the ordered registry
//! the rest of the pipeline indexes into.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;

use crate::error::PortfolioError;
use crate::error::Result;

/// A tradable instrument with a fixed inception date and direction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instrument {
  /// Ticker symbol, stored upper-case.
  pub symbol: String,
  /// First date the instrument belongs to the portfolio.
  pub inception: NaiveDate,
  /// Short positions have their returns sign-flipped.
  pub is_short: bool,
}

impl Instrument {
  pub fn new(symbol: impl AsRef<str>, inception: NaiveDate, is_short: bool) -> Self {
    Self {
      symbol: symbol.as_ref().to_uppercase(),
      inception,
      is_short,
    }
  }

  pub fn long(symbol: impl AsRef<str>, inception: NaiveDate) -> Self {
    Self::new(symbol, inception, false)
  }

  pub fn short(symbol: impl AsRef<str>, inception: NaiveDate) -> Self {
    Self::new(symbol, inception, true)
  }

  /// Sign applied to the instrument's return column.
  pub fn direction(&self) -> f64 {
    if self.is_short { -1.0 } else { 1.0 }
  }
}

/// Either `["2021-02-01", false]` or `{"inception": "2021-02-01", "short": false}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum InstrumentEntry {
  Pair(String, bool),
  Object {
    inception: String,
    #[serde(default)]
    short: bool,
  },
}

/// Ordered, duplicate-free set of instruments.
///
/// Column order of every downstream matrix follows registration order.
#[derive(Clone, Debug, Default)]
pub struct InstrumentRegistry {
  instruments: Vec<Instrument>,
}

impl InstrumentRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add an instrument. Symbols are unique.
  pub fn register(&mut self, instrument: Instrument) -> Result<()> {
    if self.get(&instrument.symbol).is_some() {
      return Err(PortfolioError::Config(format!(
        "instrument {} registered twice",
        instrument.symbol
      )));
    }
    self.instruments.push(instrument);
    Ok(())
  }

  /// Parse a `symbol -> (inception, is_short)` mapping, keeping document order.
  pub fn from_json(json: &str) -> Result<Self> {
    let map: Map<String, Value> = serde_json::from_str(json)?;
    let mut registry = Self::new();

    for (symbol, value) in map {
      let entry: InstrumentEntry = serde_json::from_value(value).map_err(|e| {
        PortfolioError::Config(format!("invalid entry for {symbol}: {e}"))
      })?;
      let (inception, is_short) = match entry {
        InstrumentEntry::Pair(date, short) => (date, short),
        InstrumentEntry::Object { inception, short } => (inception, short),
      };
      let inception = NaiveDate::parse_from_str(&inception, "%Y-%m-%d").map_err(|e| {
        PortfolioError::Config(format!("invalid inception date for {symbol}: {e}"))
      })?;
      registry.register(Instrument::new(&symbol, inception, is_short))?;
    }

    Ok(registry)
  }

  /// [`from_json`](Self::from_json) on the contents of a file.
  pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
    let json = fs::read_to_string(path)?;
    Self::from_json(&json)
  }

  pub fn get(&self, symbol: &str) -> Option<&Instrument> {
    self
      .instruments
      .iter()
      .find(|i| i.symbol.eq_ignore_ascii_case(symbol))
  }

  pub fn iter(&self) -> impl Iterator<Item = &Instrument> {
    self.instruments.iter()
  }

  pub fn len(&self) -> usize {
    self.instruments.len()
  }

  pub fn is_empty(&self) -> bool {
    self.instruments.is_empty()
  }

  pub fn symbols(&self) -> Vec<String> {
    self.instruments.iter().map(|i| i.symbol.clone()).collect()
  }

  /// Earliest inception across the registry.
  pub fn earliest_inception(&self) -> Option<NaiveDate> {
    self.instruments.iter().map(|i| i.inception).min()
  }
}
