pub mod calculator;
pub mod config;
pub mod frame;
pub mod oscillators;
pub mod overlaps;
pub mod params;
pub mod registry;
pub mod resample;
mod series;
pub mod statistics;
pub mod volatility;

use thiserror::Error;

/// Failure inside a single indicator function. These are recoverable at the
/// pipeline level: the declared output columns are added as nulls and the
/// remaining configured indicators still run.
#[derive(Debug, Error)]
pub enum IndicatorError {
    #[error("unknown source column \"{0}\"")]
    UnknownSource(String),
    #[error("column \"{0}\" is not numeric")]
    NonNumericSource(String),
    #[error("missing parameter \"{0}\"")]
    MissingParameter(String),
    #[error("invalid parameter \"{name}\": {reason}")]
    InvalidParameter { name: String, reason: String },
    #[error("frame has no rows")]
    EmptyFrame,
}
