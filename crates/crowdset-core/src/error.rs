//! Error types for `crowdset-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("timestamp {0:?} matches no accepted format")]
  UnrecognisedTimestamp(String),

  #[error("rank level {0:?} is not numeric")]
  NonNumericRankLevel(String),

  #[error("rank level is missing")]
  MissingRankLevel,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
