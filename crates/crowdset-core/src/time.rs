//! Identification timestamp parsing.

use chrono::NaiveDateTime;

use crate::{Error, Result};

/// Accepted `created_at` layouts, tried in order. `%.f` also matches an
/// absent fractional part.
pub const TIMESTAMP_FORMATS: [&str; 2] =
  ["%Y-%m-%dT%H:%M:%S%.fZ", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an identification timestamp in either of the accepted layouts.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
  let trimmed = raw.trim();
  TIMESTAMP_FORMATS
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
    .ok_or_else(|| Error::UnrecognisedTimestamp(raw.to_owned()))
}
