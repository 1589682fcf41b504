//! Opaque entity identifiers.
//!
//! Archive exports are inconsistent about id encoding: the same column can
//! arrive as a JSON string in one dump and a JSON number in the next. Every
//! id newtype accepts both and normalises to the decimal string form, so
//! `"41053"` and `41053` name the same entity.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, de};

// ─── Visitor ─────────────────────────────────────────────────────────────────

struct IdVisitor;

impl de::Visitor<'_> for IdVisitor {
  type Value = String;

  fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str("a string or integer id")
  }

  fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
    Ok(v.to_owned())
  }

  fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
    Ok(v)
  }

  fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
    Ok(v.to_string())
  }

  fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
    Ok(v.to_string())
  }

  fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
    // Integral floats show up when a numeric column went through a float
    // conversion upstream (`41053.0`).
    if v.is_finite() && v.fract() == 0.0 {
      Ok(format!("{v:.0}"))
    } else {
      Err(E::invalid_value(de::Unexpected::Float(v), &self))
    }
  }
}

// ─── Newtypes ────────────────────────────────────────────────────────────────

macro_rules! opaque_id {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
    #[serde(transparent)]
    pub struct $name(String);

    impl $name {
      pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

      pub fn as_str(&self) -> &str { &self.0 }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
      }
    }

    impl From<&str> for $name {
      fn from(id: &str) -> Self { Self(id.to_owned()) }
    }

    impl From<String> for $name {
      fn from(id: String) -> Self { Self(id) }
    }

    impl<'de> Deserialize<'de> for $name {
      fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        d.deserialize_any(IdVisitor).map(Self)
      }
    }
  };
}

opaque_id!(
  /// Identifies an [`Observation`](crate::record::Observation).
  ObservationId
);
opaque_id!(
  /// Identifies an [`Identification`](crate::record::Identification).
  IdentificationId
);
opaque_id!(
  /// Identifies a [`Taxon`](crate::record::Taxon).
  TaxonId
);
opaque_id!(
  /// Identifies a user; doubles as the worker id in the output dataset.
  UserId
);
