//! Record types: the five collections a dataset is built from.
//!
//! Observations, photos, identifications and users are loaded as-is. Taxa
//! arrive as [`RawTaxon`] and are parsed once into [`Taxon`] when a store is
//! built, so ancestry strings are never re-split during filtering.

use serde::{Deserialize, Serialize};

use crate::{
  Error, IdentificationId, ObservationId, Result, TaxonId, UserId, coerce,
};

// ─── Observation ─────────────────────────────────────────────────────────────

/// A single sighting submitted by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
  pub id:                 ObservationId,
  #[serde(default)]
  pub user_id:            Option<UserId>,
  /// The consensus taxon agreed on by the community, if any.
  #[serde(default)]
  pub community_taxon_id: Option<TaxonId>,
  #[serde(default, deserialize_with = "coerce::lenient_text")]
  pub created_at:         Option<String>,
  #[serde(default, deserialize_with = "coerce::lenient_f64")]
  pub latitude:           Option<f64>,
  #[serde(default, deserialize_with = "coerce::lenient_f64")]
  pub longitude:          Option<f64>,
}

impl Observation {
  /// An observation known only by id, as synthesised for archives that ship
  /// identifications without an observation table.
  pub fn bare(id: ObservationId) -> Self {
    Self {
      id,
      user_id: None,
      community_taxon_id: None,
      created_at: None,
      latitude: None,
      longitude: None,
    }
  }
}

// ─── ObservationPhoto ────────────────────────────────────────────────────────

/// A photo attached to an observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationPhoto {
  pub observation_id: ObservationId,
  /// Original-resolution URL; medium-resolution exports are accepted too.
  #[serde(
    default,
    rename = "native_original_image_url",
    alias = "medium_url",
    deserialize_with = "coerce::lenient_text"
  )]
  pub url:            Option<String>,
}

// ─── Identification ──────────────────────────────────────────────────────────

/// One user's proposed taxon for one observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identification {
  pub id:             IdentificationId,
  pub observation_id: ObservationId,
  pub user_id:        UserId,
  /// Rewritten in place when the taxonomy is collapsed to a coarser rank.
  pub taxon_id:       TaxonId,
  /// Kept verbatim; parsed only when identifications need ordering. A null
  /// timestamp reads as empty and fails that parse.
  #[serde(default, deserialize_with = "coerce::text_or_empty")]
  pub created_at:     String,
  /// Whether this is the user's latest opinion on the observation.
  #[serde(default, deserialize_with = "coerce::flag")]
  pub current:        bool,
}

// ─── User ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
  pub id: UserId,
}

// ─── Taxonomy ────────────────────────────────────────────────────────────────

/// Ancestor ids of a taxon ordered from the root to the immediate parent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ancestry(Vec<TaxonId>);

impl Ancestry {
  /// Parse a `/`-delimited ancestry path. An empty string is the root's
  /// (empty) path.
  pub fn parse(raw: &str) -> Self {
    Self(
      raw
        .split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(TaxonId::from)
        .collect(),
    )
  }

  /// Ancestors starting at the immediate parent and ending at the root.
  pub fn nearest_first(&self) -> impl Iterator<Item = &TaxonId> {
    self.0.iter().rev()
  }
}

/// Where a taxon sits in a pre-flattened taxonomy export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonPlacement {
  /// The node key used as the class label.
  pub key:    String,
  /// Key of the parent node; `None` at the root.
  pub parent: Option<String>,
  pub prob:   Option<f64>,
  pub leaf:   bool,
}

/// A taxon as it appears in the archive, before rank and ancestry parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTaxon {
  #[serde(alias = "taxon_id")]
  pub id:         TaxonId,
  /// `Some("")` for a root; `None` when the source has no ancestry.
  #[serde(default, deserialize_with = "coerce::verbatim_text")]
  pub ancestry:   Option<String>,
  #[serde(default, deserialize_with = "coerce::lenient_text")]
  pub rank_level: Option<String>,
  #[serde(default, deserialize_with = "coerce::flag")]
  pub is_active:  bool,
  #[serde(default)]
  pub placement:  Option<TaxonPlacement>,
}

/// A node of the taxonomy with its rank level and ancestry parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Taxon {
  pub id:         TaxonId,
  /// `None` when the source carries no ancestry for this taxon.
  pub ancestry:   Option<Ancestry>,
  /// Lower values are more specific (species < genus < family).
  pub rank_level: Option<f64>,
  pub is_active:  bool,
  pub placement:  Option<TaxonPlacement>,
}

impl Taxon {
  /// Parse a raw taxon. A present but non-numeric rank level is always an
  /// error; a missing one is an error only when `require_rank_level` is set.
  pub fn from_raw(raw: RawTaxon, require_rank_level: bool) -> Result<Self> {
    let rank_level = match raw.rank_level.as_deref() {
      Some(text) => Some(parse_rank_level(text)?),
      None if require_rank_level => return Err(Error::MissingRankLevel),
      None => None,
    };

    Ok(Self {
      id: raw.id,
      ancestry: raw.ancestry.as_deref().map(Ancestry::parse),
      rank_level,
      is_active: raw.is_active,
      placement: raw.placement,
    })
  }
}

/// Parse a numeric rank level such as `"10"` or `"33.5"`.
pub fn parse_rank_level(text: &str) -> Result<f64> {
  text
    .trim()
    .parse::<f64>()
    .ok()
    .filter(|level| level.is_finite())
    .ok_or_else(|| Error::NonNumericRankLevel(text.to_owned()))
}

// ─── RawRecords ──────────────────────────────────────────────────────────────

/// The five collections exactly as loaded, before any sanity pass.
#[derive(Debug, Clone, Default)]
pub struct RawRecords {
  pub observations:    Vec<Observation>,
  pub photos:          Vec<ObservationPhoto>,
  pub identifications: Vec<Identification>,
  pub taxa:            Vec<RawTaxon>,
  pub users:           Vec<User>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn raw(id: &str, ancestry: Option<&str>, rank: Option<&str>) -> RawTaxon {
    RawTaxon {
      id:         id.into(),
      ancestry:   ancestry.map(str::to_owned),
      rank_level: rank.map(str::to_owned),
      is_active:  true,
      placement:  None,
    }
  }

  #[test]
  fn ancestry_walks_nearest_first() {
    let a = Ancestry::parse("48460/1/2/355675");
    let ids: Vec<&str> = a.nearest_first().map(TaxonId::as_str).collect();
    assert_eq!(ids, ["355675", "2", "1", "48460"]);
  }

  #[test]
  fn empty_ancestry_is_root_path() {
    assert_eq!(Ancestry::parse(""), Ancestry::default());
    assert_eq!(Ancestry::parse("").nearest_first().count(), 0);
  }

  #[test]
  fn taxon_parses_rank_and_ancestry() {
    let t = Taxon::from_raw(raw("3", Some("1/2"), Some("10")), true).unwrap();
    assert_eq!(t.rank_level, Some(10.0));
    let ancestry = t.ancestry.unwrap();
    let ids: Vec<&str> = ancestry.nearest_first().map(TaxonId::as_str).collect();
    assert_eq!(ids, ["2", "1"]);
  }

  #[test]
  fn non_numeric_rank_is_rejected() {
    let err = Taxon::from_raw(raw("3", None, Some("species")), false);
    assert!(matches!(err, Err(Error::NonNumericRankLevel(_))));
  }

  #[test]
  fn missing_rank_depends_on_requirement() {
    assert!(matches!(
      Taxon::from_raw(raw("3", None, None), true),
      Err(Error::MissingRankLevel)
    ));
    let t = Taxon::from_raw(raw("3", None, None), false).unwrap();
    assert_eq!(t.rank_level, None);
    assert_eq!(t.ancestry, None);
  }

  #[test]
  fn identification_from_database_dump() {
    let json = r#"{
      "category": "improving",
      "created_at": "2011-12-04 05:08:30",
      "current": "t",
      "id": "53829",
      "observation_id": "41053",
      "taxon_change_id": null,
      "taxon_id": 47792,
      "user_id": "3891"
    }"#;
    let iden: Identification = serde_json::from_str(json).unwrap();
    assert!(iden.current);
    assert_eq!(iden.taxon_id.as_str(), "47792");
  }

  #[test]
  fn photo_accepts_medium_url() {
    let json = r#"{"medium_url": "http://x/medium.jpg", "observation_id": 7}"#;
    let photo: ObservationPhoto = serde_json::from_str(json).unwrap();
    assert_eq!(photo.url.as_deref(), Some("http://x/medium.jpg"));
    assert_eq!(photo.observation_id.as_str(), "7");
  }
}
