//! The flattened CSV archive: `identifications.csv` plus a pre-flattened
//! `taxonomy.csv`.
//!
//! The archive carries no observation, photo or user tables. One bare
//! observation and one URL-less photo are synthesised per distinct
//! `observation_id`, and users are the distinct `user_id`s, all in
//! first-seen order.

use std::path::Path;

use crowdset_core::{
  ObservationId, UserId,
  coerce::is_true_str,
  record::{
    Identification, Observation, ObservationPhoto, RawRecords, RawTaxon,
    TaxonPlacement, User,
  },
};
use indexmap::IndexSet;
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{info, warn};

use crate::{Error, Result};

pub(crate) const IDENTIFICATIONS: &str = "identifications.csv";
pub(crate) const TAXONOMY: &str = "taxonomy.csv";

// ─── Rows ────────────────────────────────────────────────────────────────────

/// A row of `identifications.csv`. Extra columns (`category`, `label`, ...)
/// are ignored.
#[derive(Debug, Deserialize)]
struct IdentificationRow {
  id:             String,
  observation_id: String,
  user_id:        String,
  taxon_id:       String,
  #[serde(default)]
  created_at:     String,
  #[serde(default)]
  current:        String,
}

impl IdentificationRow {
  fn into_identification(self) -> Identification {
    Identification {
      id:             normalize_id(&self.id).into(),
      observation_id: normalize_id(&self.observation_id).into(),
      user_id:        normalize_id(&self.user_id).into(),
      taxon_id:       normalize_id(&self.taxon_id).into(),
      created_at:     self.created_at,
      current:        is_true_str(self.current.trim()),
    }
  }
}

/// A row of `taxonomy.csv`.
#[derive(Debug, Deserialize)]
struct TaxonomyRow {
  #[serde(default)]
  parent:     String,
  key:        String,
  #[serde(default)]
  taxon_id:   String,
  #[serde(default)]
  prob:       String,
  #[serde(default)]
  leaf:       String,
  #[serde(default)]
  rank_level: String,
}

impl TaxonomyRow {
  fn into_taxon(self) -> Option<RawTaxon> {
    let key = self.key.trim();
    let taxon_id = self.taxon_id.trim();
    if key.is_empty() || taxon_id.is_empty() {
      warn!(key, taxon_id, "skipping taxonomy row without key or taxon id");
      return None;
    }

    let prob = match non_empty(&self.prob) {
      None => None,
      Some(text) => match text.parse::<f64>() {
        Ok(prob) => Some(prob),
        Err(_) => {
          warn!(key, prob = text, "ignoring non-numeric node probability");
          None
        }
      },
    };

    Some(RawTaxon {
      id:         normalize_id(taxon_id).into(),
      ancestry:   None,
      rank_level: non_empty(&self.rank_level).map(str::to_owned),
      is_active:  true,
      placement:  Some(TaxonPlacement {
        key: key.to_owned(),
        parent: non_empty(&self.parent).map(str::to_owned),
        prob,
        leaf: is_leaf(&self.leaf),
      }),
    })
  }
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Load a flattened CSV archive from `dir`.
pub fn load_csv_archive(dir: &Path) -> Result<RawRecords> {
  let identifications: Vec<Identification> =
    read_csv::<IdentificationRow>(&dir.join(IDENTIFICATIONS))?
      .into_iter()
      .map(IdentificationRow::into_identification)
      .collect();
  let taxa: Vec<RawTaxon> = read_csv::<TaxonomyRow>(&dir.join(TAXONOMY))?
    .into_iter()
    .filter_map(TaxonomyRow::into_taxon)
    .collect();

  let observation_ids: IndexSet<&ObservationId> =
    identifications.iter().map(|i| &i.observation_id).collect();
  let user_ids: IndexSet<&UserId> =
    identifications.iter().map(|i| &i.user_id).collect();

  let observations: Vec<Observation> = observation_ids
    .iter()
    .map(|&id| Observation::bare(id.clone()))
    .collect();
  let photos: Vec<ObservationPhoto> = observation_ids
    .iter()
    .map(|&id| ObservationPhoto { observation_id: id.clone(), url: None })
    .collect();
  let users: Vec<User> =
    user_ids.iter().map(|&id| User { id: id.clone() }).collect();

  info!(
    archive = %dir.display(),
    observations = observations.len(),
    identifications = identifications.len(),
    taxa = taxa.len(),
    users = users.len(),
    "loaded CSV archive"
  );

  Ok(RawRecords { observations, photos, identifications, taxa, users })
}

fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
  let mut reader = csv::ReaderBuilder::new()
    .trim(csv::Trim::Headers)
    .from_path(path)
    .map_err(Error::csv(path))?;
  reader
    .deserialize()
    .collect::<Result<Vec<T>, _>>()
    .map_err(Error::csv(path))
}

// ─── Coercions ───────────────────────────────────────────────────────────────

fn non_empty(text: &str) -> Option<&str> {
  Some(text.trim()).filter(|t| !t.is_empty())
}

/// Numeric ids that went through a float column (`"41053.0"`) are written
/// back in integer form so they match the same id elsewhere.
fn normalize_id(text: &str) -> String {
  let text = text.trim();
  match text.parse::<f64>() {
    Ok(v) if text.contains('.') && v.is_finite() && v.fract() == 0.0 => {
      format!("{v:.0}")
    }
    _ => text.to_owned(),
  }
}

/// The `leaf` column is `1`/`0` in most exports and `true`/`false` in some.
fn is_leaf(text: &str) -> bool {
  let text = text.trim();
  is_true_str(text) || text.parse::<f64>().is_ok_and(|v| v == 1.0)
}
