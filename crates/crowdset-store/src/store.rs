//! [`RecordStore`]: owned collections plus their id indexes.

use std::{
  collections::{HashMap, HashSet},
  hash::Hash,
};

use crowdset_core::{
  IdentificationId, ObservationId, TaxonId,
  record::{
    Identification, Observation, ObservationPhoto, RawRecords, Taxon, User,
  },
};
use tracing::{debug, warn};

use crate::{Error, Result};

// ─── Options ─────────────────────────────────────────────────────────────────

/// Controls the sanity pass run when a store is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
  /// Drop taxa whose rank level is missing, in addition to those whose rank
  /// level is malformed.
  pub require_rank_level:      bool,
  /// Drop taxa that no observation names as its community taxon. Keeps the
  /// graph small when working from a full, unpruned taxonomy.
  pub prune_unreferenced_taxa: bool,
}

impl LoadOptions {
  /// Options for a full taxonomy export with numeric rank levels.
  pub fn full_taxonomy(prune_unreferenced_taxa: bool) -> Self {
    Self { require_rank_level: true, prune_unreferenced_taxa }
  }

  /// Options for a pre-flattened taxonomy without rank levels.
  pub fn flattened_taxonomy() -> Self {
    Self { require_rank_level: false, prune_unreferenced_taxa: false }
  }
}

impl Default for LoadOptions {
  fn default() -> Self { Self::full_taxonomy(false) }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// The five collections of one dataset variant.
///
/// Fields are crate-visible so that the filter, collapse and prior modules
/// can rewrite collections; every such rewrite must end with
/// [`RecordStore::repair`].
#[derive(Debug, Clone)]
pub struct RecordStore {
  pub(crate) observations:    Vec<Observation>,
  pub(crate) photos:          Vec<ObservationPhoto>,
  pub(crate) identifications: Vec<Identification>,
  pub(crate) taxa:            Vec<Taxon>,
  pub(crate) users:           Vec<User>,

  observation_index:    HashMap<ObservationId, usize>,
  identification_index: HashMap<IdentificationId, usize>,
  taxon_index:          HashMap<TaxonId, usize>,
}

impl RecordStore {
  /// Build a store from raw collections and run the sanity pass.
  ///
  /// Malformed taxa and dangling identifications are dropped with a
  /// warning. Duplicate observation or identification ids are fatal.
  pub fn load(raw: RawRecords, options: LoadOptions) -> Result<Self> {
    let mut taxa = Vec::with_capacity(raw.taxa.len());
    for raw_taxon in raw.taxa {
      let id = raw_taxon.id.clone();
      match Taxon::from_raw(raw_taxon, options.require_rank_level) {
        Ok(taxon) => taxa.push(taxon),
        Err(e) => warn!(taxon = %id, error = %e, "dropping malformed taxon"),
      }
    }

    if options.prune_unreferenced_taxa {
      let referenced: HashSet<&TaxonId> = raw
        .observations
        .iter()
        .filter_map(|ob| ob.community_taxon_id.as_ref())
        .collect();
      let before = taxa.len();
      taxa.retain(|t| referenced.contains(&t.id));
      debug!(
        dropped = before - taxa.len(),
        "pruned taxa never used as a community taxon"
      );
    }

    let mut store = Self {
      observations: raw.observations,
      photos: raw.photos,
      identifications: raw.identifications,
      taxa,
      users: raw.users,
      observation_index: HashMap::new(),
      identification_index: HashMap::new(),
      taxon_index: HashMap::new(),
    };

    let loaded = store.identifications.len();
    store.repair();
    let dangling = loaded - store.identifications.len();
    if dangling > 0 {
      warn!(dangling, "dropped identifications with unresolved references");
    }

    if let Some(id) = first_duplicate(&store.identifications, |i| &i.id) {
      return Err(Error::DuplicateIdentificationId(id.clone()));
    }
    if let Some(id) = first_duplicate(&store.observations, |o| &o.id) {
      return Err(Error::DuplicateObservationId(id.clone()));
    }

    Ok(store)
  }

  /// Cascade removals to dependent collections and rebuild every index.
  ///
  /// Called unconditionally after any structural change: observations and
  /// taxa are the primary collections, identifications and photos follow.
  pub(crate) fn repair(&mut self) {
    self.observation_index = index_by(&self.observations, |o| &o.id);
    self.taxon_index = index_by(&self.taxa, |t| &t.id);

    let observations = &self.observation_index;
    let taxa = &self.taxon_index;
    self.identifications.retain(|i| {
      observations.contains_key(&i.observation_id)
        && taxa.contains_key(&i.taxon_id)
    });
    self
      .photos
      .retain(|p| observations.contains_key(&p.observation_id));

    self.identification_index = index_by(&self.identifications, |i| &i.id);
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub fn observations(&self) -> &[Observation] { &self.observations }

  pub fn photos(&self) -> &[ObservationPhoto] { &self.photos }

  pub fn identifications(&self) -> &[Identification] { &self.identifications }

  pub fn taxa(&self) -> &[Taxon] { &self.taxa }

  pub fn users(&self) -> &[User] { &self.users }

  pub fn observation(&self, id: &ObservationId) -> Option<&Observation> {
    self.observation_index.get(id).map(|&i| &self.observations[i])
  }

  pub fn identification(
    &self,
    id: &IdentificationId,
  ) -> Option<&Identification> {
    self
      .identification_index
      .get(id)
      .map(|&i| &self.identifications[i])
  }

  pub fn taxon(&self, id: &TaxonId) -> Option<&Taxon> {
    self.taxon_index.get(id).map(|&i| &self.taxa[i])
  }

  /// Ids of the surviving observations, in store order.
  pub fn observation_ids(&self) -> Vec<ObservationId> {
    self.observations.iter().map(|o| o.id.clone()).collect()
  }

  /// Taxon ids referenced by the surviving identifications.
  pub fn identified_taxon_ids(&self) -> HashSet<TaxonId> {
    self
      .identifications
      .iter()
      .map(|i| i.taxon_id.clone())
      .collect()
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn index_by<T, K, F>(items: &[T], key: F) -> HashMap<K, usize>
where
  K: Eq + Hash + Clone,
  F: Fn(&T) -> &K,
{
  items
    .iter()
    .enumerate()
    .map(|(position, item)| (key(item).clone(), position))
    .collect()
}

fn first_duplicate<'a, T, K, F>(items: &'a [T], key: F) -> Option<&'a K>
where
  K: Eq + Hash + 'a,
  F: Fn(&'a T) -> &'a K,
{
  let mut seen = HashSet::with_capacity(items.len());
  items.iter().map(key).find(|k| !seen.insert(*k))
}
