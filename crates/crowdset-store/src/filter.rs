//! The integrity filter pipeline.
//!
//! Each operation computes its keep-set in full, replaces the primary
//! collection, then calls [`RecordStore::repair`]. Operations compose in any
//! order, but the result depends on the order chosen.

use std::collections::{HashMap, HashSet};

use crowdset_core::{ObservationId, UserId, record::Identification, time};
use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, RecordStore, Result};

/// Which identification to keep from a user's opinions on one observation.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Keep {
  /// The earliest identification.
  #[default]
  First,
  /// The latest identification.
  Last,
}

impl RecordStore {
  /// Keep only the listed observations.
  pub fn keep_specific_observations<'a>(
    &mut self,
    ids: impl IntoIterator<Item = &'a ObservationId>,
  ) {
    let keep: HashSet<&ObservationId> = ids.into_iter().collect();
    self.observations.retain(|o| keep.contains(&o.id));
    self.repair();
    debug!(observations = self.observations.len(), "kept specific observations");
  }

  /// Keep only current identifications.
  ///
  /// Fails without modifying the store if two current identifications on one
  /// observation come from the same user.
  pub fn keep_current_identifications(&mut self) -> Result<()> {
    let mut seen: HashSet<(&ObservationId, &UserId)> = HashSet::new();
    for iden in self.identifications.iter().filter(|i| i.current) {
      if !seen.insert((&iden.observation_id, &iden.user_id)) {
        return Err(Error::DuplicateCurrentOpinion {
          observation: iden.observation_id.clone(),
          user:        iden.user_id.clone(),
        });
      }
    }

    self.identifications.retain(|i| i.current);
    self.repair();
    debug!(
      identifications = self.identifications.len(),
      "kept current identifications"
    );
    Ok(())
  }

  /// Reduce every (observation, user) group to a single identification,
  /// ordered by `created_at`.
  ///
  /// Identifications whose timestamp matches no accepted layout are dropped
  /// with a warning.
  pub fn keep_one_identification_per_user_per_observation(&mut self, keep: Keep) {
    let mut groups: IndexMap<(&ObservationId, &UserId), Vec<_>> = IndexMap::new();
    for (position, iden) in self.identifications.iter().enumerate() {
      match time::parse_timestamp(&iden.created_at) {
        Ok(at) => groups
          .entry((&iden.observation_id, &iden.user_id))
          .or_default()
          .push((at, position)),
        Err(e) => warn!(
          identification = %iden.id,
          error = %e,
          "dropping identification with unparseable timestamp"
        ),
      }
    }

    let kept: HashSet<usize> = groups
      .into_values()
      .filter_map(|mut group| {
        // Stable, so equal timestamps keep load order.
        group.sort_by_key(|&(at, _)| at);
        let chosen = match keep {
          Keep::First => group.first(),
          Keep::Last => group.last(),
        };
        chosen.map(|&(_, position)| position)
      })
      .collect();

    retain_positions(&mut self.identifications, &kept);
    self.repair();
    debug!(
      identifications = self.identifications.len(),
      %keep,
      "kept one identification per user per observation"
    );
  }

  /// Drop observations with no associated photo.
  pub fn remove_obs_with_no_photos(&mut self) {
    let with_photos: HashSet<&ObservationId> =
      self.photos.iter().map(|p| &p.observation_id).collect();
    self.observations.retain(|o| with_photos.contains(&o.id));
    self.repair();
    debug!(
      observations = self.observations.len(),
      "removed observations without photos"
    );
  }

  /// Drop inactive taxa and the identifications that use them.
  pub fn remove_non_active_taxa(&mut self) {
    self.taxa.retain(|t| t.is_active);
    self.repair();
    debug!(taxa = self.taxa.len(), "removed inactive taxa");
  }

  /// Drop observations with fewer than `min` surviving identifications.
  pub fn enforce_min_identifications(&mut self, min: usize) {
    let counts = count_by_observation(&self.identifications);
    self
      .observations
      .retain(|o| counts.get(&o.id).copied().unwrap_or(0) >= min);
    self.repair();
    debug!(
      observations = self.observations.len(),
      min,
      "enforced minimum identifications"
    );
  }

  /// Keep a uniform random sample of `max` observations. A no-op when the
  /// store already holds `max` or fewer. Survivors keep their relative order.
  pub fn enforce_max_observations<R: Rng + ?Sized>(
    &mut self,
    max: usize,
    rng: &mut R,
  ) {
    let total = self.observations.len();
    if total <= max {
      return;
    }

    let kept: HashSet<usize> =
      rand::seq::index::sample(rng, total, max).into_iter().collect();
    retain_positions(&mut self.observations, &kept);
    self.repair();
    debug!(sampled = max, from = total, "enforced maximum observations");
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn count_by_observation(
  identifications: &[Identification],
) -> HashMap<&ObservationId, usize> {
  let mut counts = HashMap::new();
  for iden in identifications {
    *counts.entry(&iden.observation_id).or_insert(0) += 1;
  }
  counts
}

/// Keep the items whose position is in `kept`, preserving order.
fn retain_positions<T>(items: &mut Vec<T>, kept: &HashSet<usize>) {
  let all = std::mem::take(items);
  *items = all
    .into_iter()
    .enumerate()
    .filter_map(|(position, item)| kept.contains(&position).then_some(item))
    .collect();
}
