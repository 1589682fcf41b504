//! Class prior estimation and interchange dataset assembly.

use std::collections::{BTreeSet, HashMap};

use crowdset_core::{
  ObservationId, TaxonId, UserId,
  dataset::{
    AnnoLabel, Annotation, ClassLabel, ClassPriors, CrowdDataset, DatasetInfo,
    Image, TaxonomyEntry, TaxonomyEntryData, Worker,
  },
};
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::{Error, RecordStore, Result};

/// Class priors keyed by taxon id. Iteration order is label order.
pub type TaxaPriors = IndexMap<TaxonId, f64>;

/// Class priors keyed by the node key of a pre-flattened taxonomy.
pub type LeafPriors = IndexMap<String, f64>;

impl RecordStore {
  // ── Priors ────────────────────────────────────────────────────────────────

  /// Estimate class priors from the community taxa of identified
  /// observations.
  ///
  /// The working set is every taxon used by a surviving identification plus
  /// `extra`. Each identification contributes one count to its observation's
  /// community taxon when that taxon is in the working set. Working-set taxa
  /// that were never counted get a floor of one, so every class has positive
  /// probability.
  ///
  /// Counted taxa come first in the order they were first counted, followed
  /// by the floored taxa in ascending id order.
  pub fn estimate_taxa_priors<'a>(
    &self,
    extra: impl IntoIterator<Item = &'a TaxonId>,
  ) -> TaxaPriors {
    let mut working: BTreeSet<TaxonId> =
      self.identified_taxon_ids().into_iter().collect();
    working.extend(extra.into_iter().cloned());

    let mut counts: IndexMap<TaxonId, usize> = IndexMap::new();
    for iden in &self.identifications {
      let community = self
        .observation(&iden.observation_id)
        .and_then(|ob| ob.community_taxon_id.as_ref());
      if let Some(taxon_id) = community
        && working.contains(taxon_id)
      {
        *counts.entry(taxon_id.clone()).or_insert(0) += 1;
      }
    }

    for taxon_id in working {
      counts.entry(taxon_id).or_insert(1);
    }

    let total: usize = counts.values().sum();
    debug!(classes = counts.len(), total, "estimated taxa priors");
    counts
      .into_iter()
      .map(|(taxon_id, count)| (taxon_id, count as f64 / total as f64))
      .collect()
  }

  /// Priors read from the `prob` of every leaf node of a pre-flattened
  /// taxonomy, in taxonomy order.
  pub fn leaf_priors(&self) -> LeafPriors {
    let mut priors = LeafPriors::new();
    for taxon in &self.taxa {
      let Some(placement) = taxon.placement.as_ref().filter(|p| p.leaf) else {
        continue;
      };
      match placement.prob {
        Some(prob) => {
          priors.insert(placement.key.clone(), prob);
        }
        None => warn!(
          taxon = %taxon.id,
          key = %placement.key,
          "leaf node has no probability; leaving it out of the priors"
        ),
      }
    }
    priors
  }

  // ── Assembly ──────────────────────────────────────────────────────────────

  /// Assemble the interchange dataset with dense integer labels assigned in
  /// `priors` order.
  ///
  /// Fails if any surviving identification uses a taxon missing from
  /// `priors`.
  pub fn create_dataset(&self, priors: &TaxaPriors) -> Result<CrowdDataset> {
    let labels: IndexMap<TaxonId, ClassLabel> = priors
      .keys()
      .enumerate()
      .map(|(label, taxon_id)| (taxon_id.clone(), ClassLabel::Index(label)))
      .collect();
    let annos = self.annotations(&labels)?;

    Ok(CrowdDataset {
      dataset: DatasetInfo {
        num_classes:                  labels.len(),
        inat_taxon_id_to_class_label: labels,
        global_class_priors:          ClassPriors::Dense(
          priors.values().copied().collect(),
        ),
        taxonomy_data:                None,
      },
      workers: self.workers(),
      images: self.images(),
      annos,
    })
  }

  /// Assemble the interchange dataset for a pre-flattened taxonomy: labels
  /// are node keys, priors are keyed, and the taxonomy itself is included.
  pub fn create_hierarchical_dataset(
    &self,
    leaf_priors: &LeafPriors,
  ) -> Result<CrowdDataset> {
    let placed = || {
      self
        .taxa
        .iter()
        .filter_map(|t| t.placement.as_ref().map(|p| (t, p)))
    };

    let labels: IndexMap<TaxonId, ClassLabel> = placed()
      .map(|(t, p)| (t.id.clone(), ClassLabel::Key(p.key.clone())))
      .collect();
    let taxonomy = placed()
      .map(|(_, p)| TaxonomyEntry {
        parent: p.parent.clone(),
        key:    p.key.clone(),
        data:   TaxonomyEntryData { prob: p.prob },
      })
      .collect();
    let annos = self.annotations(&labels)?;

    let images = self
      .observations
      .iter()
      .map(|ob| {
        (ob.id.clone(), Image {
          id:         ob.id.clone(),
          created_at: None,
          url:        None,
          urls:       None,
        })
      })
      .collect();

    Ok(CrowdDataset {
      dataset: DatasetInfo {
        num_classes:                  leaf_priors.len(),
        inat_taxon_id_to_class_label: labels,
        global_class_priors:          ClassPriors::Keyed(leaf_priors.clone()),
        taxonomy_data:                Some(taxonomy),
      },
      workers: self.workers(),
      images,
      annos,
    })
  }

  // ── Sections ──────────────────────────────────────────────────────────────

  /// Every user with at least one identification, in first-seen order.
  fn workers(&self) -> IndexMap<UserId, Worker> {
    let mut workers = IndexMap::new();
    for iden in &self.identifications {
      workers
        .entry(iden.user_id.clone())
        .or_insert_with(|| Worker { id: iden.user_id.clone() });
    }
    workers
  }

  /// One image per observation with its photo URLs in load order.
  fn images(&self) -> IndexMap<ObservationId, Image> {
    let mut urls: HashMap<_, Vec<String>> = HashMap::new();
    for photo in &self.photos {
      if let Some(url) = &photo.url {
        urls
          .entry(&photo.observation_id)
          .or_default()
          .push(url.clone());
      }
    }

    self
      .observations
      .iter()
      .map(|ob| {
        let photo_urls = urls.remove(&ob.id).unwrap_or_default();
        (ob.id.clone(), Image {
          id:         ob.id.clone(),
          created_at: ob.created_at.clone(),
          url:        photo_urls.first().cloned(),
          urls:       Some(photo_urls),
        })
      })
      .collect()
  }

  fn annotations(
    &self,
    labels: &IndexMap<TaxonId, ClassLabel>,
  ) -> Result<Vec<Annotation>> {
    self
      .identifications
      .iter()
      .map(|iden| {
        let label = labels.get(&iden.taxon_id).cloned().ok_or_else(|| {
          Error::UnlabeledTaxon {
            identification: iden.id.clone(),
            taxon:          iden.taxon_id.clone(),
          }
        })?;
        Ok(Annotation {
          anno:       AnnoLabel::multiclass(label),
          image_id:   iden.observation_id.clone(),
          worker_id:  iden.user_id.clone(),
          created_at: iden.created_at.clone(),
          id:         iden.id.clone(),
        })
      })
      .collect()
  }
}
