//! Taxonomy rank collapsing.

use std::collections::{HashMap, HashSet};

use crowdset_core::{TaxonId, record::Taxon};
use tracing::{info, warn};

use crate::RecordStore;

/// What [`RecordStore::set_rank_level_as_leaf_level`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollapseReport {
  /// Taxa below the target rank that were folded into an ancestor.
  pub remapped_taxa:             usize,
  /// Taxa below the target rank with no qualifying ancestor.
  pub unremappable:              Vec<TaxonId>,
  /// Identifications whose taxon was rewritten to an ancestor.
  pub rewritten_identifications: usize,
  /// Identifications removed along with unremappable taxa.
  pub dropped_identifications:   usize,
}

impl RecordStore {
  /// Make `target` the leaf rank of the taxonomy.
  ///
  /// Every taxon finer than `target` is remapped onto its nearest ancestor
  /// whose rank is at or above `target`, and identifications follow it. The
  /// remapped taxa are then removed. Taxa with no such ancestor, or with no
  /// rank level at all, are dropped together with their identifications.
  pub fn set_rank_level_as_leaf_level(&mut self, target: f64) -> CollapseReport {
    let mut remap: HashMap<TaxonId, TaxonId> = HashMap::new();
    let mut unremappable: Vec<TaxonId> = Vec::new();

    for taxon in &self.taxa {
      match taxon.rank_level {
        Some(rank) if rank >= target => {}
        Some(_) => match self.coarser_ancestor(taxon, target) {
          Some(ancestor) => {
            remap.insert(taxon.id.clone(), ancestor.clone());
          }
          None => unremappable.push(taxon.id.clone()),
        },
        None => unremappable.push(taxon.id.clone()),
      }
    }

    for id in &unremappable {
      warn!(
        taxon = %id,
        leaf_rank = target,
        "taxon has no ancestor at or above the target rank; dropping it"
      );
    }
    let dropped: HashSet<&TaxonId> = unremappable.iter().collect();

    let before = self.identifications.len();
    self.identifications.retain(|i| !dropped.contains(&i.taxon_id));
    let dropped_identifications = before - self.identifications.len();

    let mut rewritten_identifications = 0;
    for iden in &mut self.identifications {
      if let Some(ancestor) = remap.get(&iden.taxon_id) {
        iden.taxon_id = ancestor.clone();
        rewritten_identifications += 1;
      }
    }

    self
      .taxa
      .retain(|t| !remap.contains_key(&t.id) && !dropped.contains(&t.id));
    self.repair();

    let report = CollapseReport {
      remapped_taxa: remap.len(),
      unremappable,
      rewritten_identifications,
      dropped_identifications,
    };
    info!(
      leaf_rank = target,
      remapped = report.remapped_taxa,
      unremappable = report.unremappable.len(),
      rewritten = report.rewritten_identifications,
      "collapsed taxonomy to leaf rank"
    );
    report
  }

  /// Keep only taxa whose rank level is exactly `target`.
  ///
  /// Intended for taxonomies that are already flat at the target rank, or
  /// as the step after [`Self::set_rank_level_as_leaf_level`].
  pub fn create_flat_taxonomy(&mut self, target: f64) {
    self.taxa.retain(|t| t.rank_level == Some(target));
    self.repair();
    info!(leaf_rank = target, taxa = self.taxa.len(), "flattened taxonomy");
  }

  /// Walk `taxon`'s ancestry from its parent toward the root and return the
  /// first ancestor still in the store with rank at or above `target`.
  fn coarser_ancestor<'t>(
    &self,
    taxon: &'t Taxon,
    target: f64,
  ) -> Option<&'t TaxonId> {
    taxon.ancestry.as_ref()?.nearest_first().find(|ancestor| {
      self
        .taxon(ancestor)
        .and_then(|t| t.rank_level)
        .is_some_and(|rank| rank >= target)
    })
  }
}
