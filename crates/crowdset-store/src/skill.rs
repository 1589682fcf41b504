//! Most- and least-skilled worker per node of a flattened taxonomy.
//!
//! Skill values come from the downstream model; this module only ranks them.

use std::collections::HashMap;

use crowdset_core::{TaxonId, UserId};
use indexmap::IndexMap;
use serde::Serialize;

use crate::RecordStore;

/// Skill of each worker at each node, keyed by worker then node key.
pub type WorkerSkills = IndexMap<UserId, HashMap<String, f64>>;

/// A node of a flattened taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillNode {
  pub key:      String,
  pub parent:   Option<String>,
  pub taxon_id: TaxonId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedWorker {
  pub worker: UserId,
  pub skill:  f64,
}

/// The extreme workers at one node. Both are `None` when every worker has
/// the same skill there.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSkills {
  pub key:           String,
  pub parent:        Option<String>,
  pub taxon_id:      TaxonId,
  pub most_skilled:  Option<RankedWorker>,
  pub least_skilled: Option<RankedWorker>,
}

/// Whether `key` names the taxonomy root. Exports spell the root key either
/// as the string `"0"` or as the number zero.
pub fn is_root_sentinel(key: &str) -> bool {
  key == "0" || key.trim().parse::<i64>() == Ok(0)
}

/// Rank workers at every node. Ties go to the worker listed first in
/// `skills`. Root sentinel nodes are reported without a parent.
pub fn summarize_skills(
  nodes: &[SkillNode],
  skills: &WorkerSkills,
) -> Vec<NodeSkills> {
  nodes
    .iter()
    .map(|node| {
      let values: Vec<(&UserId, f64)> = skills
        .iter()
        .filter_map(|(worker, by_node)| {
          by_node.get(&node.key).map(|&skill| (worker, skill))
        })
        .filter(|(_, skill)| !skill.is_nan())
        .collect();

      let uniform = values
        .first()
        .is_none_or(|&(_, first)| values.iter().all(|&(_, s)| s == first));
      let (most_skilled, least_skilled) = if uniform {
        (None, None)
      } else {
        (
          extreme(&values, |candidate, best| candidate > best),
          extreme(&values, |candidate, best| candidate < best),
        )
      };

      NodeSkills {
        key: node.key.clone(),
        parent: if is_root_sentinel(&node.key) {
          None
        } else {
          node.parent.clone()
        },
        taxon_id: node.taxon_id.clone(),
        most_skilled,
        least_skilled,
      }
    })
    .collect()
}

/// Nodes whose parent is `parent`, in input order. Pass `None` for roots.
pub fn children_of<'a>(
  summary: &'a [NodeSkills],
  parent: Option<&'a str>,
) -> impl Iterator<Item = &'a NodeSkills> {
  summary
    .iter()
    .filter(move |node| node.parent.as_deref() == parent)
}

/// The first entry for which `better` beats every earlier pick.
fn extreme(
  values: &[(&UserId, f64)],
  better: impl Fn(f64, f64) -> bool,
) -> Option<RankedWorker> {
  let mut best: Option<(&UserId, f64)> = None;
  for &(worker, skill) in values {
    if best.is_none_or(|(_, current)| better(skill, current)) {
      best = Some((worker, skill));
    }
  }
  best.map(|(worker, skill)| RankedWorker { worker: worker.clone(), skill })
}

impl RecordStore {
  /// The flattened taxonomy nodes of the surviving taxa.
  pub fn skill_nodes(&self) -> Vec<SkillNode> {
    self
      .taxa
      .iter()
      .filter_map(|taxon| {
        taxon.placement.as_ref().map(|p| SkillNode {
          key:      p.key.clone(),
          parent:   p.parent.clone(),
          taxon_id: taxon.id.clone(),
        })
      })
      .collect()
  }
}
