//! The interchange structure consumed by the crowd-consensus model.
//!
//! This is the only contract with the downstream component. Field names and
//! nesting match what the model's loader expects; map order is preserved
//! because class labels are assigned by position.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{IdentificationId, ObservationId, TaxonId, UserId};

// ─── Labels and priors ───────────────────────────────────────────────────────

/// A class label as written into the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassLabel {
  /// Dense integer label assigned from prior order.
  Index(usize),
  /// Node key of a pre-flattened taxonomy.
  Key(String),
}

/// Global class priors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassPriors {
  /// Ordered by class label.
  Dense(Vec<f64>),
  /// Keyed by taxonomy node key.
  Keyed(IndexMap<String, f64>),
}

/// One node of a pre-flattened taxonomy, echoed into hierarchical datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyEntry {
  pub parent: Option<String>,
  pub key:    String,
  pub data:   TaxonomyEntryData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyEntryData {
  pub prob: Option<f64>,
}

// ─── Sections ────────────────────────────────────────────────────────────────

/// The `dataset` section: label space and priors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
  pub num_classes:                  usize,
  pub inat_taxon_id_to_class_label: IndexMap<TaxonId, ClassLabel>,
  pub global_class_priors:          ClassPriors,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub taxonomy_data:                Option<Vec<TaxonomyEntry>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
  pub id: UserId,
}

/// An observation as an image to be labelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
  pub id:         ObservationId,
  pub created_at: Option<String>,
  pub url:        Option<String>,
  pub urls:       Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnoLabel {
  pub gtype: String,
  pub label: ClassLabel,
}

impl AnnoLabel {
  pub fn multiclass(label: ClassLabel) -> Self {
    Self { gtype: "multiclass".to_owned(), label }
  }
}

/// One identification expressed as a worker's label on an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
  pub anno:       AnnoLabel,
  pub image_id:   ObservationId,
  pub worker_id:  UserId,
  pub created_at: String,
  pub id:         IdentificationId,
}

// ─── CrowdDataset ────────────────────────────────────────────────────────────

/// The complete interchange document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrowdDataset {
  pub dataset: DatasetInfo,
  pub workers: IndexMap<UserId, Worker>,
  pub images:  IndexMap<ObservationId, Image>,
  pub annos:   Vec<Annotation>,
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn serialises_to_interchange_shape() {
    let mut labels = IndexMap::new();
    labels.insert(TaxonId::from("47792"), ClassLabel::Index(0));
    let mut workers = IndexMap::new();
    workers.insert(UserId::from("3891"), Worker { id: UserId::from("3891") });
    let mut images = IndexMap::new();
    images.insert(ObservationId::from("41053"), Image {
      id:         ObservationId::from("41053"),
      created_at: Some("2011-12-04 05:08:29".into()),
      url:        Some("http://x/1.jpg".into()),
      urls:       Some(vec!["http://x/1.jpg".into()]),
    });

    let dataset = CrowdDataset {
      dataset: DatasetInfo {
        num_classes:                  1,
        inat_taxon_id_to_class_label: labels,
        global_class_priors:          ClassPriors::Dense(vec![1.0]),
        taxonomy_data:                None,
      },
      workers,
      images,
      annos: vec![Annotation {
        anno:       AnnoLabel::multiclass(ClassLabel::Index(0)),
        image_id:   ObservationId::from("41053"),
        worker_id:  UserId::from("3891"),
        created_at: "2011-12-04 05:08:30".into(),
        id:         IdentificationId::from("53829"),
      }],
    };

    assert_eq!(
      serde_json::to_value(&dataset).unwrap(),
      json!({
        "dataset": {
          "num_classes": 1,
          "inat_taxon_id_to_class_label": { "47792": 0 },
          "global_class_priors": [1.0]
        },
        "workers": { "3891": { "id": "3891" } },
        "images": {
          "41053": {
            "id": "41053",
            "created_at": "2011-12-04 05:08:29",
            "url": "http://x/1.jpg",
            "urls": ["http://x/1.jpg"]
          }
        },
        "annos": [{
          "anno": { "gtype": "multiclass", "label": 0 },
          "image_id": "41053",
          "worker_id": "3891",
          "created_at": "2011-12-04 05:08:30",
          "id": "53829"
        }]
      })
    );
  }
}
