//! Error type for `crowdset-store`.
//!
//! Every variant is a fatal integrity violation: the archive is corrupt or
//! operations were composed inconsistently, and the store must be discarded.
//! Recoverable data-quality problems are logged and never surface here.

use crowdset_core::{IdentificationId, ObservationId, TaxonId, UserId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("identification id {0} appears more than once")]
  DuplicateIdentificationId(IdentificationId),

  #[error("observation id {0} appears more than once")]
  DuplicateObservationId(ObservationId),

  #[error(
    "observation {observation} has more than one current identification \
     from user {user}"
  )]
  DuplicateCurrentOpinion {
    observation: ObservationId,
    user:        UserId,
  },

  #[error(
    "identification {identification} refers to taxon {taxon}, which has no \
     class label"
  )]
  UnlabeledTaxon {
    identification: IdentificationId,
    taxon:          TaxonId,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
