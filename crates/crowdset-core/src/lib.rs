//! Core types for the crowdset dataset builder.
//!
//! This crate is deliberately free of filesystem and filtering logic. It
//! defines the records loaded from an archive, the identifier newtypes, and
//! the interchange structure handed to the downstream consensus model.

pub mod coerce;
pub mod dataset;
pub mod error;
pub mod ids;
pub mod record;
pub mod time;

pub use error::{Error, Result};
pub use ids::{IdentificationId, ObservationId, TaxonId, UserId};
