//! In-memory record store and the filtering engine built on it.
//!
//! A [`RecordStore`] owns the five collections of one dataset variant. Every
//! filter, the rank collapser and the dataset assembler are methods on it;
//! each structural change ends with an unconditional repair that cascades
//! removals and rebuilds the id indexes.

mod collapse;
mod filter;
mod priors;
mod store;

pub mod error;
pub mod skill;

pub use collapse::CollapseReport;
pub use error::{Error, Result};
pub use filter::Keep;
pub use priors::{LeafPriors, TaxaPriors};
pub use store::{LoadOptions, RecordStore};
