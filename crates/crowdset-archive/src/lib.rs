//! Archive loading and dataset writing for crowdset.
//!
//! Reads an exported archive directory into [`RawRecords`] and writes
//! assembled datasets back out as JSON. Pure synchronous file I/O; all
//! filtering lives in `crowdset-store`.
//!
//! # Quick start
//!
//! ```no_run
//! use std::path::Path;
//!
//! use crowdset_archive::{ArchiveFormat, load_archive};
//!
//! let dir = Path::new("archive");
//! let raw = load_archive(dir, ArchiveFormat::detect(dir).unwrap()).unwrap();
//! println!("{} identifications", raw.identifications.len());
//! ```

pub mod error;
mod flat_archive;
mod json_archive;
mod writer;

use std::path::Path;

use crowdset_core::record::RawRecords;
pub use error::{Error, Result};
pub use flat_archive::load_csv_archive;
pub use json_archive::{load_json_archive, read_json};
use serde::{Deserialize, Serialize};
pub use writer::{write_dataset, write_json};

/// The two archive layouts understood by the loader.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ArchiveFormat {
  /// One JSON array per collection, with a full taxonomy.
  Json,
  /// `identifications.csv` plus a pre-flattened `taxonomy.csv`.
  Csv,
}

impl ArchiveFormat {
  /// Guess the layout of `dir` from the files it contains.
  pub fn detect(dir: &Path) -> Result<Self> {
    if dir.join(json_archive::OBSERVATIONS).is_file() {
      Ok(Self::Json)
    } else if dir.join(flat_archive::IDENTIFICATIONS).is_file()
      && dir.join(flat_archive::TAXONOMY).is_file()
    {
      Ok(Self::Csv)
    } else {
      Err(Error::UnknownLayout(dir.to_path_buf()))
    }
  }
}

/// Load the archive in `dir` using the given layout.
pub fn load_archive(dir: &Path, format: ArchiveFormat) -> Result<RawRecords> {
  match format {
    ArchiveFormat::Json => load_json_archive(dir),
    ArchiveFormat::Csv => load_csv_archive(dir),
  }
}
