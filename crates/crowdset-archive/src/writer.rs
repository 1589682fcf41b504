//! Dataset output.

use std::{
  fs::{self, File},
  io::{BufWriter, Write},
  path::Path,
};

use crowdset_core::dataset::CrowdDataset;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::info;

use crate::{Error, Result};

/// Write an assembled dataset to `path`, creating parent directories.
///
/// `pretty` indents with four spaces so the file stays readable by hand.
pub fn write_dataset(
  path: &Path,
  dataset: &CrowdDataset,
  pretty: bool,
) -> Result<()> {
  write_json(path, dataset, pretty)?;
  info!(
    path = %path.display(),
    classes = dataset.dataset.num_classes,
    workers = dataset.workers.len(),
    images = dataset.images.len(),
    annos = dataset.annos.len(),
    "wrote dataset"
  );
  Ok(())
}

/// Serialize `value` as JSON to `path`, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(
  path: &Path,
  value: &T,
  pretty: bool,
) -> Result<()> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    fs::create_dir_all(parent).map_err(Error::io(parent))?;
  }

  let file = File::create(path).map_err(Error::io(path))?;
  let mut out = BufWriter::new(file);
  if pretty {
    let mut serializer = serde_json::Serializer::with_formatter(
      &mut out,
      PrettyFormatter::with_indent(b"    "),
    );
    value.serialize(&mut serializer).map_err(Error::json(path))?;
  } else {
    serde_json::to_writer(&mut out, value).map_err(Error::json(path))?;
  }
  out.flush().map_err(Error::io(path))
}
