//! Error types for archive loading and dataset writing.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("I/O error on {}: {source}", path.display())]
  Io {
    path:   PathBuf,
    source: std::io::Error,
  },

  #[error("JSON error in {}: {source}", path.display())]
  Json {
    path:   PathBuf,
    source: serde_json::Error,
  },

  #[error("CSV error in {}: {source}", path.display())]
  Csv {
    path:   PathBuf,
    source: csv::Error,
  },

  #[error("{} holds neither a JSON nor a CSV archive", .0.display())]
  UnknownLayout(PathBuf),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
    let path = path.into();
    move |source| Self::Io { path, source }
  }

  pub(crate) fn json(path: impl Into<PathBuf>) -> impl FnOnce(serde_json::Error) -> Self {
    let path = path.into();
    move |source| Self::Json { path, source }
  }

  pub(crate) fn csv(path: impl Into<PathBuf>) -> impl FnOnce(csv::Error) -> Self {
    let path = path.into();
    move |source| Self::Csv { path, source }
  }
}
