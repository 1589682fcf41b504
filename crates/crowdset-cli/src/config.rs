//! Build configuration: TOML file, then `CROWDSET_*` environment variables,
//! then command-line flags.

use std::path::Path;

use anyhow::Context;
use crowdset_store::Keep;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
  /// Rank every variant is collapsed and flattened to.
  pub leaf_rank_level:          f64,
  /// Minimum identifications per observation for the label and worker
  /// variants.
  pub min_identifications:      usize,
  /// Minimum identifications per observation for the test variant.
  pub test_min_identifications: usize,
  /// Cap on observations in every variant.
  pub max_observations:         Option<usize>,
  /// Which of a user's identifications the worker variant keeps.
  pub keep:                     Keep,
  /// Drop taxa that no observation uses as its community taxon on load.
  pub prune_unreferenced_taxa:  bool,
  /// Seed for observation sampling. A random seed is drawn and logged when
  /// unset.
  pub seed:                     Option<u64>,
}

impl Default for BuildConfig {
  fn default() -> Self {
    Self {
      leaf_rank_level:          10.0,
      min_identifications:      2,
      test_min_identifications: 1,
      max_observations:         None,
      keep:                     Keep::First,
      prune_unreferenced_taxa:  true,
      seed:                     None,
    }
  }
}

impl BuildConfig {
  /// Read `path` if it exists, layering `CROWDSET_*` variables on top.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("CROWDSET"))
      .build()
      .with_context(|| format!("failed to read config file {path:?}"))?;

    settings
      .try_deserialize()
      .context("failed to deserialise BuildConfig")
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use super::*;

  #[test]
  fn defaults_match_the_standard_build() {
    let config = BuildConfig::default();
    assert_eq!(config.leaf_rank_level, 10.0);
    assert_eq!(config.min_identifications, 2);
    assert_eq!(config.test_min_identifications, 1);
    assert_eq!(config.max_observations, None);
    assert_eq!(config.keep, Keep::First);
    assert!(config.prune_unreferenced_taxa);
    assert_eq!(config.seed, None);
  }

  #[test]
  fn file_overrides_selected_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crowdset.toml");
    fs::write(
      &path,
      "leaf_rank_level = 20.0\nmax_observations = 500\nkeep = \"last\"\nseed = 7\n",
    )
    .unwrap();

    let config = BuildConfig::load(&path).unwrap();
    assert_eq!(config.leaf_rank_level, 20.0);
    assert_eq!(config.max_observations, Some(500));
    assert_eq!(config.keep, Keep::Last);
    assert_eq!(config.seed, Some(7));
    assert_eq!(config.min_identifications, 2);
  }

  #[test]
  fn rejects_unknown_keep_value() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crowdset.toml");
    fs::write(&path, "keep = \"middle\"\n").unwrap();

    assert!(BuildConfig::load(&path).is_err());
  }
}
