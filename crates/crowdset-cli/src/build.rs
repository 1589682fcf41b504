//! The `build` subcommand: three dataset variants from one archive.
//!
//! - observation-label: current identifications on well-identified
//!   observations;
//! - worker-skill: the same observations, one identification per user;
//! - test: current identifications with a lower identification floor.

use std::path::Path;

use anyhow::Context;
use crowdset_archive::{ArchiveFormat, load_archive, write_dataset};
use crowdset_store::{LoadOptions, RecordStore};
use rand::Rng;
use tracing::info;

use crate::config::BuildConfig;

pub const OBSERVATION_LABEL_FILE: &str = "observation_label_pred_dataset.json";
pub const WORKER_SKILL_FILE: &str = "worker_skill_pred_dataset.json";
pub const TEST_FILE: &str = "test_dataset.json";

/// Build and write all three variants from the archive in `archive_dir`.
pub fn run<R: Rng + ?Sized>(
  archive_dir: &Path,
  output_dir: &Path,
  format: ArchiveFormat,
  config: &BuildConfig,
  rng: &mut R,
) -> anyhow::Result<()> {
  info!(archive = %archive_dir.display(), %format, "building datasets");
  match format {
    ArchiveFormat::Json => build_full(archive_dir, output_dir, config, rng),
    ArchiveFormat::Csv => build_flattened(archive_dir, output_dir, config, rng),
  }
}

// ─── Full taxonomy (JSON archive) ────────────────────────────────────────────

fn build_full<R: Rng + ?Sized>(
  archive_dir: &Path,
  output_dir: &Path,
  config: &BuildConfig,
  rng: &mut R,
) -> anyhow::Result<()> {
  let mut raw = load_archive(archive_dir, ArchiveFormat::Json)
    .context("failed to load JSON archive")?;
  // Inactive taxa and taxa without ancestry never take part in the remap.
  // A root carries an empty ancestry, not a missing one.
  raw.taxa.retain(|t| t.is_active && t.ancestry.is_some());
  let options = LoadOptions::full_taxonomy(config.prune_unreferenced_taxa);

  let collapsed = |variant: &str| -> anyhow::Result<RecordStore> {
    let mut store = RecordStore::load(raw.clone(), options)
      .with_context(|| format!("failed to load {variant} records"))?;
    store.set_rank_level_as_leaf_level(config.leaf_rank_level);
    store.create_flat_taxonomy(config.leaf_rank_level);
    store.remove_non_active_taxa();
    Ok(store)
  };

  let mut labels = collapsed("observation-label")?;
  labels
    .keep_current_identifications()
    .context("observation-label variant")?;
  labels.remove_obs_with_no_photos();
  labels.enforce_min_identifications(config.min_identifications);
  cap(&mut labels, config, rng);
  let observation_ids = labels.observation_ids();

  let mut workers = collapsed("worker-skill")?;
  workers.keep_specific_observations(&observation_ids);
  workers.keep_one_identification_per_user_per_observation(config.keep);
  workers.remove_obs_with_no_photos();
  workers.enforce_min_identifications(config.min_identifications);
  cap(&mut workers, config, rng);

  // Both variants share one label space.
  let mut working = labels.identified_taxon_ids();
  working.extend(workers.identified_taxon_ids());
  let priors = labels.estimate_taxa_priors(&working);

  write_dataset(
    &output_dir.join(OBSERVATION_LABEL_FILE),
    &labels.create_dataset(&priors)?,
    false,
  )?;
  write_dataset(
    &output_dir.join(WORKER_SKILL_FILE),
    &workers.create_dataset(&priors)?,
    false,
  )?;

  let mut test = collapsed("test")?;
  test.keep_current_identifications().context("test variant")?;
  test.remove_obs_with_no_photos();
  test.enforce_min_identifications(config.test_min_identifications);
  cap(&mut test, config, rng);
  let test_priors = test.estimate_taxa_priors([]);
  write_dataset(
    &output_dir.join(TEST_FILE),
    &test.create_dataset(&test_priors)?,
    false,
  )?;

  Ok(())
}

// ─── Pre-flattened taxonomy (CSV archive) ────────────────────────────────────

fn build_flattened<R: Rng + ?Sized>(
  archive_dir: &Path,
  output_dir: &Path,
  config: &BuildConfig,
  rng: &mut R,
) -> anyhow::Result<()> {
  let raw = load_archive(archive_dir, ArchiveFormat::Csv)
    .context("failed to load CSV archive")?;
  let load = |variant: &str| -> anyhow::Result<RecordStore> {
    RecordStore::load(raw.clone(), LoadOptions::flattened_taxonomy())
      .with_context(|| format!("failed to load {variant} records"))
  };

  let mut labels = load("observation-label")?;
  labels
    .keep_current_identifications()
    .context("observation-label variant")?;
  labels.enforce_min_identifications(config.min_identifications);
  cap(&mut labels, config, rng);
  let observation_ids = labels.observation_ids();

  let mut workers = load("worker-skill")?;
  workers.keep_specific_observations(&observation_ids);
  workers.keep_one_identification_per_user_per_observation(config.keep);
  workers.enforce_min_identifications(config.min_identifications);
  cap(&mut workers, config, rng);

  let priors = labels.leaf_priors();

  write_dataset(
    &output_dir.join(OBSERVATION_LABEL_FILE),
    &labels.create_hierarchical_dataset(&priors)?,
    false,
  )?;
  write_dataset(
    &output_dir.join(WORKER_SKILL_FILE),
    &workers.create_hierarchical_dataset(&priors)?,
    true,
  )?;

  let mut test = load("test")?;
  test.keep_current_identifications().context("test variant")?;
  test.enforce_min_identifications(config.test_min_identifications);
  cap(&mut test, config, rng);
  write_dataset(
    &output_dir.join(TEST_FILE),
    &test.create_hierarchical_dataset(&priors)?,
    false,
  )?;

  Ok(())
}

fn cap<R: Rng + ?Sized>(store: &mut RecordStore, config: &BuildConfig, rng: &mut R) {
  if let Some(max) = config.max_observations {
    store.enforce_max_observations(max, rng);
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use rand::SeedableRng;
  use rand_chacha::ChaCha8Rng;
  use serde_json::Value;

  use super::*;

  fn write(dir: &Path, name: &str, body: &str) {
    fs::write(dir.join(name), body).unwrap();
  }

  fn read(path: &Path) -> Value {
    crowdset_archive::read_json(path).unwrap()
  }

  fn json_archive(dir: &Path) {
    write(
      dir,
      "observations.json",
      r#"[
        {"id": 1, "community_taxon_id": 30},
        {"id": 2, "community_taxon_id": 31},
        {"id": 3, "community_taxon_id": 30}
      ]"#,
    );
    write(
      dir,
      "observation_photos.json",
      r#"[
        {"observation_id": 1, "native_original_image_url": "http://p/1.jpg"},
        {"observation_id": 2, "native_original_image_url": "http://p/2.jpg"}
      ]"#,
    );
    write(
      dir,
      "identifications.json",
      r#"[
        {"id": 10, "observation_id": 1, "user_id": 5, "taxon_id": 30,
         "created_at": "2020-01-01 00:00:00", "current": "t"},
        {"id": 11, "observation_id": 1, "user_id": 6, "taxon_id": 40,
         "created_at": "2020-01-01 00:00:00", "current": "t"},
        {"id": 12, "observation_id": 2, "user_id": 5, "taxon_id": 31,
         "created_at": "2020-01-01 00:00:00", "current": "t"},
        {"id": 13, "observation_id": 2, "user_id": 6, "taxon_id": 31,
         "created_at": "2020-01-01 00:00:00", "current": "t"},
        {"id": 14, "observation_id": 3, "user_id": 5, "taxon_id": 30,
         "created_at": "2020-01-01 00:00:00", "current": "t"}
      ]"#,
    );
    write(
      dir,
      "taxa.json",
      r#"[
        {"id": 1, "ancestry": null, "rank_level": 30, "is_active": "t"},
        {"id": 30, "ancestry": "1", "rank_level": 10, "is_active": "t"},
        {"id": 31, "ancestry": "1", "rank_level": 10, "is_active": "t"},
        {"id": 40, "ancestry": "1/30", "rank_level": 5, "is_active": "t"}
      ]"#,
    );
    write(dir, "users.json", "[5, 6]");
  }

  #[test]
  fn json_archive_builds_three_variants() {
    let archive = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    json_archive(archive.path());

    let config = BuildConfig {
      prune_unreferenced_taxa: false,
      ..BuildConfig::default()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    run(archive.path(), output.path(), ArchiveFormat::Json, &config, &mut rng)
      .unwrap();

    let labels = read(&output.path().join(OBSERVATION_LABEL_FILE));
    // Subspecies 40 collapses onto species 30; observation 3 has one
    // identification and no photo.
    assert_eq!(labels["dataset"]["num_classes"], 2);
    assert_eq!(labels["dataset"]["inat_taxon_id_to_class_label"]["30"], 0);
    assert_eq!(labels["annos"].as_array().unwrap().len(), 4);
    assert!(labels["images"].get("3").is_none());
    assert_eq!(labels["images"]["1"]["url"], "http://p/1.jpg");

    let workers = read(&output.path().join(WORKER_SKILL_FILE));
    assert_eq!(
      workers["dataset"]["inat_taxon_id_to_class_label"],
      labels["dataset"]["inat_taxon_id_to_class_label"]
    );

    let test = read(&output.path().join(TEST_FILE));
    assert_eq!(test["annos"].as_array().unwrap().len(), 4);
  }

  #[test]
  fn csv_archive_builds_hierarchical_variants() {
    let archive = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write(
      archive.path(),
      "identifications.csv",
      "id,taxon_id,user_id,observation_id,created_at,current\n\
       1,12,u1,500,2020-01-01 10:00:00,true\n\
       2,13,u2,500,2020-01-02 10:00:00,true\n\
       3,12,u1,400,2020-01-03 10:00:00,true\n",
    );
    write(
      archive.path(),
      "taxonomy.csv",
      "parent,key,taxon_id,prob,leaf\n\
       ,0,1,1.0,0\n\
       0,3,12,0.6,1\n\
       0,4,13,0.4,1\n",
    );

    let mut rng = ChaCha8Rng::seed_from_u64(0);
    run(
      archive.path(),
      output.path(),
      ArchiveFormat::Csv,
      &BuildConfig::default(),
      &mut rng,
    )
    .unwrap();

    let labels = read(&output.path().join(OBSERVATION_LABEL_FILE));
    assert_eq!(labels["dataset"]["num_classes"], 2);
    assert_eq!(labels["dataset"]["global_class_priors"]["3"], 0.6);
    assert_eq!(labels["dataset"]["taxonomy_data"].as_array().unwrap().len(), 3);
    assert_eq!(labels["annos"][0]["anno"]["label"], "3");
    assert_eq!(labels["images"].as_object().unwrap().len(), 1);

    let test = read(&output.path().join(TEST_FILE));
    assert_eq!(test["images"].as_object().unwrap().len(), 2);

    let pretty =
      fs::read_to_string(output.path().join(WORKER_SKILL_FILE)).unwrap();
    assert!(pretty.starts_with("{\n    "));
  }

  #[test]
  fn json_archive_collapses_onto_empty_ancestry_root() {
    let archive = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write(
      archive.path(),
      "observations.json",
      r#"[{"id": 1, "community_taxon_id": 3}]"#,
    );
    write(
      archive.path(),
      "observation_photos.json",
      r#"[{"observation_id": 1, "native_original_image_url": "http://p/1.jpg"}]"#,
    );
    write(
      archive.path(),
      "identifications.json",
      r#"[
        {"id": 10, "observation_id": 1, "user_id": 5, "taxon_id": 3,
         "created_at": "2020-01-01 00:00:00", "current": "t"},
        {"id": 11, "observation_id": 1, "user_id": 6, "taxon_id": 2,
         "created_at": "2020-01-01 00:00:00", "current": "t"}
      ]"#,
    );
    write(
      archive.path(),
      "taxa.json",
      r#"[
        {"id": 1, "ancestry": "", "rank_level": 30, "is_active": "t"},
        {"id": 2, "ancestry": "1", "rank_level": 20, "is_active": "t"},
        {"id": 3, "ancestry": "1/2", "rank_level": 10, "is_active": "t"}
      ]"#,
    );
    write(archive.path(), "users.json", "[5, 6]");

    let config = BuildConfig {
      leaf_rank_level: 30.0,
      prune_unreferenced_taxa: false,
      ..BuildConfig::default()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    run(archive.path(), output.path(), ArchiveFormat::Json, &config, &mut rng)
      .unwrap();

    // Genus and species both fold into the family at the root.
    let labels = read(&output.path().join(OBSERVATION_LABEL_FILE));
    assert_eq!(labels["dataset"]["num_classes"], 1);
    assert_eq!(labels["dataset"]["inat_taxon_id_to_class_label"]["1"], 0);
    let annos = labels["annos"].as_array().unwrap();
    assert_eq!(annos.len(), 2);
    assert!(annos.iter().all(|a| a["anno"]["label"] == 0));
  }
}
