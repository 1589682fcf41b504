//! The `skills` subcommand: most- and least-skilled worker per taxonomy
//! node, from per-worker skills produced by the downstream model.

use std::path::Path;

use anyhow::Context;
use crowdset_archive::{ArchiveFormat, load_archive, read_json, write_json};
use crowdset_store::{
  LoadOptions, RecordStore,
  skill::{WorkerSkills, children_of, summarize_skills},
};
use tracing::info;

/// Summarise `skills_path` over the taxonomy of the CSV archive in
/// `archive_dir` and write the result to `output`.
pub fn run(archive_dir: &Path, skills_path: &Path, output: &Path) -> anyhow::Result<()> {
  let raw = load_archive(archive_dir, ArchiveFormat::Csv)
    .context("failed to load CSV archive")?;
  let store = RecordStore::load(raw, LoadOptions::flattened_taxonomy())
    .context("failed to load taxonomy")?;
  let skills: WorkerSkills = read_json(skills_path)
    .with_context(|| format!("failed to read worker skills from {skills_path:?}"))?;

  let summary = summarize_skills(&store.skill_nodes(), &skills);
  info!(
    nodes = summary.len(),
    roots = children_of(&summary, None).count(),
    workers = skills.len(),
    "summarised worker skills"
  );

  write_json(output, &summary, true)
    .with_context(|| format!("failed to write {output:?}"))
}
