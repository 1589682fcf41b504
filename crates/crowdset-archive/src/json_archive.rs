//! The JSON archive: one array per collection.

use std::{fs::File, io::BufReader, path::Path};

use crowdset_core::{
  UserId,
  record::{
    Identification, Observation, ObservationPhoto, RawRecords, RawTaxon, User,
  },
};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::info;

use crate::{Error, Result};

pub(crate) const OBSERVATIONS: &str = "observations.json";
const PHOTOS: &str = "observation_photos.json";
const IDENTIFICATIONS: &str = "identifications.json";
const TAXA: &str = "taxa.json";
const USERS: &str = "users.json";

/// Entries of `users.json` are either user objects or bare ids.
#[derive(Deserialize)]
#[serde(untagged)]
enum UserEntry {
  Record(User),
  Id(UserId),
}

impl From<UserEntry> for User {
  fn from(entry: UserEntry) -> Self {
    match entry {
      UserEntry::Record(user) => user,
      UserEntry::Id(id) => User { id },
    }
  }
}

/// Load a JSON archive from `dir`. Every one of the five files must exist.
pub fn load_json_archive(dir: &Path) -> Result<RawRecords> {
  let observations: Vec<Observation> = read_json(&dir.join(OBSERVATIONS))?;
  let photos: Vec<ObservationPhoto> = read_json(&dir.join(PHOTOS))?;
  let identifications: Vec<Identification> =
    read_json(&dir.join(IDENTIFICATIONS))?;
  let taxa: Vec<RawTaxon> = read_json(&dir.join(TAXA))?;
  let users: Vec<UserEntry> = read_json(&dir.join(USERS))?;

  info!(
    archive = %dir.display(),
    observations = observations.len(),
    photos = photos.len(),
    identifications = identifications.len(),
    taxa = taxa.len(),
    users = users.len(),
    "loaded JSON archive"
  );

  Ok(RawRecords {
    observations,
    photos,
    identifications,
    taxa,
    users: users.into_iter().map(User::from).collect(),
  })
}

/// Deserialize the JSON document at `path`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
  let file = File::open(path).map_err(Error::io(path))?;
  serde_json::from_reader(BufReader::new(file)).map_err(Error::json(path))
}
