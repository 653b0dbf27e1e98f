// Copyright 2026 The Jujutsu Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Component G: the shelf/checkpoint store (spec §4.7).
//!
//! A shelf is a named, versioned sequence of patches over a workspace.
//! Since the diff/patch generator is out of scope (spec §1), a "patch"
//! here is the pair of raw content snapshots either side of the local
//! modification: `before` (the workspace's pristine content at save
//! time) and `after` (the on-disk working content at save time).
//! `unapply` restores `before`; `apply` restores `after`. This reproduces
//! the observable save/unapply/apply contract of spec §8 S8 without
//! computing a textual diff.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write as _;
use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::lock::{FileLock, FileLockError};
use crate::repo_path::AbsPath;
use crate::workspace::Workspace;

/// Writes `bytes` to `path` via a same-directory temp file and rename, so a
/// concurrent reader never observes a partially written shelf file.
///
/// Unlike [`crate::file_util::persist_content_addressed_temp_file`], shelf
/// metadata and patch files are mutable (the same `meta.json`/`v{N}.json`
/// path is rewritten on every save), so an existing target must be
/// overwritten rather than assumed to already hold the intended content.
fn write_atomic(dir: &std::path::Path, path: &std::path::Path, bytes: &[u8]) -> ShelfResult<()> {
    fs::create_dir_all(dir)?;
    let mut temp_file = NamedTempFile::new_in(dir)?;
    temp_file.write_all(bytes)?;
    if let Err(err) = temp_file.persist(path) {
        // `persist` fails on platforms where rename cannot replace an
        // existing file; remove the stale target and retry once.
        fs::remove_file(path)?;
        err.file.persist(path).map_err(|e| e.error)?;
    }
    Ok(())
}

/// Errors from the shelf store (SPEC_FULL S3/spec §4.7).
#[derive(Debug, Error)]
pub enum ShelfError {
    #[error("shelf '{0}' has no log message set; set one before saving")]
    MissingLogMessage(String),
    #[error("cannot apply: the following paths have local modifications: {0:?}")]
    PathsModified(Vec<AbsPath>),
    #[error("version {0} is not the shelf's top version; only the top version may be dropped")]
    CannotDropNonTopVersion(u32),
    #[error("shelf '{0}' still has {1} version(s); finish requires every version dropped or squashed away")]
    NotFullyDrained(String, u32),
    #[error("shelf '{0}' has no version {1}")]
    VersionNotFound(String, u32),
    #[error(transparent)]
    Workspace(#[from] crate::error::WorkspaceError),
    #[error(transparent)]
    Lock(#[from] FileLockError),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type ShelfResult<T> = Result<T, ShelfError>;

/// A single path's content either side of a save (spec §4.7).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct FileSnapshot {
    /// `None` if the path did not exist in this state.
    before: Option<Vec<u8>>,
    after: Option<Vec<u8>>,
}

/// One shelf-version: a patch file (the snapshot map) plus mtime
/// (spec §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
struct ShelfVersionRecord {
    version: u32,
    snapshots: BTreeMap<String, FileSnapshot>,
    #[serde(with = "mtime_secs")]
    mtime: SystemTime,
}

mod mtime_secs {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
        let secs = value.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
        secs.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SystemTime, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::from_secs(secs))
    }
}

/// Named, versioned bundle in a workspace (spec §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Shelf {
    pub name: String,
    pub max_version: u32,
    pub wc_root_abspath: PathBuf,
    pub revprops: BTreeMap<String, String>,
}

/// One entry of [`ShelfStore::log`] (SPEC_FULL S3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShelfVersionLogEntry {
    pub version: u32,
    pub log_message: Option<String>,
    pub mtime: SystemTime,
}

/// Persists shelves under `root`, one subdirectory per shelf name, using
/// an advisory [`FileLock`] to serialise concurrent writers (spec §5:
/// workspace state changes are serialised; the shelf store applies the
/// same discipline to its own directory).
pub struct ShelfStore {
    root: PathBuf,
}

impl ShelfStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ShelfStore { root: root.into() }
    }

    fn shelf_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn meta_path(&self, name: &str) -> PathBuf {
        self.shelf_dir(name).join("meta.json")
    }

    fn version_path(&self, name: &str, version: u32) -> PathBuf {
        self.shelf_dir(name).join(format!("v{version}.json"))
    }

    fn lock_path(&self, name: &str) -> PathBuf {
        self.shelf_dir(name).join(".lock")
    }

    /// `init` (SPEC_FULL S3): creates an empty checkpoint series.
    #[instrument(skip(self, wc_root_abspath))]
    pub fn init(&self, name: &str, wc_root_abspath: impl Into<PathBuf>) -> ShelfResult<Shelf> {
        fs::create_dir_all(self.shelf_dir(name))?;
        let shelf = Shelf {
            name: name.to_owned(),
            max_version: 0,
            wc_root_abspath: wc_root_abspath.into(),
            revprops: BTreeMap::new(),
        };
        self.write_meta(&shelf)?;
        Ok(shelf)
    }

    pub fn open(&self, name: &str) -> ShelfResult<Shelf> {
        let bytes = fs::read(self.meta_path(name))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write_meta(&self, shelf: &Shelf) -> ShelfResult<()> {
        let bytes = serde_json::to_vec_pretty(shelf)?;
        write_atomic(&self.shelf_dir(&shelf.name), &self.meta_path(&shelf.name), &bytes)
    }

    /// Sets a revprop (notably `svn:log`), required before [`Self::save_new_version`]
    /// will succeed (spec §4.7).
    pub fn set_revprop(&self, shelf: &mut Shelf, name: &str, value: &str) -> ShelfResult<()> {
        shelf.revprops.insert(name.to_owned(), value.to_owned());
        self.write_meta(shelf)
    }

    /// Captures current local modifications under `paths`, producing
    /// patch version `max_version + 1` (spec §4.7). Aborts if no log
    /// message has been set.
    #[instrument(skip(self, workspace, paths))]
    pub fn save_new_version(&self, shelf: &mut Shelf, workspace: &dyn Workspace, paths: &[AbsPath]) -> ShelfResult<u32> {
        if shelf.revprops.get("svn:log").is_none_or(String::is_empty) {
            return Err(ShelfError::MissingLogMessage(shelf.name.clone()));
        }

        let _lock = FileLock::lock(self.lock_path(&shelf.name))?;

        let mut snapshots = BTreeMap::new();
        for path in paths {
            let before = workspace.get_pristine_contents(path).ok();
            let after = fs::read(self.working_path(shelf, path)).ok();
            snapshots.insert(path.as_str().to_owned(), FileSnapshot { before, after });
        }

        let version = shelf.max_version + 1;
        let record = ShelfVersionRecord {
            version,
            snapshots,
            mtime: SystemTime::now(),
        };
        let bytes = serde_json::to_vec_pretty(&record)?;
        write_atomic(&self.shelf_dir(&shelf.name), &self.version_path(&shelf.name, version), &bytes)?;

        shelf.max_version = version;
        self.write_meta(shelf)?;
        Ok(version)
    }

    fn working_path(&self, shelf: &Shelf, path: &AbsPath) -> PathBuf {
        shelf.wc_root_abspath.join(path.as_str().trim_start_matches('/'))
    }

    fn read_version(&self, shelf: &Shelf, version: u32) -> ShelfResult<ShelfVersionRecord> {
        let bytes = fs::read(self.version_path(&shelf.name, version))
            .map_err(|_| ShelfError::VersionNotFound(shelf.name.clone(), version))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn restore(&self, shelf: &Shelf, record: &ShelfVersionRecord, side: impl Fn(&FileSnapshot) -> &Option<Vec<u8>>) -> ShelfResult<()> {
        for (path_str, snapshot) in &record.snapshots {
            let path = AbsPath::from(path_str.as_str());
            let target = self.working_path(shelf, &path);
            match side(snapshot) {
                Some(contents) => {
                    if let Some(parent) = target.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::write(&target, contents)?;
                }
                None => {
                    let _ = fs::remove_file(&target);
                }
            }
        }
        Ok(())
    }

    /// Reverse-applies `version` to the working tree (spec §4.7): every
    /// touched path returns to its pre-save (`before`) content.
    #[instrument(skip(self))]
    pub fn unapply(&self, shelf: &Shelf, version: u32) -> ShelfResult<()> {
        let record = self.read_version(shelf, version)?;
        self.restore(shelf, &record, |s| &s.before)
    }

    /// Forward-applies `version` to the working tree (spec §4.7), after
    /// verifying every touched path is currently unmodified (spec §4.7:
    /// "a status walk filtered to those paths; modification detection
    /// uses the same predicate as §4.2").
    #[instrument(skip(self, workspace))]
    pub fn apply(&self, shelf: &Shelf, workspace: &dyn Workspace, version: u32) -> ShelfResult<()> {
        let record = self.read_version(shelf, version)?;
        let mut modified = Vec::new();
        for path_str in record.snapshots.keys() {
            let path = AbsPath::from(path_str.as_str());
            if workspace.status(&path)?.is_modified() {
                modified.push(path);
            }
        }
        if !modified.is_empty() {
            return Err(ShelfError::PathsModified(modified));
        }
        self.restore(shelf, &record, |s| &s.after)
    }

    /// Prunes versions strictly greater than `v` (spec §4.7). This is
    /// destructive of later versions (DESIGN.md Open Question decision).
    #[instrument(skip(self))]
    pub fn set_current_version(&self, shelf: &mut Shelf, v: u32) -> ShelfResult<()> {
        for version in (v + 1)..=shelf.max_version {
            let _ = fs::remove_file(self.version_path(&shelf.name, version));
        }
        shelf.max_version = v;
        self.write_meta(shelf)
    }

    /// Folds every version into one and resets `max_version` to 1 (spec
    /// §4.7): `before` is version 1's baseline, `after` is the most
    /// recent snapshot of each touched path across all versions.
    #[instrument(skip(self))]
    pub fn squash(&self, shelf: &mut Shelf) -> ShelfResult<()> {
        if shelf.max_version <= 1 {
            return Ok(());
        }
        let first = self.read_version(shelf, 1)?;
        let mut merged: BTreeMap<String, FileSnapshot> = first.snapshots.clone();
        for version in 2..=shelf.max_version {
            let record = self.read_version(shelf, version)?;
            for (path, snapshot) in record.snapshots {
                merged
                    .entry(path)
                    .and_modify(|existing| existing.after = snapshot.after.clone())
                    .or_insert(snapshot);
            }
        }

        let squashed = ShelfVersionRecord {
            version: 1,
            snapshots: merged,
            mtime: SystemTime::now(),
        };
        let bytes = serde_json::to_vec_pretty(&squashed)?;
        write_atomic(&self.shelf_dir(&shelf.name), &self.version_path(&shelf.name, 1), &bytes)?;

        for version in 2..=shelf.max_version {
            let _ = fs::remove_file(self.version_path(&shelf.name, version));
        }
        shelf.max_version = 1;
        self.write_meta(shelf)
    }

    /// Deletes `version`; only the shelf's current top version may be
    /// dropped, keeping version numbers contiguous.
    #[instrument(skip(self))]
    pub fn drop_version(&self, shelf: &mut Shelf, version: u32) -> ShelfResult<()> {
        if version != shelf.max_version {
            return Err(ShelfError::CannotDropNonTopVersion(version));
        }
        fs::remove_file(self.version_path(&shelf.name, version))?;
        shelf.max_version -= 1;
        self.write_meta(shelf)
    }

    /// `finish` (SPEC_FULL S3): tears down the shelf's on-disk directory
    /// once every version is dropped or squashed away.
    #[instrument(skip(self))]
    pub fn finish(&self, shelf: &Shelf) -> ShelfResult<()> {
        if shelf.max_version != 0 {
            return Err(ShelfError::NotFullyDrained(shelf.name.clone(), shelf.max_version));
        }
        fs::remove_dir_all(self.shelf_dir(&shelf.name))?;
        Ok(())
    }

    /// Enumerates shelves sorted by mtime ascending (spec §4.7).
    pub fn list(&self) -> ShelfResult<Vec<String>> {
        let mut entries: Vec<(SystemTime, String)> = Vec::new();
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let meta_path = entry.path().join("meta.json");
            if let Ok(metadata) = fs::metadata(&meta_path) {
                let mtime = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                entries.push((mtime, entry.file_name().to_string_lossy().into_owned()));
            }
        }
        entries.sort_by_key(|(mtime, _)| *mtime);
        Ok(entries.into_iter().map(|(_, name)| name).collect())
    }

    /// Enumerates `shelf`'s versions with stored log message and mtime
    /// (SPEC_FULL S3's `Shelf::log`, behind `shelf log`).
    pub fn log(&self, shelf: &Shelf) -> ShelfResult<Vec<ShelfVersionLogEntry>> {
        let mut entries = Vec::new();
        for version in 1..=shelf.max_version {
            let record = self.read_version(shelf, version)?;
            entries.push(ShelfVersionLogEntry {
                version,
                log_message: shelf.revprops.get("svn:log").cloned(),
                mtime: record.mtime,
            });
        }
        debug!(shelf = shelf.name, count = entries.len(), "enumerated shelf versions");
        Ok(entries)
    }
}
