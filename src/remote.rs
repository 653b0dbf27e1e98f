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

//! The remote-session collaborator (spec §6), the engine's only
//! interface to the repository's history. Every method here blocks from
//! the engine's perspective (spec §5).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::conflict::VictimKind;
use crate::error::RemoteError;

/// A single changed-path entry in a log revision (spec §4.3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangedPathEntry {
    pub path: String,
    pub action: ChangeAction,
    pub node_kind: VictimKind,
    pub copyfrom_path: Option<String>,
    pub copyfrom_rev: Option<u64>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChangeAction {
    Added,
    Deleted,
    Modified,
    Replaced,
}

/// One revision's log data, as delivered to a [`LogHandler`] (spec §4.3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub revision: u64,
    pub author: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub message: Option<String>,
    pub changed_paths: Vec<ChangedPathEntry>,
}

/// Returned by a [`LogHandler`] to control the log walk (spec §9 Design
/// Note: "model this as a normal control-flow return from the log
/// handler ... reserve the error channel for actual failures").
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogWalkControl {
    Continue,
    Stop,
}

pub trait LogHandler {
    fn on_entry(&mut self, entry: &LogEntry) -> LogWalkControl;
}

/// A single entry of a location-segments walk (spec §4.3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocationSegment {
    pub path_at_start: String,
    pub range_start: u64,
    pub range_end: u64,
}

pub trait LocationSegmentHandler {
    fn on_segment(&mut self, segment: &LocationSegment);
}

/// The read-only repository-history interface (spec §6).
pub trait RemoteSession {
    fn check_path(&self, relpath: &str, rev: u64) -> Result<VictimKind, RemoteError>;

    fn get_file(&self, relpath: &str, rev: u64) -> Result<(Vec<u8>, BTreeMap<String, String>), RemoteError>;

    /// Walks the log for `paths` between `start` and `end`, calling
    /// `handler` for each entry until it returns [`LogWalkControl::Stop`]
    /// or the range is exhausted.
    fn get_log(
        &self,
        paths: &[String],
        start: u64,
        end: u64,
        limit: Option<u32>,
        need_changed_paths: bool,
        handler: &mut dyn LogHandler,
    ) -> Result<(), RemoteError>;

    fn get_deleted_rev(&self, path: &str, start: u64, end: u64) -> Result<u64, RemoteError>;

    fn get_location_segments(
        &self,
        path: &str,
        peg: u64,
        start: u64,
        end: u64,
        handler: &mut dyn LocationSegmentHandler,
    ) -> Result<(), RemoteError>;

    fn rev_prop(&self, rev: u64, name: &str) -> Result<Option<String>, RemoteError>;

    fn get_latest_revnum(&self) -> Result<u64, RemoteError>;
}

/// An in-memory [`RemoteSession`] for tests, in the spirit of `jj-lib`'s
/// hand-written fakes over generated mocks.
#[derive(Default)]
pub struct FakeRemoteSession {
    pub revisions: BTreeMap<u64, LogEntry>,
    pub files: BTreeMap<(String, u64), (Vec<u8>, BTreeMap<String, String>)>,
    pub kinds: BTreeMap<(String, u64), VictimKind>,
    pub latest: u64,
}

impl FakeRemoteSession {
    pub fn new() -> Self {
        FakeRemoteSession::default()
    }

    pub fn add_revision(&mut self, entry: LogEntry) {
        self.latest = self.latest.max(entry.revision);
        self.revisions.insert(entry.revision, entry);
    }
}

impl RemoteSession for FakeRemoteSession {
    fn check_path(&self, relpath: &str, rev: u64) -> Result<VictimKind, RemoteError> {
        Ok(self
            .kinds
            .get(&(relpath.to_owned(), rev))
            .copied()
            .unwrap_or(VictimKind::None))
    }

    fn get_file(&self, relpath: &str, rev: u64) -> Result<(Vec<u8>, BTreeMap<String, String>), RemoteError> {
        self.files
            .get(&(relpath.to_owned(), rev))
            .cloned()
            .ok_or_else(|| RemoteError::PathNotFound(relpath.to_owned()))
    }

    fn get_log(
        &self,
        paths: &[String],
        start: u64,
        end: u64,
        limit: Option<u32>,
        _need_changed_paths: bool,
        handler: &mut dyn LogHandler,
    ) -> Result<(), RemoteError> {
        let (lo, hi) = (start.min(end), start.max(end));
        let mut seen = 0u32;
        for (_, entry) in self.revisions.range(lo..=hi) {
            if !paths.is_empty()
                && !entry
                    .changed_paths
                    .iter()
                    .any(|cp| paths.iter().any(|p| cp.path == *p || cp.path.starts_with(&format!("{p}/"))))
            {
                continue;
            }
            if handler.on_entry(entry) == LogWalkControl::Stop {
                return Ok(());
            }
            seen += 1;
            if let Some(limit) = limit {
                if seen >= limit {
                    break;
                }
            }
        }
        Ok(())
    }

    fn get_deleted_rev(&self, path: &str, start: u64, end: u64) -> Result<u64, RemoteError> {
        let (lo, hi) = (start.min(end), start.max(end));
        for (rev, entry) in self.revisions.range(lo..=hi) {
            if entry
                .changed_paths
                .iter()
                .any(|cp| cp.path == path && matches!(cp.action, ChangeAction::Deleted | ChangeAction::Replaced))
            {
                return Ok(*rev);
            }
        }
        Err(RemoteError::PathNotFound(path.to_owned()))
    }

    fn get_location_segments(
        &self,
        path: &str,
        _peg: u64,
        start: u64,
        end: u64,
        handler: &mut dyn LocationSegmentHandler,
    ) -> Result<(), RemoteError> {
        handler.on_segment(&LocationSegment {
            path_at_start: path.to_owned(),
            range_start: start,
            range_end: end,
        });
        Ok(())
    }

    fn rev_prop(&self, rev: u64, name: &str) -> Result<Option<String>, RemoteError> {
        let entry = self.revisions.get(&rev);
        Ok(match name {
            "svn:author" => entry.and_then(|e| e.author.clone()),
            "svn:log" => entry.and_then(|e| e.message.clone()),
            _ => None,
        })
    }

    fn get_latest_revnum(&self) -> Result<u64, RemoteError> {
        Ok(self.latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CollectingHandler {
        revisions: Vec<u64>,
    }

    impl LogHandler for CollectingHandler {
        fn on_entry(&mut self, entry: &LogEntry) -> LogWalkControl {
            self.revisions.push(entry.revision);
            LogWalkControl::Continue
        }
    }

    #[test]
    fn test_get_log_filters_by_path_and_range() {
        let mut remote = FakeRemoteSession::new();
        remote.add_revision(LogEntry {
            revision: 10,
            author: Some("jrandom".to_owned()),
            date: None,
            message: None,
            changed_paths: vec![ChangedPathEntry {
                path: "trunk/a.c".to_owned(),
                action: ChangeAction::Modified,
                node_kind: VictimKind::File,
                copyfrom_path: None,
                copyfrom_rev: None,
            }],
        });
        remote.add_revision(LogEntry {
            revision: 20,
            author: Some("jrandom".to_owned()),
            date: None,
            message: None,
            changed_paths: vec![ChangedPathEntry {
                path: "trunk/b.c".to_owned(),
                action: ChangeAction::Modified,
                node_kind: VictimKind::File,
                copyfrom_path: None,
                copyfrom_rev: None,
            }],
        });

        let mut handler = CollectingHandler { revisions: vec![] };
        remote
            .get_log(&["trunk/a.c".to_owned()], 0, 30, None, true, &mut handler)
            .unwrap();
        assert_eq!(handler.revisions, vec![10]);
    }

    #[test]
    fn test_get_log_stop_control_halts_walk() {
        let mut remote = FakeRemoteSession::new();
        for rev in [5, 10, 15] {
            remote.add_revision(LogEntry {
                revision: rev,
                author: None,
                date: None,
                message: None,
                changed_paths: vec![],
            });
        }
        struct StopAtFirst {
            seen: Vec<u64>,
        }
        impl LogHandler for StopAtFirst {
            fn on_entry(&mut self, entry: &LogEntry) -> LogWalkControl {
                self.seen.push(entry.revision);
                LogWalkControl::Stop
            }
        }
        let mut handler = StopAtFirst { seen: vec![] };
        remote.get_log(&[], 0, 20, None, false, &mut handler).unwrap();
        assert_eq!(handler.seen, vec![5]);
    }

    #[test]
    fn test_get_deleted_rev_finds_delete_action() {
        let mut remote = FakeRemoteSession::new();
        remote.add_revision(LogEntry {
            revision: 150,
            author: Some("jrandom".to_owned()),
            date: None,
            message: None,
            changed_paths: vec![ChangedPathEntry {
                path: "trunk/a.c".to_owned(),
                action: ChangeAction::Deleted,
                node_kind: VictimKind::File,
                copyfrom_path: None,
                copyfrom_rev: None,
            }],
        });
        assert_eq!(remote.get_deleted_rev("trunk/a.c", 100, 200).unwrap(), 150);
    }
}
