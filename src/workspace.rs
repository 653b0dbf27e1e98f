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

//! The working-copy collaborator (spec §6). Owns node kind/base/actual
//! queries, the conflict-record store, and the single write-lock
//! primitive the resolution executor (§4.6) serialises through.

use std::collections::BTreeMap;

use crate::conflict::{ConflictDescriptor, VictimKind};
use crate::error::WorkspaceError;
use crate::repo_path::AbsPath;

/// The workspace's raw conflict-choice enum (spec §4.6's side-effect
/// table): `conflict_text_mark_resolved`/`conflict_prop_mark_resolved`
/// take one of these, not a [`crate::options::ResolutionOptionId`]
/// directly, since a single option id maps onto this smaller vocabulary.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConflictChoice {
    Base,
    TheirsFull,
    MineFull,
    TheirsConflict,
    MineConflict,
    Merged,
}

/// Node status relevant to modification detection (spec §4.7: "a path is
/// considered modified if its status is anything other than `none`,
/// `unversioned`, or `normal`, or if it is marked conflicted").
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeStatus {
    None,
    Unversioned,
    Normal,
    Modified,
    Conflicted,
    Added,
    Deleted,
    Missing,
}

impl NodeStatus {
    pub fn is_modified(self) -> bool {
        !matches!(self, NodeStatus::None | NodeStatus::Unversioned | NodeStatus::Normal)
    }
}

/// An opaque handle identifying a held write lock (spec §6:
/// `acquire_write_lock_for_resolve(path) -> lock_abspath`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteLockHandle(pub AbsPath);

/// The working-copy interface consumed by the engine (spec §6).
pub trait Workspace {
    fn read_kind(&self, path: &AbsPath, show_hidden: bool) -> Result<VictimKind, WorkspaceError>;

    fn get_pristine_contents(&self, path: &AbsPath) -> Result<Vec<u8>, WorkspaceError>;

    fn get_pristine_props(&self, path: &AbsPath) -> Result<BTreeMap<String, String>, WorkspaceError>;

    fn prop_list(&self, path: &AbsPath) -> Result<BTreeMap<String, String>, WorkspaceError>;

    fn get_children_of_working_node(&self, path: &AbsPath, show_hidden: bool) -> Result<Vec<AbsPath>, WorkspaceError>;

    fn get_base_children(&self, path: &AbsPath, show_hidden: bool) -> Result<Vec<AbsPath>, WorkspaceError>;

    fn node_was_moved_away(&self, path: &AbsPath) -> Result<Option<AbsPath>, WorkspaceError>;

    fn node_was_moved_here(&self, path: &AbsPath) -> Result<Option<AbsPath>, WorkspaceError>;

    fn get_wcroot(&self, path: &AbsPath) -> Result<AbsPath, WorkspaceError>;

    fn get_repos_info(&self, path: &AbsPath) -> Result<(String, String, String), WorkspaceError>;

    fn acquire_write_lock_for_resolve(&self, path: &AbsPath) -> Result<WriteLockHandle, WorkspaceError>;

    fn release_write_lock(&self, lock: WriteLockHandle) -> Result<(), WorkspaceError>;

    fn conflict_text_mark_resolved(&self, path: &AbsPath, choice: ConflictChoice) -> Result<(), WorkspaceError>;

    fn conflict_prop_mark_resolved(
        &self,
        path: &AbsPath,
        propname: &str,
        choice: ConflictChoice,
    ) -> Result<(), WorkspaceError>;

    fn del_tree_conflict(&self, path: &AbsPath) -> Result<(), WorkspaceError>;

    fn tree_update_break_moved_away(&self, path: &AbsPath) -> Result<(), WorkspaceError>;

    fn tree_update_raise_moved_away(&self, path: &AbsPath) -> Result<(), WorkspaceError>;

    fn tree_update_moved_away_node(&self, path: &AbsPath) -> Result<(), WorkspaceError>;

    fn delete(&self, path: &AbsPath) -> Result<(), WorkspaceError>;

    fn add_repos_file(
        &self,
        path: &AbsPath,
        contents: &[u8],
        props: &BTreeMap<String, String>,
        source_url: &str,
        source_rev: u64,
    ) -> Result<(), WorkspaceError>;

    fn merge_text(&self, path: &AbsPath, base: &[u8], left: &[u8], right: &[u8]) -> Result<Vec<u8>, WorkspaceError>;

    /// Reads the raw conflict records for `path` (spec §4.1: "read all raw
    /// conflict descriptors for that path"), in workspace-assigned order.
    fn read_conflict_descriptions(&self, path: &AbsPath) -> Result<Vec<ConflictDescriptor>, WorkspaceError>;

    fn status(&self, path: &AbsPath) -> Result<NodeStatus, WorkspaceError>;
}

/// An in-memory [`Workspace`] double for tests, following `jj-lib`'s
/// fake-over-mock convention.
#[derive(Default)]
pub struct FakeWorkspace {
    pub kinds: BTreeMap<AbsPath, VictimKind>,
    pub pristine_contents: BTreeMap<AbsPath, Vec<u8>>,
    pub props: BTreeMap<AbsPath, BTreeMap<String, String>>,
    pub children: BTreeMap<AbsPath, Vec<AbsPath>>,
    pub moved_away: BTreeMap<AbsPath, AbsPath>,
    pub moved_here: BTreeMap<AbsPath, AbsPath>,
    pub wcroot: AbsPath,
    pub statuses: BTreeMap<AbsPath, NodeStatus>,
    pub resolved_text: Vec<(AbsPath, ConflictChoice)>,
    pub resolved_props: Vec<(AbsPath, String, ConflictChoice)>,
    pub deleted_tree_conflicts: Vec<AbsPath>,
    pub deleted_paths: Vec<AbsPath>,
    pub added_repos_files: Vec<AbsPath>,
    pub lock_held: Option<AbsPath>,
    pub fail_next_release: bool,
    pub conflict_descriptions: BTreeMap<AbsPath, Vec<ConflictDescriptor>>,
    pub unversioned_paths: Vec<AbsPath>,
}

impl FakeWorkspace {
    pub fn new() -> Self {
        FakeWorkspace {
            wcroot: AbsPath::root(),
            ..Default::default()
        }
    }
}

impl Workspace for FakeWorkspace {
    fn read_kind(&self, path: &AbsPath, _show_hidden: bool) -> Result<VictimKind, WorkspaceError> {
        self.kinds
            .get(path)
            .copied()
            .ok_or_else(|| WorkspaceError::PathNotFound(path.as_str().into()))
    }

    fn get_pristine_contents(&self, path: &AbsPath) -> Result<Vec<u8>, WorkspaceError> {
        self.pristine_contents
            .get(path)
            .cloned()
            .ok_or_else(|| WorkspaceError::PathNotFound(path.as_str().into()))
    }

    fn get_pristine_props(&self, path: &AbsPath) -> Result<BTreeMap<String, String>, WorkspaceError> {
        Ok(self.props.get(path).cloned().unwrap_or_default())
    }

    fn prop_list(&self, path: &AbsPath) -> Result<BTreeMap<String, String>, WorkspaceError> {
        Ok(self.props.get(path).cloned().unwrap_or_default())
    }

    fn get_children_of_working_node(&self, path: &AbsPath, _show_hidden: bool) -> Result<Vec<AbsPath>, WorkspaceError> {
        Ok(self.children.get(path).cloned().unwrap_or_default())
    }

    fn get_base_children(&self, path: &AbsPath, _show_hidden: bool) -> Result<Vec<AbsPath>, WorkspaceError> {
        Ok(self.children.get(path).cloned().unwrap_or_default())
    }

    fn node_was_moved_away(&self, path: &AbsPath) -> Result<Option<AbsPath>, WorkspaceError> {
        Ok(self.moved_away.get(path).cloned())
    }

    fn node_was_moved_here(&self, path: &AbsPath) -> Result<Option<AbsPath>, WorkspaceError> {
        Ok(self.moved_here.get(path).cloned())
    }

    fn get_wcroot(&self, _path: &AbsPath) -> Result<AbsPath, WorkspaceError> {
        Ok(self.wcroot.clone())
    }

    fn get_repos_info(&self, path: &AbsPath) -> Result<(String, String, String), WorkspaceError> {
        Ok(("file:///repo".into(), "uuid".into(), path.as_str().trim_start_matches('/').into()))
    }

    fn acquire_write_lock_for_resolve(&self, path: &AbsPath) -> Result<WriteLockHandle, WorkspaceError> {
        if self.lock_held.is_some() {
            return Err(WorkspaceError::WorkspaceLocked(path.as_str().into()));
        }
        Ok(WriteLockHandle(path.clone()))
    }

    fn release_write_lock(&self, _lock: WriteLockHandle) -> Result<(), WorkspaceError> {
        if self.fail_next_release {
            return Err(WorkspaceError::WorkspaceCorrupt("lock release failed".into()));
        }
        Ok(())
    }

    fn conflict_text_mark_resolved(&self, _path: &AbsPath, _choice: ConflictChoice) -> Result<(), WorkspaceError> {
        Ok(())
    }

    fn conflict_prop_mark_resolved(
        &self,
        _path: &AbsPath,
        _propname: &str,
        _choice: ConflictChoice,
    ) -> Result<(), WorkspaceError> {
        Ok(())
    }

    fn del_tree_conflict(&self, _path: &AbsPath) -> Result<(), WorkspaceError> {
        Ok(())
    }

    fn tree_update_break_moved_away(&self, _path: &AbsPath) -> Result<(), WorkspaceError> {
        Ok(())
    }

    fn tree_update_raise_moved_away(&self, _path: &AbsPath) -> Result<(), WorkspaceError> {
        Ok(())
    }

    fn tree_update_moved_away_node(&self, _path: &AbsPath) -> Result<(), WorkspaceError> {
        Ok(())
    }

    fn delete(&self, _path: &AbsPath) -> Result<(), WorkspaceError> {
        Ok(())
    }

    fn add_repos_file(
        &self,
        _path: &AbsPath,
        _contents: &[u8],
        _props: &BTreeMap<String, String>,
        _source_url: &str,
        _source_rev: u64,
    ) -> Result<(), WorkspaceError> {
        Ok(())
    }

    fn merge_text(&self, _path: &AbsPath, _base: &[u8], _left: &[u8], right: &[u8]) -> Result<Vec<u8>, WorkspaceError> {
        Ok(right.to_vec())
    }

    fn read_conflict_descriptions(&self, path: &AbsPath) -> Result<Vec<ConflictDescriptor>, WorkspaceError> {
        if self.unversioned_paths.contains(path) {
            return Err(WorkspaceError::PathNotVersioned(path.as_str().into()));
        }
        Ok(self.conflict_descriptions.get(path).cloned().unwrap_or_default())
    }

    fn status(&self, path: &AbsPath) -> Result<NodeStatus, WorkspaceError> {
        Ok(self.statuses.get(path).copied().unwrap_or(NodeStatus::None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_status_modified_classification() {
        assert!(!NodeStatus::None.is_modified());
        assert!(!NodeStatus::Unversioned.is_modified());
        assert!(!NodeStatus::Normal.is_modified());
        assert!(NodeStatus::Modified.is_modified());
        assert!(NodeStatus::Conflicted.is_modified());
    }

    #[test]
    fn test_fake_workspace_rejects_double_lock() {
        let mut ws = FakeWorkspace::new();
        let path = AbsPath::normalize("/trunk/a.c");
        let lock = ws.acquire_write_lock_for_resolve(&path).unwrap();
        ws.lock_held = Some(path.clone());
        assert!(ws.acquire_write_lock_for_resolve(&path).is_err());
        ws.release_write_lock(lock).unwrap();
    }
}
