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

//! Component F: the resolution executor (spec §4.6).
//!
//! Every option's resolver obeys the same envelope: acquire the
//! workspace write lock, perform side effects, release the lock (even on
//! error, via a compose-on-unwind pattern mirroring `jj-lib`'s
//! `lock/fallback.rs` `Drop`-based unlock), bump mtimes, then update the
//! conflict's resolution fields.

use std::thread;
use std::time::Duration;

use tracing::instrument;

use crate::conflict::{Conflict, IncomingChange, LocalChange};
use crate::detail::ResolvedLocator;
use crate::error::{EngineError, EngineResult, OptionNotApplicableError};
use crate::options::{applicable_options, ResolutionOptionId};
use crate::remote::RemoteSession;
use crate::repo_path::AbsPath;
use crate::workspace::{ConflictChoice, WriteLockHandle, Workspace};

/// Tunable policy knobs the spec leaves implicit (SPEC_FULL S2):
/// the log-walk page size used by the deleted-rev scanner and
/// incoming-edit walk, and the mtime-bump sleep quantum of §4.6 step 3.
#[derive(Copy, Clone, Debug)]
pub struct EngineConfig {
    pub log_walk_page_size: u32,
    pub mtime_bump_sleep: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            log_walk_page_size: 1000,
            mtime_bump_sleep: Duration::from_millis(1),
        }
    }
}

fn choice_for_text_option(option: ResolutionOptionId) -> Option<ConflictChoice> {
    match option {
        ResolutionOptionId::BaseText => Some(ConflictChoice::Base),
        ResolutionOptionId::IncomingText => Some(ConflictChoice::TheirsFull),
        ResolutionOptionId::WorkingText => Some(ConflictChoice::MineFull),
        ResolutionOptionId::IncomingTextWhereConflicted => Some(ConflictChoice::TheirsConflict),
        ResolutionOptionId::WorkingTextWhereConflicted => Some(ConflictChoice::MineConflict),
        ResolutionOptionId::MergedText => Some(ConflictChoice::Merged),
        _ => None,
    }
}

/// Runs `body` under the workspace write lock rooted at `path`, always
/// releasing the lock on the way out and composing a release failure
/// with any error `body` produced (spec §7: "the write lock is *always*
/// released on all exit paths; a resolver that fails mid-way returns an
/// error that is the composition of the primary error and any
/// lock-release error").
#[instrument(skip(workspace, body))]
fn with_write_lock<T>(
    workspace: &dyn Workspace,
    config: &EngineConfig,
    path: &AbsPath,
    body: impl FnOnce() -> EngineResult<T>,
) -> EngineResult<T> {
    let lock = workspace.acquire_write_lock_for_resolve(path)?;
    let result = body();
    let release_result = release_lock(workspace, config, lock);
    match (result, release_result) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(release_err)) => Err(release_err),
        (Err(primary), Ok(())) => Err(primary),
        (Err(primary), Err(release_err)) => Err(EngineError::ResolverFailedAndLockReleaseFailed {
            primary: Box::new(primary),
            lock_release: Box::new(release_err),
        }),
    }
}

fn release_lock(workspace: &dyn Workspace, config: &EngineConfig, lock: WriteLockHandle) -> EngineResult<()> {
    workspace.release_write_lock(lock)?;
    thread::sleep(config.mtime_bump_sleep);
    Ok(())
}

/// Executes `option` against `conflict`'s tree conflict (spec §4.6's
/// side-effect table for tree/`merge_incoming_added_file_*` options).
/// `remote` is consulted only by the `merge_incoming_added_file_*`
/// resolvers, which download the incoming file.
pub fn resolve_tree_conflict(
    conflict: &mut Conflict,
    workspace: &dyn Workspace,
    remote: &dyn RemoteSession,
    config: &EngineConfig,
    option: ResolutionOptionId,
) -> EngineResult<()> {
    let Some(tree) = conflict.tree_conflict.clone() else {
        return Err(OptionNotApplicableError {
            option,
            path: conflict.local_path.clone(),
        }
        .into());
    };

    let locator = ResolvedLocator::new();
    let applicable = applicable_options(conflict, tree_incoming_new_kind(remote, &locator, &tree));
    if !applicable.contains(&option) {
        return Err(OptionNotApplicableError {
            option,
            path: conflict.local_path.clone(),
        }
        .into());
    }

    let path = conflict.local_path.clone();
    with_write_lock(workspace, config, &path, || match option {
        ResolutionOptionId::Postpone => Ok(()),
        ResolutionOptionId::AcceptCurrentWcState => {
            if matches!(tree.local_change, LocalChange::MovedAway | LocalChange::Deleted | LocalChange::Replaced)
                && tree.incoming_change == IncomingChange::Edit
            {
                workspace.tree_update_break_moved_away(&path)?;
            }
            workspace.del_tree_conflict(&path)?;
            Ok(())
        }
        ResolutionOptionId::UpdateMoveDestination => {
            workspace.tree_update_moved_away_node(&path)?;
            Ok(())
        }
        ResolutionOptionId::UpdateAnyMovedAwayChildren => {
            workspace.tree_update_raise_moved_away(&path)?;
            Ok(())
        }
        ResolutionOptionId::MergeIncomingAddedFileTextMerge => {
            merge_incoming_added_file_text_merge(&path, workspace, remote, &tree)
        }
        ResolutionOptionId::MergeIncomingAddedFileReplace => merge_incoming_added_file_replace(&path, workspace, remote, &tree, false),
        ResolutionOptionId::MergeIncomingAddedFileReplaceAndMerge => {
            merge_incoming_added_file_replace(&path, workspace, remote, &tree, true)
        }
        other => Err(OptionNotApplicableError { option: other, path: path.clone() }.into()),
    })?;

    conflict.tree_conflict.as_mut().unwrap().resolution = Some(option);
    Ok(())
}

/// Only the `merge_incoming_added_file_*` gate in [`applicable_options`]
/// consults `incoming_new_kind`, and only when the incoming change is an
/// add, so the `check_path` round trip (memoised via [`ResolvedLocator`],
/// SPEC_FULL S3) is skipped entirely for every other tree-conflict shape.
/// A lookup failure is swallowed to `None`, consistent with detail
/// population's own best-effort treatment of `check_path` (spec §4.3/§7).
fn tree_incoming_new_kind(
    remote: &dyn RemoteSession,
    locator: &ResolvedLocator,
    tree: &crate::conflict::TreeConflict,
) -> Option<crate::conflict::VictimKind> {
    if tree.incoming_change != IncomingChange::Add {
        return None;
    }
    locator
        .incoming_new_kind(remote, &tree.new_location.relpath, tree.new_location.peg_rev)
        .ok()
}

fn merge_incoming_added_file_text_merge(
    path: &AbsPath,
    workspace: &dyn Workspace,
    remote: &dyn RemoteSession,
    tree: &crate::conflict::TreeConflict,
) -> EngineResult<()> {
    let (incoming_contents, _incoming_props) = remote.get_file(&tree.new_location.relpath, tree.new_location.peg_rev)?;
    let working_contents = workspace.get_pristine_contents(path)?;
    workspace.merge_text(path, &[], &incoming_contents, &working_contents)?;
    workspace.del_tree_conflict(path)?;
    Ok(())
}

fn merge_incoming_added_file_replace(
    path: &AbsPath,
    workspace: &dyn Workspace,
    remote: &dyn RemoteSession,
    tree: &crate::conflict::TreeConflict,
    also_merge: bool,
) -> EngineResult<()> {
    let previous_contents = workspace.get_pristine_contents(path).ok();
    let previous_props = workspace.get_pristine_props(path).unwrap_or_default();

    workspace.delete(path)?;
    let (incoming_contents, incoming_props) = remote.get_file(&tree.new_location.relpath, tree.new_location.peg_rev)?;
    workspace.add_repos_file(
        path,
        &incoming_contents,
        &incoming_props,
        &tree.new_location.repos_root,
        tree.new_location.peg_rev,
    )?;

    if also_merge {
        if let Some(previous) = previous_contents {
            workspace.merge_text(path, &[], &previous, &incoming_contents)?;
        }
    }
    let _ = previous_props;

    workspace.del_tree_conflict(path)?;
    Ok(())
}

/// Executes a text-resolution option (spec §4.6's side-effect table:
/// "call workspace `conflict_text_mark_resolved(path, choice)`").
pub fn resolve_text_conflict(conflict: &mut Conflict, workspace: &dyn Workspace, config: &EngineConfig, option: ResolutionOptionId) -> EngineResult<()> {
    if conflict.text_conflict.is_none() {
        return Err(OptionNotApplicableError {
            option,
            path: conflict.local_path.clone(),
        }
        .into());
    }
    let choice = choice_for_text_option(option).ok_or_else(|| OptionNotApplicableError {
        option,
        path: conflict.local_path.clone(),
    })?;
    let path = conflict.local_path.clone();
    with_write_lock(workspace, config, &path, || {
        workspace.conflict_text_mark_resolved(&path, choice)?;
        Ok(())
    })?;
    conflict.text_resolution = Some(option);
    Ok(())
}

/// Executes a property-resolution option. `propname = ""` resolves every
/// outstanding property conflict on the path with the same choice (spec
/// §4.6).
pub fn resolve_prop_conflict(
    conflict: &mut Conflict,
    workspace: &dyn Workspace,
    config: &EngineConfig,
    propname: &str,
    option: ResolutionOptionId,
) -> EngineResult<()> {
    let choice = choice_for_text_option(option).ok_or_else(|| OptionNotApplicableError {
        option,
        path: conflict.local_path.clone(),
    })?;
    let path = conflict.local_path.clone();
    let names: Vec<String> = if propname.is_empty() {
        conflict.prop_conflicts.keys().cloned().collect()
    } else {
        vec![propname.to_owned()]
    };
    with_write_lock(workspace, config, &path, || {
        for name in &names {
            workspace.conflict_prop_mark_resolved(&path, name, choice)?;
        }
        Ok(())
    })?;
    for name in names {
        conflict.resolved_props.insert(name, option);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::conflict::{FourWayValues, Operation, RepositoryLocation, TextConflict, TreeConflict, TreeConflictDetail};
    use crate::remote::FakeRemoteSession;
    use crate::workspace::FakeWorkspace;

    fn location() -> RepositoryLocation {
        RepositoryLocation {
            repos_root: "file:///repo".to_owned(),
            repos_uuid: "uuid".to_owned(),
            relpath: "trunk/a.c".to_owned(),
            peg_rev: 5,
            kind: crate::conflict::VictimKind::File,
        }
    }

    #[test]
    fn test_invariant_6_text_resolution_matches_executed_option() {
        let text = TextConflict {
            values: FourWayValues {
                base: Some(b"base".to_vec()),
                working: Some(b"mine".to_vec()),
                incoming_old: Some(b"old".to_vec()),
                incoming_new: Some(b"new".to_vec()),
            },
            mime_type: None,
        };
        let mut conflict = Conflict::new(AbsPath::normalize("/trunk/a.c"), Operation::Update, Some(text), BTreeMap::new(), None);
        let workspace = FakeWorkspace::new();
        let config = EngineConfig::default();
        resolve_text_conflict(&mut conflict, &workspace, &config, ResolutionOptionId::WorkingText).unwrap();
        assert_eq!(conflict.text_resolution, Some(ResolutionOptionId::WorkingText));
    }

    #[test]
    fn test_invariant_6_prop_resolution_matches_executed_option() {
        let mut props = BTreeMap::new();
        props.insert(
            "svn:eol-style".to_owned(),
            crate::conflict::PropConflict {
                values: FourWayValues {
                    base: None,
                    working: None,
                    incoming_old: None,
                    incoming_new: None,
                },
            },
        );
        let mut conflict = Conflict::new(AbsPath::normalize("/trunk/a.c"), Operation::Update, None, props, None);
        let workspace = FakeWorkspace::new();
        let config = EngineConfig::default();
        resolve_prop_conflict(&mut conflict, &workspace, &config, "", ResolutionOptionId::BaseText).unwrap();
        assert_eq!(conflict.resolved_props.get("svn:eol-style"), Some(&ResolutionOptionId::BaseText));
    }

    #[test]
    fn test_rejects_inapplicable_option() {
        let tree = TreeConflict {
            incoming_change: IncomingChange::Edit,
            local_change: LocalChange::Edited,
            victim_kind: crate::conflict::VictimKind::File,
            old_location: location(),
            new_location: location(),
            incoming_details: TreeConflictDetail::None,
            local_details: TreeConflictDetail::None,
            resolution: None,
        };
        let mut conflict = Conflict::new(AbsPath::normalize("/trunk/a.c"), Operation::Update, None, BTreeMap::new(), Some(tree));
        let workspace = FakeWorkspace::new();
        let remote = FakeRemoteSession::new();
        let config = EngineConfig::default();
        let result = resolve_tree_conflict(&mut conflict, &workspace, &remote, &config, ResolutionOptionId::UpdateMoveDestination);
        assert!(matches!(result, Err(EngineError::OptionNotApplicable(_))));
    }

    #[test]
    fn test_compose_on_unwind_when_release_also_fails() {
        let tree = TreeConflict {
            incoming_change: IncomingChange::Edit,
            local_change: LocalChange::Deleted,
            victim_kind: crate::conflict::VictimKind::Dir,
            old_location: location(),
            new_location: location(),
            incoming_details: TreeConflictDetail::None,
            local_details: TreeConflictDetail::None,
            resolution: None,
        };
        let mut conflict = Conflict::new(AbsPath::normalize("/trunk/sub"), Operation::Switch, None, BTreeMap::new(), Some(tree));
        let mut workspace = FakeWorkspace::new();
        workspace.fail_next_release = true;
        let remote = FakeRemoteSession::new();
        let config = EngineConfig::default();
        let result = resolve_tree_conflict(&mut conflict, &workspace, &remote, &config, ResolutionOptionId::UpdateAnyMovedAwayChildren);
        assert!(matches!(result, Err(EngineError::Workspace(_))));
    }
}
