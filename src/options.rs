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

//! Component E: the option engine (spec §4.5).
//!
//! The original chooses a resolver via a generic "function and baton"
//! pair. Here the closed set of fourteen options is a plain enum (spec §9
//! Design Note), and [`applicable_options`] is a pure function from a
//! conflict to the subset that applies to it.

use crate::conflict::{Conflict, IncomingChange, LocalChange, Operation, VictimKind};

/// The stable identifier of a resolution option (spec §4.5).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum ResolutionOptionId {
    Postpone,
    BaseText,
    IncomingText,
    WorkingText,
    IncomingTextWhereConflicted,
    WorkingTextWhereConflicted,
    MergedText,
    AcceptCurrentWcState,
    UpdateMoveDestination,
    UpdateAnyMovedAwayChildren,
    MergeIncomingAddedFileTextMerge,
    MergeIncomingAddedFileReplace,
    MergeIncomingAddedFileReplaceAndMerge,
}

/// `incoming_new_kind` is obtained from the remote session via
/// `check_path` and is only relevant to the three
/// `merge_incoming_added_file_*` options (spec §4.5). Passed in rather
/// than fetched here, since the option engine itself does no I/O.
pub fn applicable_options(conflict: &Conflict, incoming_new_kind: Option<VictimKind>) -> Vec<ResolutionOptionId> {
    let mut options = vec![ResolutionOptionId::Postpone];

    if conflict.text_conflict.is_some() || !conflict.prop_conflicts.is_empty() {
        options.extend(text_options(conflict));
    }

    if let Some(tree) = &conflict.tree_conflict {
        options.push(ResolutionOptionId::AcceptCurrentWcState);

        let update_like = matches!(conflict.operation, Operation::Update | Operation::Switch);

        if update_like
            && tree.local_change == LocalChange::MovedAway
            && tree.incoming_change == IncomingChange::Edit
        {
            options.push(ResolutionOptionId::UpdateMoveDestination);
        }

        if update_like
            && matches!(tree.local_change, LocalChange::Deleted | LocalChange::Replaced)
            && tree.incoming_change == IncomingChange::Edit
            && tree.victim_kind == VictimKind::Dir
        {
            options.push(ResolutionOptionId::UpdateAnyMovedAwayChildren);
        }

        if conflict.operation == Operation::Merge
            && tree.victim_kind == VictimKind::File
            && incoming_new_kind == Some(VictimKind::File)
            && tree.incoming_change == IncomingChange::Add
            && tree.local_change == LocalChange::Obstructed
        {
            options.push(ResolutionOptionId::MergeIncomingAddedFileTextMerge);
            options.push(ResolutionOptionId::MergeIncomingAddedFileReplace);
            options.push(ResolutionOptionId::MergeIncomingAddedFileReplaceAndMerge);
        }
    }

    options
}

/// Text/property option set (spec §4.5); binary files get the reduced
/// set that omits the merge-dependent options.
fn text_options(conflict: &Conflict) -> Vec<ResolutionOptionId> {
    let is_binary = conflict
        .text_conflict
        .as_ref()
        .and_then(|t| t.mime_type.as_deref())
        .is_some_and(|mime| !mime.starts_with("text/"));

    let mut options = vec![
        ResolutionOptionId::BaseText,
        ResolutionOptionId::IncomingText,
        ResolutionOptionId::WorkingText,
    ];
    if !is_binary {
        options.push(ResolutionOptionId::IncomingTextWhereConflicted);
        options.push(ResolutionOptionId::WorkingTextWhereConflicted);
        options.push(ResolutionOptionId::MergedText);
    }
    options
}

/// Backward-compatibility remap (spec §4.5): legacy callers requesting
/// `working_text_where_conflicted` or `merged_text` against a tree
/// conflict are redirected to the option that now covers that intent.
pub fn remap_legacy_option(conflict: &Conflict, requested: ResolutionOptionId) -> ResolutionOptionId {
    let Some(tree) = &conflict.tree_conflict else {
        return requested;
    };
    match requested {
        ResolutionOptionId::WorkingTextWhereConflicted => {
            let update_like = matches!(conflict.operation, Operation::Update | Operation::Switch);
            if update_like && tree.local_change == LocalChange::MovedAway && tree.incoming_change == IncomingChange::Edit {
                ResolutionOptionId::UpdateMoveDestination
            } else if update_like
                && matches!(tree.local_change, LocalChange::Deleted | LocalChange::Replaced)
                && tree.incoming_change == IncomingChange::Edit
                && tree.victim_kind == VictimKind::Dir
            {
                ResolutionOptionId::UpdateAnyMovedAwayChildren
            } else {
                requested
            }
        }
        ResolutionOptionId::MergedText => ResolutionOptionId::AcceptCurrentWcState,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::conflict::{RepositoryLocation, TreeConflict, TreeConflictDetail};
    use crate::repo_path::AbsPath;

    fn location() -> RepositoryLocation {
        RepositoryLocation {
            repos_root: "file:///repo".to_owned(),
            repos_uuid: "uuid".to_owned(),
            relpath: "trunk/a.c".to_owned(),
            peg_rev: 5,
            kind: VictimKind::File,
        }
    }

    fn tree_conflict(incoming: IncomingChange, local: LocalChange, kind: VictimKind) -> TreeConflict {
        TreeConflict {
            incoming_change: incoming,
            local_change: local,
            victim_kind: kind,
            old_location: location(),
            new_location: location(),
            incoming_details: TreeConflictDetail::None,
            local_details: TreeConflictDetail::None,
            resolution: None,
        }
    }

    #[test]
    fn test_s6_obstructed_added_file_under_merge() {
        let conflict = Conflict::new(
            AbsPath::normalize("/trunk/a.c"),
            Operation::Merge,
            None,
            BTreeMap::new(),
            Some(tree_conflict(IncomingChange::Add, LocalChange::Obstructed, VictimKind::File)),
        );
        let options = applicable_options(&conflict, Some(VictimKind::File));
        assert_eq!(
            options,
            vec![
                ResolutionOptionId::Postpone,
                ResolutionOptionId::AcceptCurrentWcState,
                ResolutionOptionId::MergeIncomingAddedFileTextMerge,
                ResolutionOptionId::MergeIncomingAddedFileReplace,
                ResolutionOptionId::MergeIncomingAddedFileReplaceAndMerge,
            ]
        );
    }

    #[test]
    fn test_invariant_postpone_always_present_and_no_stray_options() {
        let conflict = Conflict::new(
            AbsPath::normalize("/trunk/a.c"),
            Operation::Update,
            None,
            BTreeMap::new(),
            Some(tree_conflict(IncomingChange::Edit, LocalChange::Edited, VictimKind::File)),
        );
        let options = applicable_options(&conflict, None);
        assert!(options.contains(&ResolutionOptionId::Postpone));
        assert_eq!(
            options,
            vec![ResolutionOptionId::Postpone, ResolutionOptionId::AcceptCurrentWcState]
        );
    }

    #[test]
    fn test_update_move_destination_gating() {
        let conflict = Conflict::new(
            AbsPath::normalize("/trunk/a.c"),
            Operation::Update,
            None,
            BTreeMap::new(),
            Some(tree_conflict(IncomingChange::Edit, LocalChange::MovedAway, VictimKind::File)),
        );
        let options = applicable_options(&conflict, None);
        assert!(options.contains(&ResolutionOptionId::UpdateMoveDestination));
    }

    #[test]
    fn test_update_any_moved_away_children_requires_dir() {
        let file_victim = Conflict::new(
            AbsPath::normalize("/trunk/a.c"),
            Operation::Switch,
            None,
            BTreeMap::new(),
            Some(tree_conflict(IncomingChange::Edit, LocalChange::Deleted, VictimKind::File)),
        );
        assert!(!applicable_options(&file_victim, None).contains(&ResolutionOptionId::UpdateAnyMovedAwayChildren));

        let dir_victim = Conflict::new(
            AbsPath::normalize("/trunk/sub"),
            Operation::Switch,
            None,
            BTreeMap::new(),
            Some(tree_conflict(IncomingChange::Edit, LocalChange::Deleted, VictimKind::Dir)),
        );
        assert!(applicable_options(&dir_victim, None).contains(&ResolutionOptionId::UpdateAnyMovedAwayChildren));
    }

    #[test]
    fn test_remap_merged_text_on_tree_conflict() {
        let conflict = Conflict::new(
            AbsPath::normalize("/trunk/a.c"),
            Operation::Update,
            None,
            BTreeMap::new(),
            Some(tree_conflict(IncomingChange::Edit, LocalChange::Edited, VictimKind::File)),
        );
        assert_eq!(
            remap_legacy_option(&conflict, ResolutionOptionId::MergedText),
            ResolutionOptionId::AcceptCurrentWcState
        );
    }

    #[test]
    fn test_remap_working_text_where_conflicted_to_move_destination() {
        let conflict = Conflict::new(
            AbsPath::normalize("/trunk/a.c"),
            Operation::Update,
            None,
            BTreeMap::new(),
            Some(tree_conflict(IncomingChange::Edit, LocalChange::MovedAway, VictimKind::File)),
        );
        assert_eq!(
            remap_legacy_option(&conflict, ResolutionOptionId::WorkingTextWhereConflicted),
            ResolutionOptionId::UpdateMoveDestination
        );
    }

    #[test]
    fn test_remap_is_noop_outside_tree_conflicts() {
        let mut props = BTreeMap::new();
        props.insert(
            "svn:eol-style".to_owned(),
            crate::conflict::PropConflict {
                values: crate::conflict::FourWayValues {
                    base: None,
                    working: None,
                    incoming_old: None,
                    incoming_new: None,
                },
            },
        );
        let conflict = Conflict::new(AbsPath::normalize("/trunk/a.c"), Operation::Update, None, props, None);
        assert_eq!(
            remap_legacy_option(&conflict, ResolutionOptionId::MergedText),
            ResolutionOptionId::MergedText
        );
    }
}
