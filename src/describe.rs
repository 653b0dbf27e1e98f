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

//! Pure, I/O-free human-readable descriptions of a conflict (spec §4.2).
//!
//! The local-side description of a moved node additionally consults the
//! workspace for the move source/destination; that one case is the only
//! place this module needs a collaborator, so it takes a small closure
//! rather than the full [`crate::workspace::Workspace`] trait.

use crate::conflict::{
    AddDetail, Conflict, DeletionDetail, EditDetail, IncomingChange, LocalChange, Operation, TreeConflict,
    TreeConflictDetail, VictimKind,
};

/// `"<local_change>, <incoming_change> <operation>"` (spec §4.2).
pub fn describe_prop_conflict(local: LocalChange, incoming: IncomingChange, operation: Operation) -> String {
    format!(
        "{}, {} {}",
        local_change_word(local),
        incoming_change_word(incoming),
        operation_word(operation)
    )
}

/// Text-conflict description: same table shape as property conflicts
/// (spec §4.2: "Text/property-conflict descriptions are a table lookup
/// on `(local_change, incoming_change, operation)`").
pub fn describe_text_conflict(local: LocalChange, incoming: IncomingChange, operation: Operation) -> String {
    format!(
        "local {} {}, incoming {} {}",
        local_change_word(local),
        describe_operation_phrase(operation),
        incoming_change_word(incoming),
        describe_operation_phrase(operation)
    )
}

/// Tree-conflict local-side description (spec §4.2). For a moved node,
/// `move_counterpart` must be the workspace's answer to
/// `node_was_moved_away`/`node_was_moved_here` for this path.
pub fn describe_local_side(
    local_change: LocalChange,
    victim_kind: VictimKind,
    operation: Operation,
    move_counterpart: Option<&str>,
) -> String {
    match (local_change, move_counterpart) {
        (LocalChange::MovedAway, Some(dest)) => {
            format!("local {} has been moved away to '{dest}'", kind_word(victim_kind))
        }
        (LocalChange::MovedHere, Some(src)) => {
            format!("local {} has been moved here from '{src}'", kind_word(victim_kind))
        }
        _ => format!(
            "local {} {} {}",
            kind_word(victim_kind),
            local_change_word(local_change),
            describe_operation_phrase(operation)
        ),
    }
}

/// Tree-conflict incoming-side description, generic form: a strict
/// 4x3x3 enumeration over `(victim_kind, incoming_change, operation)`
/// (spec §4.2: "nothing may be produced outside this table").
pub fn describe_incoming_generic(victim_kind: VictimKind, incoming_change: IncomingChange, operation: Operation) -> String {
    format!(
        "incoming {} {} {}",
        incoming_change_word(incoming_change),
        kind_word(victim_kind),
        describe_operation_phrase(operation)
    )
}

/// Tree-conflict incoming-side description, consulting whichever detail
/// is populated to interpolate specifics (spec §4.2). Falls back to the
/// generic form until details are available.
pub fn describe_incoming(tree: &TreeConflict, operation: Operation) -> String {
    match &tree.incoming_details {
        TreeConflictDetail::IncomingDelete(detail) => describe_incoming_delete(tree, operation, detail),
        TreeConflictDetail::IncomingAdd(detail) => describe_incoming_add(tree, operation, detail),
        TreeConflictDetail::IncomingEdit(detail) => describe_incoming_edit(tree, operation, detail),
        TreeConflictDetail::LocallyMissing(_) | TreeConflictDetail::None => {
            describe_incoming_generic(tree.victim_kind, tree.incoming_change, operation)
        }
    }
}

fn describe_incoming_delete(tree: &TreeConflict, operation: Operation, detail: &DeletionDetail) -> String {
    let Some(rev) = detail.deleted_rev else {
        return describe_incoming_generic(tree.victim_kind, tree.incoming_change, operation);
    };
    let by = detail
        .rev_author
        .as_deref()
        .map(|a| format!(" by {a}"))
        .unwrap_or_default();
    match detail.replacing_node_kind {
        Some(new_kind) => format!(
            "incoming {} replaced by {} in r{rev}{by}",
            kind_word(tree.victim_kind),
            kind_word(new_kind)
        ),
        None => format!("incoming {} deleted in r{rev}{by}", kind_word(tree.victim_kind)),
    }
}

fn describe_incoming_add(tree: &TreeConflict, operation: Operation, detail: &AddDetail) -> String {
    let Some(rev) = detail.added_rev else {
        return describe_incoming_generic(tree.victim_kind, tree.incoming_change, operation);
    };
    let by = detail
        .rev_author
        .as_deref()
        .map(|a| format!(" by {a}"))
        .unwrap_or_default();
    let mut description = format!("incoming {} added in r{rev}{by}", kind_word(tree.victim_kind));
    if let Some(later) = &detail.later_deletion {
        if let Some(del_rev) = later.deleted_rev {
            description.push_str(&format!(", later deleted in r{del_rev}"));
        }
    }
    description
}

fn describe_incoming_edit(tree: &TreeConflict, operation: Operation, detail: &EditDetail) -> String {
    if detail.touches.is_empty() {
        return describe_incoming_generic(tree.victim_kind, tree.incoming_change, operation);
    }
    format!(
        "incoming {} edited in {} revision(s)",
        kind_word(tree.victim_kind),
        detail.touches.len()
    )
}

fn local_change_word(change: LocalChange) -> &'static str {
    match change {
        LocalChange::Edited => "edited",
        LocalChange::Deleted => "deleted",
        LocalChange::Missing => "missing",
        LocalChange::Obstructed => "obstructed",
        LocalChange::Added => "added",
        LocalChange::Replaced => "replaced",
        LocalChange::Unversioned => "unversioned",
        LocalChange::MovedAway => "moved away",
        LocalChange::MovedHere => "moved here",
    }
}

fn incoming_change_word(change: IncomingChange) -> &'static str {
    match change {
        IncomingChange::Edit => "edit",
        IncomingChange::Add => "add",
        IncomingChange::Delete => "delete",
        IncomingChange::Replace => "replace",
    }
}

fn operation_word(operation: Operation) -> &'static str {
    match operation {
        Operation::Update => "update",
        Operation::Switch => "switch",
        Operation::Merge => "merge",
        Operation::None => "none",
    }
}

fn describe_operation_phrase(operation: Operation) -> &'static str {
    match operation {
        Operation::Update => "upon update",
        Operation::Switch => "upon switch",
        Operation::Merge => "upon merge",
        Operation::None => "",
    }
}

fn kind_word(kind: VictimKind) -> &'static str {
    match kind {
        VictimKind::File => "file",
        VictimKind::Dir => "directory",
        VictimKind::Symlink => "symlink",
        VictimKind::None => "node",
        VictimKind::Unknown => "item",
    }
}

/// Convenience entry point used by the caller once a conflict is loaded
/// (spec §2: "§4.2 then produces incoming- and local-change
/// descriptions").
pub fn describe_tree_conflict(conflict: &Conflict, move_counterpart: Option<&str>) -> Option<(String, String)> {
    let tree = conflict.tree_conflict.as_ref()?;
    Some((
        describe_local_side(tree.local_change, tree.victim_kind, conflict.operation, move_counterpart),
        describe_incoming(tree, conflict.operation),
    ))
}
