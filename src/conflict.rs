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

//! Component C: the conflict data model (spec §3).
//!
//! The original dispatches description and detail population through a
//! pair of function pointers chosen at load time (spec §9 Design Note).
//! Here `incoming_details`/`local_details` are instead represented as an
//! enum tag on [`TreeConflict`] itself, so that which description/detail
//! pair applies is a `match` rather than an indirect call.

use std::collections::BTreeMap;

use crate::error::{EngineResult, WorkspaceError};
use crate::options::ResolutionOptionId;
use crate::repo_path::AbsPath;
use crate::workspace::Workspace;

/// The operation that produced a conflict (spec §3).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    Update,
    Switch,
    Merge,
    None,
}

/// What happened to the victim on the incoming side (spec §3).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IncomingChange {
    Edit,
    Add,
    Delete,
    Replace,
}

/// What happened to the victim on the local side (spec §3).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LocalChange {
    Edited,
    Deleted,
    Missing,
    Obstructed,
    Added,
    Replaced,
    Unversioned,
    MovedAway,
    MovedHere,
}

/// The node kind of the victim (spec §3).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VictimKind {
    File,
    Dir,
    Symlink,
    None,
    Unknown,
}

/// One of the two `(repos_root, repos_uuid, relpath, peg_rev, kind)`
/// tuples a tree conflict carries (spec §3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepositoryLocation {
    pub repos_root: String,
    pub repos_uuid: String,
    pub relpath: String,
    pub peg_rev: u64,
    pub kind: VictimKind,
}

/// The four value variants carried by a text or property conflict
/// (spec §3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FourWayValues<T> {
    pub base: Option<T>,
    pub working: Option<T>,
    pub incoming_old: Option<T>,
    pub incoming_new: Option<T>,
}

/// Text conflict: base/working/incoming-old/incoming-new file contents
/// plus a MIME type (spec §3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextConflict {
    pub values: FourWayValues<Vec<u8>>,
    pub mime_type: Option<String>,
}

/// One property's conflicting values (spec §3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropConflict {
    pub values: FourWayValues<String>,
}

/// A single log-entry touching the victim, gathered by the incoming-edit
/// detail resolver (spec §4.3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditTouch {
    pub revision: u64,
    pub author: Option<String>,
    pub text_modified: bool,
    pub props_modified: bool,
    pub children_modified: bool,
}

/// Detail populated for an incoming delete/replace (spec §4.3).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeletionDetail {
    pub deleted_rev: Option<u64>,
    pub rev_author: Option<String>,
    pub replacing_node_kind: Option<VictimKind>,
}

/// Detail populated for an incoming add (spec §4.3).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddDetail {
    pub added_rev: Option<u64>,
    pub rev_author: Option<String>,
    pub later_deletion: Option<DeletionDetail>,
}

/// Detail populated for an incoming edit (spec §4.3).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EditDetail {
    pub touches: Vec<EditTouch>,
}

/// The subtype-specific detail record a tree conflict carries, populated
/// lazily by §4.3. Until populated, `incoming_details`/`local_details`
/// fall back to the generic describer (spec §4.2).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreeConflictDetail {
    None,
    IncomingDelete(DeletionDetail),
    IncomingAdd(AddDetail),
    IncomingEdit(EditDetail),
    LocallyMissing(DeletionDetail),
}

impl Default for TreeConflictDetail {
    fn default() -> Self {
        TreeConflictDetail::None
    }
}

/// A tree conflict (spec §3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeConflict {
    pub incoming_change: IncomingChange,
    pub local_change: LocalChange,
    pub victim_kind: VictimKind,
    pub old_location: RepositoryLocation,
    pub new_location: RepositoryLocation,
    pub incoming_details: TreeConflictDetail,
    pub local_details: TreeConflictDetail,
    pub resolution: Option<ResolutionOptionId>,
}

impl TreeConflict {
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }
}

/// A record attached to a working-copy path (spec §3).
///
/// Invariant: at least one of `text_conflict`, a non-empty
/// `prop_conflicts`, or `tree_conflict` is present; constructors enforce
/// this, since violating it is a programmer error (spec §4.1: "a record
/// of an unrecognised conflict kind ... fails fast").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conflict {
    pub local_path: AbsPath,
    pub operation: Operation,
    pub text_conflict: Option<TextConflict>,
    pub prop_conflicts: BTreeMap<String, PropConflict>,
    pub tree_conflict: Option<TreeConflict>,
    pub text_resolution: Option<ResolutionOptionId>,
    pub resolved_props: BTreeMap<String, ResolutionOptionId>,
}

impl Conflict {
    /// Builds a conflict record, enforcing spec §3's "at least one
    /// sub-kind present" invariant.
    pub fn new(
        local_path: AbsPath,
        operation: Operation,
        text_conflict: Option<TextConflict>,
        prop_conflicts: BTreeMap<String, PropConflict>,
        tree_conflict: Option<TreeConflict>,
    ) -> Self {
        assert!(
            text_conflict.is_some() || !prop_conflicts.is_empty() || tree_conflict.is_some(),
            "a conflict record must carry at least one of text/prop/tree"
        );
        // spec §3: "If operation = merge, the text-conflict base content
        // is absent; the incoming-old content stands in."
        if operation == Operation::Merge {
            if let Some(text) = &text_conflict {
                assert!(
                    text.values.base.is_none(),
                    "merge conflicts carry no base text; incoming-old stands in"
                );
            }
        }
        Conflict {
            local_path,
            operation,
            text_conflict,
            prop_conflicts,
            tree_conflict,
            text_resolution: None,
            resolved_props: BTreeMap::new(),
        }
    }

    pub fn tree_resolution(&self) -> Option<ResolutionOptionId> {
        self.tree_conflict.as_ref().and_then(|tc| tc.resolution)
    }

    pub fn is_fully_resolved(&self) -> bool {
        let text_ok = self.text_conflict.is_none() || self.text_resolution.is_some();
        let tree_ok = self.tree_conflict.as_ref().is_none_or(TreeConflict::is_resolved);
        let props_ok = self
            .prop_conflicts
            .keys()
            .all(|name| self.resolved_props.contains_key(name));
        text_ok && tree_ok && props_ok
    }
}

/// One raw conflict record as the workspace stores it, before `load`
/// slots it into a [`Conflict`] (spec §4.1). The workspace interface
/// leaves this format undefined (spec §6: "the engine does not define
/// this"); the engine's own shape mirrors Subversion's
/// `svn_wc_conflict_description2_t`, which tags every record with its
/// kind and, for property conflicts, the property name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConflictDescriptorKind {
    Text(TextConflict),
    Property { name: String, conflict: PropConflict },
    Tree(TreeConflict),
    /// The workspace reported a record in a kind the engine doesn't
    /// recognise. Kept representable rather than refused at the type
    /// level, since the workspace interface is an external boundary the
    /// engine doesn't control the evolution of; `load` treats it as a
    /// programmer error and fails fast (spec §4.1).
    Unrecognised,
}

/// A raw descriptor plus the operation that produced it (spec §4.1:
/// "read all raw conflict descriptors for that path").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConflictDescriptor {
    pub operation: Operation,
    pub kind: ConflictDescriptorKind,
}

/// Given `local_path` and a workspace handle, reads the raw conflict
/// descriptors for that path, categorises each into its slot (text,
/// property-named, tree), and assembles a [`Conflict`] (spec §4.1).
///
/// For a tree descriptor, this also decides which incoming/local detail
/// pair applies — incoming delete/replace gets the incoming-delete pair,
/// incoming add gets the incoming-add pair, incoming edit gets the
/// incoming-edit pair, a locally-missing victim gets the local-missing
/// pair, everything else keeps the generic describer — but leaves the
/// pair empty; populating it by contacting the remote session is §4.3's
/// job, invoked separately (spec §2 control flow).
///
/// *path-not-versioned*/*path-not-found* from the workspace propagate
/// unchanged (spec §7). A descriptor of an unrecognised kind is a
/// programmer error and fails fast.
pub fn load(local_path: &AbsPath, workspace: &dyn Workspace) -> EngineResult<Conflict> {
    let descriptors = workspace.read_conflict_descriptions(local_path)?;

    let mut operation = Operation::None;
    let mut text_conflict = None;
    let mut prop_conflicts = BTreeMap::new();
    let mut tree_conflict = None;

    for descriptor in descriptors {
        operation = descriptor.operation;
        match descriptor.kind {
            ConflictDescriptorKind::Text(text) => text_conflict = Some(text),
            ConflictDescriptorKind::Property { name, conflict } => {
                prop_conflicts.insert(name, conflict);
            }
            ConflictDescriptorKind::Tree(mut tree) => {
                tree.incoming_details = initial_incoming_detail_slot(&tree);
                tree.local_details = initial_local_detail_slot(&tree);
                tree_conflict = Some(tree);
            }
            ConflictDescriptorKind::Unrecognised => {
                return Err(WorkspaceError::UnrecognisedConflictKind.into());
            }
        }
    }

    Ok(Conflict::new(local_path.clone(), operation, text_conflict, prop_conflicts, tree_conflict))
}

fn initial_incoming_detail_slot(tree: &TreeConflict) -> TreeConflictDetail {
    match tree.incoming_change {
        IncomingChange::Delete | IncomingChange::Replace => TreeConflictDetail::IncomingDelete(DeletionDetail::default()),
        IncomingChange::Add => TreeConflictDetail::IncomingAdd(AddDetail::default()),
        IncomingChange::Edit => TreeConflictDetail::IncomingEdit(EditDetail::default()),
    }
}

fn initial_local_detail_slot(tree: &TreeConflict) -> TreeConflictDetail {
    match tree.local_change {
        LocalChange::Missing => TreeConflictDetail::LocallyMissing(DeletionDetail::default()),
        _ => TreeConflictDetail::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::FakeWorkspace;

    fn location() -> RepositoryLocation {
        RepositoryLocation {
            repos_root: "file:///repo".to_owned(),
            repos_uuid: "uuid".to_owned(),
            relpath: "trunk/a.c".to_owned(),
            peg_rev: 5,
            kind: VictimKind::File,
        }
    }

    #[test]
    #[should_panic(expected = "at least one")]
    fn test_conflict_must_carry_a_subkind() {
        Conflict::new(
            AbsPath::normalize("/trunk/a.c"),
            Operation::Update,
            None,
            BTreeMap::new(),
            None,
        );
    }

    #[test]
    #[should_panic(expected = "no base text")]
    fn test_merge_operation_forbids_base_text() {
        let text = TextConflict {
            values: FourWayValues {
                base: Some(b"x".to_vec()),
                working: None,
                incoming_old: None,
                incoming_new: None,
            },
            mime_type: None,
        };
        Conflict::new(
            AbsPath::normalize("/trunk/a.c"),
            Operation::Merge,
            Some(text),
            BTreeMap::new(),
            None,
        );
    }

    #[test]
    fn test_is_fully_resolved_tracks_all_subkinds() {
        let mut props = BTreeMap::new();
        props.insert(
            "svn:eol-style".to_owned(),
            PropConflict {
                values: FourWayValues {
                    base: None,
                    working: None,
                    incoming_old: None,
                    incoming_new: None,
                },
            },
        );
        let mut conflict = Conflict::new(
            AbsPath::normalize("/trunk/a.c"),
            Operation::Update,
            None,
            props,
            None,
        );
        assert!(!conflict.is_fully_resolved());
        conflict
            .resolved_props
            .insert("svn:eol-style".to_owned(), ResolutionOptionId::WorkingText);
        assert!(conflict.is_fully_resolved());
    }

    fn prop_conflict() -> PropConflict {
        PropConflict {
            values: FourWayValues {
                base: None,
                working: None,
                incoming_old: None,
                incoming_new: None,
            },
        }
    }

    fn bare_tree_conflict(incoming_change: IncomingChange, local_change: LocalChange) -> TreeConflict {
        TreeConflict {
            incoming_change,
            local_change,
            victim_kind: VictimKind::File,
            old_location: location(),
            new_location: location(),
            incoming_details: TreeConflictDetail::None,
            local_details: TreeConflictDetail::None,
            resolution: None,
        }
    }

    #[test]
    fn test_load_slots_text_property_and_tree_descriptors() {
        let mut workspace = FakeWorkspace::new();
        let path = AbsPath::normalize("/trunk/a.c");
        workspace.conflict_descriptions.insert(
            path.clone(),
            vec![
                ConflictDescriptor {
                    operation: Operation::Update,
                    kind: ConflictDescriptorKind::Text(TextConflict {
                        values: FourWayValues {
                            base: Some(b"base\n".to_vec()),
                            working: Some(b"mine\n".to_vec()),
                            incoming_old: Some(b"base\n".to_vec()),
                            incoming_new: Some(b"theirs\n".to_vec()),
                        },
                        mime_type: None,
                    }),
                },
                ConflictDescriptor {
                    operation: Operation::Update,
                    kind: ConflictDescriptorKind::Property {
                        name: "svn:eol-style".to_owned(),
                        conflict: prop_conflict(),
                    },
                },
                ConflictDescriptor {
                    operation: Operation::Update,
                    kind: ConflictDescriptorKind::Tree(bare_tree_conflict(IncomingChange::Delete, LocalChange::Edited)),
                },
            ],
        );

        let conflict = load(&path, &workspace).unwrap();
        assert_eq!(conflict.operation, Operation::Update);
        assert!(conflict.text_conflict.is_some());
        assert!(conflict.prop_conflicts.contains_key("svn:eol-style"));
        let tree = conflict.tree_conflict.unwrap();
        assert!(matches!(tree.incoming_details, TreeConflictDetail::IncomingDelete(_)));
        assert!(matches!(tree.local_details, TreeConflictDetail::None));
    }

    #[test]
    fn test_load_locally_missing_selects_local_missing_pair() {
        let mut workspace = FakeWorkspace::new();
        let path = AbsPath::normalize("/trunk/a.c");
        workspace.conflict_descriptions.insert(
            path.clone(),
            vec![ConflictDescriptor {
                operation: Operation::Merge,
                kind: ConflictDescriptorKind::Tree(bare_tree_conflict(IncomingChange::Edit, LocalChange::Missing)),
            }],
        );

        let conflict = load(&path, &workspace).unwrap();
        let tree = conflict.tree_conflict.unwrap();
        assert!(matches!(tree.incoming_details, TreeConflictDetail::IncomingEdit(_)));
        assert!(matches!(tree.local_details, TreeConflictDetail::LocallyMissing(_)));
    }

    #[test]
    fn test_load_surfaces_path_not_versioned_verbatim() {
        let mut workspace = FakeWorkspace::new();
        let path = AbsPath::normalize("/trunk/a.c");
        workspace.unversioned_paths.push(path.clone());

        let err = load(&path, &workspace).unwrap_err();
        assert!(matches!(
            err,
            crate::error::EngineError::Workspace(WorkspaceError::PathNotVersioned(_))
        ));
    }

    #[test]
    fn test_load_fails_fast_on_unrecognised_descriptor_kind() {
        let mut workspace = FakeWorkspace::new();
        let path = AbsPath::normalize("/trunk/a.c");
        workspace.conflict_descriptions.insert(
            path.clone(),
            vec![ConflictDescriptor {
                operation: Operation::Update,
                kind: ConflictDescriptorKind::Unrecognised,
            }],
        );

        let err = load(&path, &workspace).unwrap_err();
        assert!(matches!(
            err,
            crate::error::EngineError::Workspace(WorkspaceError::UnrecognisedConflictKind)
        ));
    }

    #[test]
    fn test_tree_conflict_resolution_round_trip() {
        let tc = TreeConflict {
            incoming_change: IncomingChange::Delete,
            local_change: LocalChange::Edited,
            victim_kind: VictimKind::File,
            old_location: location(),
            new_location: location(),
            incoming_details: TreeConflictDetail::None,
            local_details: TreeConflictDetail::None,
            resolution: None,
        };
        assert!(!tc.is_resolved());
        let mut conflict = Conflict::new(
            AbsPath::normalize("/trunk/a.c"),
            Operation::Update,
            None,
            BTreeMap::new(),
            Some(tc),
        );
        assert_eq!(conflict.tree_resolution(), None);
        conflict.tree_conflict.as_mut().unwrap().resolution =
            Some(ResolutionOptionId::AcceptCurrentWcState);
        assert_eq!(
            conflict.tree_resolution(),
            Some(ResolutionOptionId::AcceptCurrentWcState)
        );
    }
}
