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

//! The error-kind taxonomy of spec §7.

use std::path::PathBuf;

use thiserror::Error;

use crate::repo_path::AbsPath;

/// Errors surfaced by the workspace collaborator (spec §6/§7).
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("'{0}' is not a versioned path")]
    PathNotVersioned(PathBuf),
    #[error("'{0}' not found")]
    PathNotFound(PathBuf),
    #[error("working copy at '{0}' is locked")]
    WorkspaceLocked(PathBuf),
    #[error("working copy metadata at '{0}' is corrupt")]
    WorkspaceCorrupt(PathBuf),
    #[error("conflict-resolver requested an unrecognised conflict record kind")]
    UnrecognisedConflictKind,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the remote session collaborator (spec §6/§7).
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("'{0}' not found in the repository")]
    PathNotFound(String),
    /// During detail population only, this is swallowed by the caller
    /// (spec §7: "Recovery policy"); everywhere else it propagates.
    #[error("not authorised to read '{0}'")]
    PathNotAuthorised(String),
    #[error("no authentication provider registered for credential kind '{0}'")]
    NoProvider(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A mergeinfo parse failure; always the topmost error on any parse path
/// (spec §7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("mergeinfo parse error: {reason} (in {input:?})")]
pub struct MergeinfoParseError {
    pub reason: String,
    pub input: String,
}

/// Errors from the external text-merge helper (spec §4.6/§7).
#[derive(Debug, Error)]
#[error("external text-merge program failed: {0}")]
pub struct ExternalProgramError(pub String);

/// The caller requested a resolution option that isn't in the list the
/// option engine produced for this conflict (spec §4.5/§7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("option '{option:?}' is not applicable to the conflict at '{path}'")]
pub struct OptionNotApplicableError {
    pub option: crate::options::ResolutionOptionId,
    pub path: AbsPath,
}

/// Top-level error type composing every subsystem's errors.
///
/// Mirrors the shape of `jj-lib`'s `ConvergeError`: plain variants for
/// engine-native failures, `#[error(transparent)]` wrapping collaborator
/// errors that are propagated unchanged.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    MergeinfoParse(#[from] MergeinfoParseError),
    #[error(transparent)]
    ExternalProgram(#[from] ExternalProgramError),
    #[error(transparent)]
    OptionNotApplicable(#[from] OptionNotApplicableError),
    #[error("operation was cancelled")]
    Cancelled,
    #[error(transparent)]
    Shelf(#[from] crate::shelf::ShelfError),
    /// A resolver failed after already acquiring the write lock; releasing
    /// the lock itself then also failed. Composes both failures rather
    /// than silently dropping one (spec §7: "the write lock is *always*
    /// released on all exit paths; a resolver that fails mid-way returns
    /// an error that is the composition of the primary error and any
    /// lock-release error").
    #[error("{primary}; additionally, releasing the write lock failed: {lock_release}")]
    ResolverFailedAndLockReleaseFailed {
        primary: Box<EngineError>,
        lock_release: Box<EngineError>,
    },
}

pub type EngineResult<T> = Result<T, EngineError>;
