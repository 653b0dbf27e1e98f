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

//! Conflict classification, mergeinfo algebra, and a resolution engine
//! for a centralised version-control system. See `spec.md`'s module
//! breakdown for the shape this crate follows: revision-range algebra
//! (`range`), mergeinfo parsing and catalog arithmetic (`mergeinfo`),
//! conflict records (`conflict`) and their human-readable descriptions
//! (`describe`), the collaborator traits (`remote`, `workspace`), tree-
//! conflict detail population (`detail`), the resolution-option catalog
//! (`options`) and executor (`resolve`), and the shelf/checkpoint store
//! (`shelf`).

pub mod cancel;
pub mod conflict;
pub mod describe;
pub mod detail;
pub mod error;
pub mod file_util;
pub mod lock;
pub mod mergeinfo;
pub mod options;
pub mod range;
pub mod remote;
pub mod repo_path;
pub mod resolve;
pub mod shelf;
pub mod workspace;

pub use cancel::{CancelToken, NeverCancelled};
pub use conflict::Conflict;
pub use error::{EngineError, EngineResult};
pub use mergeinfo::{Mergeinfo, MergeinfoCatalog};
pub use options::ResolutionOptionId;
pub use repo_path::AbsPath;
pub use resolve::EngineConfig;
