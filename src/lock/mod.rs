// Copyright 2020 The Jujutsu Authors
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

//! An advisory, cross-process file lock used to serialise shelf-store
//! writes. This does not implement the workspace write lock described in
//! spec §6 (`acquire_write_lock_for_resolve`) — that primitive belongs to
//! the external workspace collaborator and is only reachable through the
//! [`crate::workspace::Workspace`] trait. This lock instead guards the
//! shelf store's own on-disk directory, which the engine owns outright.

use std::fmt;
use std::io;
use std::path::PathBuf;

#[cfg_attr(windows, path = "windows.rs")]
#[cfg_attr(not(windows), path = "fallback.rs")]
mod platform;

pub use platform::FileLock;

#[derive(Debug)]
pub struct FileLockError {
    pub message: &'static str,
    pub path: PathBuf,
    pub err: io::Error,
}

impl fmt::Display for FileLockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.message, self.path.display(), self.err)
    }
}

impl std::error::Error for FileLockError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.err)
    }
}
