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

//! Cooperative cancellation, consulted at every remote-session loop
//! iteration and at the head of every resolver (spec §5).

/// A caller-supplied predicate the engine polls at cancellation points.
///
/// Mergeinfo algebra never consults this — those operations are expected
/// to be fast (spec §5).
pub trait CancelToken {
    /// Returns `true` if the caller wants the current operation aborted.
    fn is_cancelled(&self) -> bool;
}

/// A token that never cancels. The default for callers that have no
/// cancellation source.
pub struct NeverCancelled;

impl CancelToken for NeverCancelled {
    fn is_cancelled(&self) -> bool {
        false
    }
}
