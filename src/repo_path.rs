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

//! Absolute repository paths, used as mergeinfo and conflict keys.
//!
//! Unlike a working-copy filesystem path, an `AbsPath` always starts with
//! `/` and is the path as known to the repository (spec §3: "Keys are
//! always absolute; any relative key encountered during parse is upgraded").

use std::borrow::Borrow;
use std::fmt;
use std::fmt::Debug;

/// A validated, `/`-rooted repository path, e.g. `/trunk/src/main.c`.
///
/// The root path is represented as `"/"`. Trailing slashes (other than the
/// root) and empty components (`//`) are never present in a valid value.
#[derive(Clone, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub struct AbsPath {
    value: String,
}

impl Debug for AbsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.value, f)
    }
}

impl fmt::Display for AbsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl Default for AbsPath {
    fn default() -> Self {
        Self::root()
    }
}

impl AbsPath {
    pub fn root() -> Self {
        AbsPath {
            value: "/".to_owned(),
        }
    }

    /// Builds an `AbsPath` from a possibly-relative input string, upgrading
    /// a missing leading slash rather than rejecting it (spec §3/§4.4:
    /// "tolerate and normalise relative paths to absolute").
    pub fn normalize(value: &str) -> Self {
        let trimmed = value.trim_end_matches('/');
        let with_lead = if trimmed.starts_with('/') {
            trimmed.to_owned()
        } else {
            format!("/{trimmed}")
        };
        let collapsed = collapse_empty_components(&with_lead);
        AbsPath {
            value: if collapsed.is_empty() {
                "/".to_owned()
            } else {
                collapsed
            },
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn is_root(&self) -> bool {
        self.value == "/"
    }

    pub fn components(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.value.split('/').filter(|s| !s.is_empty())
    }

    pub fn parent(&self) -> Option<AbsPath> {
        if self.is_root() {
            return None;
        }
        let mut components: Vec<&str> = self.components().collect();
        components.pop();
        Some(AbsPath {
            value: if components.is_empty() {
                "/".to_owned()
            } else {
                format!("/{}", components.join("/"))
            },
        })
    }

    pub fn basename(&self) -> Option<&str> {
        self.components().next_back()
    }

    pub fn join(&self, component: &str) -> AbsPath {
        assert!(!component.is_empty() && !component.contains('/'));
        if self.is_root() {
            AbsPath {
                value: format!("/{component}"),
            }
        } else {
            AbsPath {
                value: format!("{}/{component}", self.value),
            }
        }
    }

    /// True if `self` is `other` or an ancestor of `other`.
    pub fn contains(&self, other: &AbsPath) -> bool {
        if self.is_root() {
            return true;
        }
        other.value == self.value || other.value.starts_with(&format!("{}/", self.value))
    }
}

impl Borrow<str> for AbsPath {
    fn borrow(&self) -> &str {
        &self.value
    }
}

impl From<&str> for AbsPath {
    fn from(value: &str) -> Self {
        AbsPath::normalize(value)
    }
}

impl From<String> for AbsPath {
    fn from(value: String) -> Self {
        AbsPath::normalize(&value)
    }
}

fn collapse_empty_components(value: &str) -> String {
    let parts: Vec<&str> = value.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", parts.join("/"))
}
