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

//! Component B: the per-path mergeinfo record and the catalog that
//! batches it across paths (spec §3/§4.4/§6).

use std::collections::BTreeMap;
use std::fmt::Write as _;

use tracing::debug;

use crate::error::MergeinfoParseError;
use crate::range::{self, Range, RangeList};
use crate::repo_path::AbsPath;

/// `{absolute repository path -> range sequence}` (spec §3).
///
/// A path with an empty range sequence is never stored; [`Mergeinfo::set`]
/// removes the entry instead of inserting an empty `Vec`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Mergeinfo {
    paths: BTreeMap<AbsPath, RangeList>,
}

impl Mergeinfo {
    pub fn new() -> Self {
        Mergeinfo::default()
    }

    pub fn get(&self, path: &AbsPath) -> Option<&RangeList> {
        self.paths.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AbsPath, &RangeList)> {
        self.paths.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Sets `path`'s ranges, or removes the entry if `ranges` is empty
    /// (spec §3: "a path with no ranges is absent from the mapping").
    pub fn set(&mut self, path: AbsPath, ranges: RangeList) {
        if ranges.is_empty() {
            self.paths.remove(&path);
        } else {
            self.paths.insert(path, ranges);
        }
    }

    /// Merges `other`'s ranges into `self`, path by path, fusing range
    /// sequences with [`range::rangelist_merge`]. If the same path already
    /// has ranges (e.g. from a duplicate relative/absolute key, spec §4.4
    /// S2), the sequences are unioned rather than one overwriting the
    /// other.
    pub fn merge_in_place(&mut self, other: &Mergeinfo) {
        for (path, ranges) in other.iter() {
            match self.paths.get(path) {
                Some(existing) => {
                    debug!(path = %path, "merging duplicate mergeinfo key");
                    let combined = range::rangelist_merge(existing, ranges);
                    self.paths.insert(path.clone(), combined);
                }
                None => {
                    self.paths.insert(path.clone(), ranges.clone());
                }
            }
        }
    }

    /// Intersects `self` and `other` path by path via
    /// [`range::rangelist_intersect`] (SPEC_FULL S3: per-mergeinfo form of
    /// `svn_mergeinfo_intersect2`). A path absent from either side
    /// contributes nothing to the result.
    pub fn intersect(&self, other: &Mergeinfo, consider_inheritance: bool) -> Mergeinfo {
        let mut result = Mergeinfo::new();
        for (path, ranges) in &self.paths {
            if let Some(other_ranges) = other.paths.get(path) {
                result.set(path.clone(), range::rangelist_intersect(ranges, other_ranges, consider_inheritance));
            }
        }
        result
    }

    /// Removes `eraser`'s ranges from `self` path by path via
    /// [`range::rangelist_remove`] (SPEC_FULL S3: per-mergeinfo form of
    /// `svn_mergeinfo_remove2`). A path absent from `eraser` is carried
    /// through unchanged.
    pub fn remove(&self, eraser: &Mergeinfo, consider_inheritance: bool) -> Mergeinfo {
        let mut result = Mergeinfo::new();
        for (path, ranges) in &self.paths {
            match eraser.paths.get(path) {
                Some(eraser_ranges) => {
                    result.set(path.clone(), range::rangelist_remove(eraser_ranges, ranges, consider_inheritance));
                }
                None => result.set(path.clone(), ranges.clone()),
            }
        }
        result
    }

    /// Per-path diff against `to` via [`range::rangelist_diff`], returning
    /// `(deleted, added)` (SPEC_FULL S3: per-mergeinfo form of
    /// `svn_mergeinfo_diff2`).
    pub fn diff(&self, to: &Mergeinfo, consider_inheritance: bool) -> (Mergeinfo, Mergeinfo) {
        let mut deleted = Mergeinfo::new();
        let mut added = Mergeinfo::new();
        let mut paths: Vec<&AbsPath> = self.paths.keys().chain(to.paths.keys()).collect();
        paths.sort();
        paths.dedup();
        for path in paths {
            let from_ranges = self.paths.get(path).map(Vec::as_slice).unwrap_or(&[]);
            let to_ranges = to.paths.get(path).map(Vec::as_slice).unwrap_or(&[]);
            let (d, a) = range::rangelist_diff(from_ranges, to_ranges, consider_inheritance);
            deleted.set(path.clone(), d);
            added.set(path.clone(), a);
        }
        (deleted, added)
    }

    /// Parses the on-disk grammar of spec §6:
    /// ```text
    /// line  = path ":" ranges "\n"
    /// ranges = range ("," range)*
    /// range  = number ("-" number)? ("*")?
    /// ```
    pub fn parse(input: &str) -> Result<Mergeinfo, MergeinfoParseError> {
        let mut result = Mergeinfo::new();
        for line in input.lines() {
            if line.is_empty() {
                continue;
            }
            let (path, ranges) = parse_line(line)?;
            result.merge_in_place(&{
                let mut m = Mergeinfo::new();
                m.set(path, ranges);
                m
            });
        }
        Ok(result)
    }

    /// Serialises to the on-disk grammar, lines sorted by path (spec §6:
    /// "Lines must be sorted by path on output" — guaranteed here because
    /// `self.paths` is a `BTreeMap` keyed on `AbsPath`, which sorts
    /// lexicographically).
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for (path, ranges) in &self.paths {
            write!(out, "{path}:").unwrap();
            for (i, r) in ranges.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_range(&mut out, r);
            }
            out.push('\n');
        }
        out
    }
}

fn write_range(out: &mut String, r: &Range) {
    if r.end == r.start + 1 {
        write!(out, "{}", r.end).unwrap();
    } else {
        write!(out, "{}-{}", r.start + 1, r.end).unwrap();
    }
    if !r.inheritable {
        out.push('*');
    }
}

fn parse_line(line: &str) -> Result<(AbsPath, RangeList), MergeinfoParseError> {
    let err = |reason: &str| MergeinfoParseError {
        reason: reason.to_owned(),
        input: line.to_owned(),
    };

    let (path_str, ranges_str) = line.split_once(':').ok_or_else(|| err("missing ':'"))?;
    if path_str.is_empty() {
        return Err(err("empty path"));
    }
    let path = AbsPath::normalize(path_str);

    let mut parsed: Vec<Range> = Vec::new();
    for token in ranges_str.split(',') {
        parsed.push(parse_range(token, &err)?);
    }
    if parsed.is_empty() {
        // spec §9 Open Question: an empty range list is always a parse
        // error, regardless of what the original tolerated.
        return Err(err("empty range list"));
    }

    parsed.sort_by(range::compare_ranges);

    // Walk adjacent pairs directly (spec §4.4): overlapping ranges with
    // matching inheritance fuse, overlapping ranges with differing
    // inheritance are a hard parse error, and merely-adjoining ranges
    // (e.g. `(2,5]` then `(6,7]`, or even `(2,5]` then `(5,7]`) pass
    // through unfused. This is a narrower rule than `combine_with_last`'s
    // splitting behaviour, which is for combining already-parsed
    // sequences, not for validating one line's literal range tokens.
    let mut canonical: RangeList = Vec::new();
    for r in parsed {
        match canonical.last_mut() {
            Some(last) if r.start < last.end => {
                if last.inheritable != r.inheritable {
                    return Err(err("overlapping ranges with different inheritance types"));
                }
                last.end = last.end.max(r.end);
            }
            _ => canonical.push(r),
        }
    }
    Ok((path, canonical))
}

fn parse_range(
    token: &str,
    err: &impl Fn(&str) -> MergeinfoParseError,
) -> Result<Range, MergeinfoParseError> {
    let (digits, inheritable) = match token.strip_suffix('*') {
        Some(rest) => (rest, false),
        None => (token, true),
    };
    if digits.is_empty() {
        return Err(err("empty range token"));
    }
    match digits.split_once('-') {
        Some((start, end)) => {
            let start: u64 = start.parse().map_err(|_| err("non-numeric range start"))?;
            let end: u64 = end.parse().map_err(|_| err("non-numeric range end"))?;
            if start == 0 || end <= start {
                return Err(err("range end must exceed range start"));
            }
            Ok(Range::new(start - 1, end, inheritable))
        }
        None => {
            let revision: u64 = digits.parse().map_err(|_| err("non-numeric revision"))?;
            if revision == 0 {
                return Err(err("revision 0 cannot appear in a range"));
            }
            Ok(Range::single(revision, inheritable))
        }
    }
}

/// `{path -> Mergeinfo}`, used for batch operations (spec §3).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeinfoCatalog {
    entries: BTreeMap<AbsPath, Mergeinfo>,
}

impl MergeinfoCatalog {
    pub fn new() -> Self {
        MergeinfoCatalog::default()
    }

    pub fn get(&self, path: &AbsPath) -> Option<&Mergeinfo> {
        self.entries.get(path)
    }

    pub fn set(&mut self, path: AbsPath, info: Mergeinfo) {
        if info.is_empty() {
            self.entries.remove(&path);
        } else {
            self.entries.insert(path, info);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AbsPath, &Mergeinfo)> {
        self.entries.iter()
    }

    /// Unions `other` into `self` entry-wise (SPEC_FULL S3: catalog-level
    /// batch merge, used when combining mergeinfo collected across a
    /// subtree).
    pub fn merge_in_place(&mut self, other: &MergeinfoCatalog) {
        for (path, info) in other.iter() {
            self.entries
                .entry(path.clone())
                .or_default()
                .merge_in_place(info);
        }
    }

    /// Entry-wise [`Mergeinfo::intersect`] across the catalog (SPEC_FULL
    /// S3: per-catalog form of `svn_mergeinfo_intersect2`). An entry
    /// present in only one catalog is dropped, matching
    /// [`Mergeinfo::intersect`]'s per-path behaviour.
    pub fn intersect(&self, other: &MergeinfoCatalog, consider_inheritance: bool) -> MergeinfoCatalog {
        let mut result = MergeinfoCatalog::new();
        for (path, info) in &self.entries {
            if let Some(other_info) = other.entries.get(path) {
                result.set(path.clone(), info.intersect(other_info, consider_inheritance));
            }
        }
        result
    }

    /// Entry-wise [`Mergeinfo::remove`] across the catalog (SPEC_FULL S3:
    /// per-catalog form of `svn_mergeinfo_remove2`).
    pub fn remove(&self, eraser: &MergeinfoCatalog, consider_inheritance: bool) -> MergeinfoCatalog {
        let mut result = MergeinfoCatalog::new();
        for (path, info) in &self.entries {
            match eraser.entries.get(path) {
                Some(eraser_info) => result.set(path.clone(), info.remove(eraser_info, consider_inheritance)),
                None => result.set(path.clone(), info.clone()),
            }
        }
        result
    }

    /// Entry-wise [`Mergeinfo::diff`] across the catalog, returning
    /// `(deleted, added)` (SPEC_FULL S3: per-catalog form of
    /// `svn_mergeinfo_diff2`).
    pub fn diff(&self, to: &MergeinfoCatalog, consider_inheritance: bool) -> (MergeinfoCatalog, MergeinfoCatalog) {
        let mut deleted = MergeinfoCatalog::new();
        let mut added = MergeinfoCatalog::new();
        let mut paths: Vec<&AbsPath> = self.entries.keys().chain(to.entries.keys()).collect();
        paths.sort();
        paths.dedup();
        let empty = Mergeinfo::new();
        for path in paths {
            let from_info = self.entries.get(path).unwrap_or(&empty);
            let to_info = to.entries.get(path).unwrap_or(&empty);
            let (d, a) = from_info.diff(to_info, consider_inheritance);
            deleted.set(path.clone(), d);
            added.set(path.clone(), a);
        }
        (deleted, added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(start: u64, end: u64, inh: bool) -> Range {
        Range::new(start, end, inh)
    }

    #[test]
    fn test_s1_parse_and_serialize_roundtrip() {
        let info = Mergeinfo::parse("/trunk:3-5,7*,9-11\n").unwrap();
        let trunk = AbsPath::normalize("/trunk");
        assert_eq!(
            info.get(&trunk).unwrap(),
            &vec![r(2, 5, true), r(6, 7, false), r(8, 11, true)]
        );
        assert_eq!(info.serialize(), "/trunk:3-5,7*,9-11\n");
    }

    #[test]
    fn test_s2_duplicate_key_merges_not_overwrites() {
        let info = Mergeinfo::parse("/a:1-10\n/a:6-13\n").unwrap();
        let a = AbsPath::normalize("/a");
        assert_eq!(info.get(&a).unwrap(), &vec![r(0, 13, true)]);
    }

    #[test]
    fn test_s3_overlap_with_differing_inheritance_is_parse_error() {
        let result = Mergeinfo::parse("/a:1-5,3-7*\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_range_list_is_always_a_parse_error() {
        assert!(Mergeinfo::parse("/a:\n").is_err());
    }

    #[test]
    fn test_relative_path_is_upgraded_to_absolute() {
        let info = Mergeinfo::parse("trunk:1-5\n").unwrap();
        assert!(info.get(&AbsPath::normalize("/trunk")).is_some());
    }

    #[test]
    fn test_invariant_parse_serialize_identity_on_canonical_input() {
        let original = "/a:1-5\n/b:6-10*\n";
        let parsed = Mergeinfo::parse(original).unwrap();
        assert_eq!(parsed.serialize(), original);
    }

    #[test]
    fn test_mergeinfo_intersect_drops_paths_absent_from_either_side() {
        let a = Mergeinfo::parse("/x:1-10\n/y:1-5\n").unwrap();
        let b = Mergeinfo::parse("/x:5-15\n").unwrap();
        let intersected = a.intersect(&b, true);
        assert_eq!(intersected.get(&AbsPath::normalize("/x")).unwrap(), &vec![r(4, 10, true)]);
        assert!(intersected.get(&AbsPath::normalize("/y")).is_none());
    }

    #[test]
    fn test_mergeinfo_remove_carries_through_untouched_paths() {
        let a = Mergeinfo::parse("/x:1-10\n/y:1-5\n").unwrap();
        let eraser = Mergeinfo::parse("/x:1-5\n").unwrap();
        let remaining = a.remove(&eraser, true);
        assert_eq!(remaining.get(&AbsPath::normalize("/x")).unwrap(), &vec![r(5, 10, true)]);
        assert_eq!(remaining.get(&AbsPath::normalize("/y")).unwrap(), &vec![r(0, 5, true)]);
    }

    #[test]
    fn test_mergeinfo_diff_reports_deleted_and_added() {
        let from = Mergeinfo::parse("/x:1-10\n").unwrap();
        let to = Mergeinfo::parse("/x:5-15\n").unwrap();
        let (deleted, added) = from.diff(&to, true);
        let x = AbsPath::normalize("/x");
        assert_eq!(deleted.get(&x).unwrap(), &vec![r(0, 4, true)]);
        assert_eq!(added.get(&x).unwrap(), &vec![r(10, 15, true)]);
    }

    #[test]
    fn test_catalog_intersect_remove_diff() {
        let mut a = MergeinfoCatalog::new();
        a.set(AbsPath::normalize("/repo1"), Mergeinfo::parse("/trunk:1-10\n").unwrap());
        let mut b = MergeinfoCatalog::new();
        b.set(AbsPath::normalize("/repo1"), Mergeinfo::parse("/trunk:5-15\n").unwrap());

        let trunk = AbsPath::normalize("/trunk");
        let repo1 = AbsPath::normalize("/repo1");

        let intersected = a.intersect(&b, true);
        assert_eq!(intersected.get(&repo1).unwrap().get(&trunk).unwrap(), &vec![r(4, 10, true)]);

        let removed = a.remove(&b, true);
        assert_eq!(removed.get(&repo1).unwrap().get(&trunk).unwrap(), &vec![r(0, 4, true)]);

        let (deleted, added) = a.diff(&b, true);
        assert_eq!(deleted.get(&repo1).unwrap().get(&trunk).unwrap(), &vec![r(0, 4, true)]);
        assert_eq!(added.get(&repo1).unwrap().get(&trunk).unwrap(), &vec![r(10, 15, true)]);
    }

    #[test]
    fn test_catalog_merge_in_place() {
        let mut catalog = MergeinfoCatalog::new();
        catalog.set(AbsPath::normalize("/x"), Mergeinfo::parse("/a:1-5\n").unwrap());
        let mut other = MergeinfoCatalog::new();
        other.set(AbsPath::normalize("/x"), Mergeinfo::parse("/a:4-10\n").unwrap());
        catalog.merge_in_place(&other);
        let a = AbsPath::normalize("/a");
        assert_eq!(
            catalog.get(&AbsPath::normalize("/x")).unwrap().get(&a).unwrap(),
            &vec![r(0, 10, true)]
        );
    }
}
