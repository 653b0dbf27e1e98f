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

//! Component A: the revision-range algebra shared by mergeinfo (§4.5) and
//! the shelf store (§4.6).
//!
//! The set operations below are expressed as a sweep over the breakpoints
//! contributed by both operands rather than as the original two-pointer
//! walk: for each atomic sub-interval between two consecutive breakpoints,
//! membership (and inheritability) in each operand is a single lookup, so
//! the set logic from spec §4.4 applies directly per atomic piece, and
//! [`combine_with_last`] glues adjacent same-inheritance pieces back into
//! canonical form. This is equivalent to `original_source`'s
//! `rangelist_intersect_or_remove`, just expressed without its in-place
//! cursor bookkeeping.

use std::cmp::Ordering;

use itertools::Itertools as _;

/// A repository revision number, or the sentinel [`Revision::INVALID`].
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct Revision(u64);

impl Revision {
    /// The sentinel for "no such revision".
    pub const INVALID: Revision = Revision(u64::MAX);

    /// Revision 0: the empty initial state (spec §3).
    pub const ZERO: Revision = Revision(0);

    pub const fn new(value: u64) -> Self {
        Revision(value)
    }

    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "<invalid>")
        }
    }
}

/// A half-open revision interval `(start, end]`, normally `start < end`.
///
/// Reverse ranges (`start > end`) are produced transiently by
/// [`rangelist_reverse`] to describe reverse-merges (spec glossary) and
/// must not be fed back into the set operations below.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Range {
    pub start: u64,
    pub end: u64,
    pub inheritable: bool,
}

impl Range {
    pub fn new(start: u64, end: u64, inheritable: bool) -> Self {
        assert!(start < end, "ranges are stored normalised: start < end");
        Range {
            start,
            end,
            inheritable,
        }
    }

    /// A single-revision range, the lone-number grammar production
    /// (spec §4.4: "A lone `number` parses as `(number-1, number]`").
    pub fn single(revision: u64, inheritable: bool) -> Self {
        Range::new(revision.saturating_sub(1), revision, inheritable)
    }

    /// `true` iff `start < revision <= end`.
    pub fn contains_revision(&self, revision: u64) -> bool {
        self.start < revision && revision <= self.end
    }

    fn reversed(&self) -> Range {
        Range {
            start: self.end,
            end: self.start,
            inheritable: self.inheritable,
        }
    }
}

/// A canonical, ascending, non-overlapping sequence of [`Range`]s.
pub type RangeList = Vec<Range>;

fn covering(ranges: &[Range], point: u64) -> Option<Range> {
    ranges
        .iter()
        .copied()
        .find(|r| r.contains_revision(point))
}

fn touch_or_overlap(a: Range, b: Range) -> bool {
    a.start <= b.end && b.start <= a.end
}

/// Merges `a` and `b` into a single combined range if they touch/overlap
/// and (when `consider_inheritance`) share the same inheritability.
fn combine_ranges(a: Range, b: Range, consider_inheritance: bool) -> Option<Range> {
    if touch_or_overlap(a, b) && (!consider_inheritance || a.inheritable == b.inheritable) {
        Some(Range {
            start: a.start.min(b.start),
            end: a.end.max(b.end),
            inheritable: a.inheritable || b.inheritable,
        })
    } else {
        None
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Intersection {
    None,
    Equal,
    Adjoining,
    Overlapping,
    ProperSubset,
}

fn classify_intersection(r1: Range, r2: Range) -> Intersection {
    if !(r1.start <= r2.end && r2.start <= r1.end) {
        Intersection::None
    } else if r1.start == r2.start && r1.end == r2.end {
        Intersection::Equal
    } else if r1.end == r2.start || r2.end == r1.start {
        Intersection::Adjoining
    } else if (r1.start <= r2.start && r1.end >= r2.end) || (r2.start <= r1.start && r2.end >= r1.end) {
        Intersection::ProperSubset
    } else {
        Intersection::Overlapping
    }
}

/// Appends `new_range` to `acc`, which must already be canonical, per the
/// `combine_with_last` primitive of spec §4.4.
pub fn combine_with_last(acc: &mut RangeList, new_range: Range, consider_inheritance: bool) {
    let Some(&last) = acc.last() else {
        acc.push(new_range);
        return;
    };

    if !consider_inheritance {
        if let Some(combined) = combine_ranges(last, new_range, false) {
            *acc.last_mut().unwrap() = combined;
        } else {
            acc.push(new_range);
        }
        return;
    }

    if let Some(combined) = combine_ranges(last, new_range, true) {
        *acc.last_mut().unwrap() = combined;
        return;
    }

    match classify_intersection(new_range, last) {
        Intersection::None => acc.push(new_range),
        Intersection::Equal => acc.last_mut().unwrap().inheritable = true,
        Intersection::Adjoining => acc.push(new_range),
        Intersection::Overlapping => {
            acc.pop();
            let (mut r1, mut r2) = (last, new_range);
            if r2.start < r1.start {
                std::mem::swap(&mut r1, &mut r2);
            }
            if r1.inheritable {
                r2.start = r1.end;
            } else {
                r1.end = r2.start;
            }
            acc.push(r1);
            acc.push(r2);
            acc.sort_by_key(|r| r.start);
        }
        Intersection::ProperSubset => {
            acc.pop();
            let (mut r1, mut r2) = (last, new_range);
            if r2.start < r1.start || r2.end > r1.end {
                std::mem::swap(&mut r1, &mut r2);
            }
            let mut r2_out = Some(r2);
            let mut r3_out = None;
            if r1.inheritable {
                r1.start = r1.start.min(r2.start);
                r1.end = r1.end.max(r2.end);
                r2_out = None;
            } else if r1.start == r2.start {
                let old_end = r1.end;
                r1.end = r2.end;
                r2.inheritable = r1.inheritable;
                r1.inheritable = true;
                r2.start = r1.end;
                r2.end = old_end;
                r2_out = Some(r2);
            } else if r1.end == r2.end {
                r1.end = r2.start;
                r2.inheritable = true;
                r2_out = Some(r2);
            } else {
                r3_out = Some(Range {
                    start: r2.end,
                    end: r1.end,
                    inheritable: r1.inheritable,
                });
                r2.inheritable = true;
                r1.end = r2.start;
                r2_out = Some(r2);
            }
            acc.push(r1);
            if let Some(r2) = r2_out {
                acc.push(r2);
            }
            if let Some(r3) = r3_out {
                acc.push(r3);
            }
            acc.sort_by_key(|r| r.start);
        }
    }
}

/// Union of `a` and `b` (spec §4.4). Always ignores inheritance when
/// deciding whether ranges touch, matching `original_source`'s
/// `svn_rangelist_merge`, which takes no `consider_inheritance` parameter.
pub fn rangelist_merge(a: &[Range], b: &[Range]) -> RangeList {
    let mut all: Vec<Range> = a.iter().chain(b.iter()).copied().collect();
    all.sort_by_key(|r| r.start);
    let mut acc = RangeList::new();
    for r in all {
        combine_with_last(&mut acc, r, false);
    }
    acc
}

fn breakpoints(a: &[Range], b: &[Range]) -> Vec<u64> {
    a.iter()
        .flat_map(|r| [r.start, r.end])
        .chain(b.iter().flat_map(|r| [r.start, r.end]))
        .sorted_unstable()
        .dedup()
        .collect()
}

/// Intersection of `a` and `b` (spec §4.4). With `consider_inheritance`,
/// only atomic pieces with matching inheritability in both operands
/// survive; otherwise the result is inheritable iff either operand is.
pub fn rangelist_intersect(a: &[Range], b: &[Range], consider_inheritance: bool) -> RangeList {
    let points = breakpoints(a, b);
    let mut acc = RangeList::new();
    for w in points.windows(2) {
        let (lo, hi) = (w[0], w[1]);
        let (Some(ra), Some(rb)) = (covering(a, hi), covering(b, hi)) else {
            continue;
        };
        if consider_inheritance && ra.inheritable != rb.inheritable {
            continue;
        }
        let inheritable = ra.inheritable || rb.inheritable;
        combine_with_last(&mut acc, Range { start: lo, end: hi, inheritable }, consider_inheritance);
    }
    acc
}

/// Set difference `whiteboard - eraser` (spec §4.4).
pub fn rangelist_remove(eraser: &[Range], whiteboard: &[Range], consider_inheritance: bool) -> RangeList {
    let points = breakpoints(eraser, whiteboard);
    let mut acc = RangeList::new();
    for w in points.windows(2) {
        let (lo, hi) = (w[0], w[1]);
        let Some(ww) = covering(whiteboard, hi) else {
            continue;
        };
        let erased = match covering(eraser, hi) {
            Some(er) => !consider_inheritance || er.inheritable == ww.inheritable,
            None => false,
        };
        if !erased {
            combine_with_last(
                &mut acc,
                Range { start: lo, end: hi, inheritable: ww.inheritable },
                consider_inheritance,
            );
        }
    }
    acc
}

/// `(deleted, added) = (from - to, to - from)` (spec §4.4).
pub fn rangelist_diff(from: &[Range], to: &[Range], consider_inheritance: bool) -> (RangeList, RangeList) {
    let deleted = rangelist_remove(to, from, consider_inheritance);
    let added = rangelist_remove(from, to, consider_inheritance);
    (deleted, added)
}

/// Swaps each range's endpoints and reverses the sequence order, to
/// describe a reverse-merge (spec glossary). The result is not canonical
/// and must not be passed to the other `rangelist_*` functions.
pub fn rangelist_reverse(a: &[Range]) -> Vec<Range> {
    a.iter().rev().map(Range::reversed).collect()
}

/// Retains the portions of `a` that are inheritable. With `bound`, only
/// the non-inheritable portions falling inside `bound` are stripped (the
/// rest of the list, including non-inheritable ranges outside the bound,
/// passes through unchanged); without a bound, every non-inheritable
/// range is dropped outright (spec §4.4; `original_source`'s
/// `svn_rangelist_inheritable`).
pub fn rangelist_inheritable(a: &[Range], bound: Option<(u64, u64)>) -> RangeList {
    match bound {
        Some((start, end)) if start < end => {
            let eraser = [Range { start, end, inheritable: false }];
            rangelist_remove(&eraser, a, true)
        }
        _ => a.iter().copied().filter(|r| r.inheritable).collect(),
    }
}

/// `true` if any range in `a` is non-inheritable.
pub fn has_noninheritable(a: &[Range]) -> bool {
    a.iter().any(|r| !r.inheritable)
}

pub(crate) fn compare_ranges(a: &Range, b: &Range) -> Ordering {
    a.start.cmp(&b.start).then(a.end.cmp(&b.end))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;

    fn r(start: u64, end: u64, inh: bool) -> Range {
        Range::new(start, end, inh)
    }

    #[test]
    fn test_s4_merge() {
        let a = vec![r(0, 5, true), r(10, 15, true)];
        let b = vec![r(4, 11, true)];
        assert_eq!(rangelist_merge(&a, &b), vec![r(0, 15, true)]);
    }

    #[test]
    fn test_s5_remove_ignoring_inheritance() {
        let eraser = vec![r(0, 10, true)];
        let whiteboard = vec![r(5, 15, true)];
        assert_eq!(
            rangelist_remove(&eraser, &whiteboard, false),
            vec![r(10, 15, true)]
        );
    }

    #[test_case(r(89, 420, false), r(0, 100, true), true, vec![] ; "differing inheritance, considered, empty")]
    #[test_case(r(89, 420, false), r(0, 100, true), false, vec![r(89, 100, true)] ; "differing inheritance, ignored, OR'd")]
    #[test_case(r(89, 420, true), r(0, 100, true), true, vec![r(89, 100, true)] ; "matching inheritable, considered")]
    #[test_case(r(89, 420, false), r(0, 100, false), true, vec![r(89, 100, false)] ; "matching noninheritable, considered")]
    fn test_intersect_table(a: Range, b: Range, consider_inheritance: bool, expected: Vec<Range>) {
        assert_eq!(rangelist_intersect(&[a], &[b], consider_inheritance), expected);
    }

    #[test]
    fn test_invariant_self_merge_intersect_remove() {
        let a = vec![r(0, 5, true), r(10, 20, false)];
        assert_eq!(rangelist_merge(&a, &a), a);
        assert_eq!(rangelist_intersect(&a, &a, false), a);
        assert_eq!(rangelist_remove(&a, &a, false), vec![]);
    }

    #[test]
    fn test_invariant_merge_commutative() {
        let a = vec![r(0, 5, true), r(20, 30, true)];
        let b = vec![r(3, 8, false), r(25, 40, true)];
        assert_eq!(rangelist_merge(&a, &b), rangelist_merge(&b, &a));
    }

    #[test]
    fn test_invariant_diff_reconstructs_to() {
        let from = vec![r(0, 10, true), r(20, 30, true)];
        let to = vec![r(5, 25, true), r(40, 50, true)];
        let (deleted, added) = rangelist_diff(&from, &to, false);
        let reconstructed = rangelist_merge(&rangelist_remove(&deleted, &from, false), &added);
        assert_eq!(reconstructed, to);
    }

    #[test]
    fn test_reverse_swaps_and_flips_order() {
        let a = vec![r(0, 5, true), r(10, 15, false)];
        let reversed = rangelist_reverse(&a);
        assert_eq!(reversed[0].start, 15);
        assert_eq!(reversed[0].end, 10);
        assert_eq!(reversed[1].start, 5);
        assert_eq!(reversed[1].end, 0);
    }

    #[test]
    fn test_inheritable_bound_strips_only_inside() {
        let a = vec![r(0, 10, false), r(20, 30, false), r(40, 50, true)];
        let result = rangelist_inheritable(&a, Some((5, 25)));
        // Non-inheritable ranges outside [5, 25) survive; those inside don't;
        // the inheritable range always survives.
        assert!(result.contains(&r(40, 50, true)));
        assert!(!result.iter().any(|x| x.start == 0));
    }

    #[test]
    fn test_inheritable_no_bound_drops_all_noninheritable() {
        let a = vec![r(0, 10, false), r(40, 50, true)];
        assert_eq!(rangelist_inheritable(&a, None), vec![r(40, 50, true)]);
    }

    #[test]
    fn test_has_noninheritable() {
        assert!(has_noninheritable(&[r(0, 10, false)]));
        assert!(!has_noninheritable(&[r(0, 10, true)]));
    }

    #[test]
    fn test_range_single_is_lone_number_production() {
        assert_eq!(Range::single(5, true), r(4, 5, true));
    }
}
