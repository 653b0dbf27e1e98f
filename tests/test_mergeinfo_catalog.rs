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

use svn_conflict_engine::mergeinfo::{Mergeinfo, MergeinfoCatalog};
use svn_conflict_engine::AbsPath;

#[test]
fn test_multi_path_mergeinfo_round_trips_through_the_public_api() {
    let input = "/branches/feature:5-9,12*\n/trunk:1-3\n";
    let parsed = Mergeinfo::parse(input).unwrap();
    assert_eq!(parsed.serialize(), input);

    let feature = AbsPath::normalize("/branches/feature");
    let ranges = parsed.get(&feature).unwrap();
    assert_eq!(ranges.len(), 2);
    assert!(ranges[0].inheritable);
    assert!(!ranges[1].inheritable);
}

#[test]
fn test_catalog_batches_mergeinfo_across_subtree_paths() {
    let mut catalog = MergeinfoCatalog::new();
    catalog.set(
        AbsPath::normalize("/trunk/a.c"),
        Mergeinfo::parse("/branches/b1:1-5\n").unwrap(),
    );
    catalog.set(
        AbsPath::normalize("/trunk/b.c"),
        Mergeinfo::parse("/branches/b1:3-10\n").unwrap(),
    );

    let mut accumulated = Mergeinfo::new();
    for (_, info) in catalog.iter() {
        accumulated.merge_in_place(info);
    }

    let b1 = AbsPath::normalize("/branches/b1");
    assert_eq!(accumulated.serialize(), format!("{b1}:1-10\n"));
}
