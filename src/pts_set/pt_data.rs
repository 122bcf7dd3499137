// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use super::points_to::PointsToSet;
use crate::util::bit_vec::Idx;

/// Points-to storage keyed by pointer-flow-graph nodes.
///
/// `K` is the pointer key (a PFG node id), `D` the element domain (object
/// indices, plain or context-qualified) and `DS` the set representation.
/// Sets are append-only: the solvers compute explicit deltas against the
/// stored sets and only ever union into them.
pub struct PointsToData<K, D, DS> {
    pts_map: HashMap<K, DS>,
    marker: std::marker::PhantomData<D>,
}

impl<K, D, DS> fmt::Debug for PointsToData<K, D, DS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        "PointsToData".fmt(f)
    }
}

impl<K, D, DS> PointsToData<K, D, DS>
where
    K: Hash + Eq + Copy,
    D: Idx,
    DS: PointsToSet<D>,
{
    pub fn new() -> Self {
        PointsToData {
            pts_map: HashMap::new(),
            marker: std::marker::PhantomData,
        }
    }

    /// Points-to set of `key`, if any element has ever been added to it.
    #[inline]
    pub fn get_pts(&self, key: K) -> Option<&DS> {
        self.pts_map.get(&key)
    }

    /// Adds a single element; returns false if it was already present.
    pub fn add_pts(&mut self, key: K, elem: D) -> bool {
        self.pts_map.entry(key).or_insert_with(DS::new).insert(elem)
    }

    /// Performs pts(key) = pts(key) ∪ set; returns true on growth.
    pub fn union_pts_to(&mut self, key: K, set: &DS) -> bool {
        self.pts_map.entry(key).or_insert_with(DS::new).union(set)
    }

    /// The elements of `set` not yet in pts(key).
    pub fn diff_from(&self, key: K, set: &DS) -> DS
    where
        DS: Clone,
    {
        let mut delta = set.clone();
        if let Some(pts) = self.pts_map.get(&key) {
            delta.subtract(pts);
        }
        delta
    }

    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.pts_map.keys().copied()
    }
}

impl<K, D, DS> Default for PointsToData<K, D, DS>
where
    K: Hash + Eq + Copy,
    D: Idx,
    DS: PointsToSet<D>,
{
    fn default() -> Self {
        Self::new()
    }
}
