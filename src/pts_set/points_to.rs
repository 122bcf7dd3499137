// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;

use crate::util::bit_vec::{BitIter, BitVec, Idx};

/// Sets stay in the inline vector representation up to this many elements.
const SMALL_SET_CAPACITY: usize = 16;

/// The capability surface every points-to set representation provides.
/// Elements are newtyped indices into an object arena; sets only ever grow
/// during solving.
pub trait PointsToSet<T> {
    type Iter<'a>: Iterator<Item = T>
    where
        Self: 'a;

    fn new() -> Self;
    fn clear(&mut self);
    fn count(&self) -> usize;
    fn is_empty(&self) -> bool;
    fn contains(&self, elem: T) -> bool;
    fn superset(&self, other: &Self) -> bool;
    fn insert(&mut self, elem: T) -> bool;
    fn remove(&mut self, elem: T) -> bool;
    fn union(&mut self, other: &Self) -> bool;
    fn subtract(&mut self, other: &Self) -> bool;
    fn iter(&self) -> Self::Iter<'_>;
}

/// Hybrid points-to set: an unsorted inline vector for the common small
/// sets, spilling into a dense bit vector once the set grows past
/// [`SMALL_SET_CAPACITY`].
#[derive(Clone)]
pub struct HybridPointsToSet<T> {
    repr: Repr<T>,
}

#[derive(Clone)]
enum Repr<T> {
    Small(Vec<T>),
    Large(BitVec<T>),
}

impl<T: Idx> HybridPointsToSet<T> {
    fn spill(&mut self) {
        if let Repr::Small(elems) = &self.repr {
            let mut large = BitVec::new();
            for &e in elems {
                large.insert(e);
            }
            self.repr = Repr::Large(large);
        }
    }

    fn as_large(&self) -> BitVec<T> {
        match &self.repr {
            Repr::Small(elems) => {
                let mut bv = BitVec::new();
                for &e in elems {
                    bv.insert(e);
                }
                bv
            }
            Repr::Large(bv) => bv.clone(),
        }
    }
}

impl<T: Idx> PointsToSet<T> for HybridPointsToSet<T> {
    type Iter<'a> = HybridIter<'a, T>;

    fn new() -> Self {
        HybridPointsToSet {
            repr: Repr::Small(Vec::new()),
        }
    }

    fn clear(&mut self) {
        self.repr = Repr::Small(Vec::new());
    }

    fn count(&self) -> usize {
        match &self.repr {
            Repr::Small(elems) => elems.len(),
            Repr::Large(bv) => bv.count(),
        }
    }

    fn is_empty(&self) -> bool {
        match &self.repr {
            Repr::Small(elems) => elems.is_empty(),
            Repr::Large(bv) => bv.is_empty(),
        }
    }

    fn contains(&self, elem: T) -> bool {
        match &self.repr {
            Repr::Small(elems) => elems.contains(&elem),
            Repr::Large(bv) => bv.contains(elem),
        }
    }

    fn superset(&self, other: &Self) -> bool {
        match (&self.repr, &other.repr) {
            (_, Repr::Small(elems)) => elems.iter().all(|&e| self.contains(e)),
            (Repr::Small(_), Repr::Large(_)) => other.iter().all(|e| self.contains(e)),
            (Repr::Large(a), Repr::Large(b)) => a.superset(b),
        }
    }

    fn insert(&mut self, elem: T) -> bool {
        match &mut self.repr {
            Repr::Small(elems) => {
                if elems.contains(&elem) {
                    false
                } else if elems.len() < SMALL_SET_CAPACITY {
                    elems.push(elem);
                    true
                } else {
                    self.spill();
                    self.insert(elem)
                }
            }
            Repr::Large(bv) => bv.insert(elem),
        }
    }

    fn remove(&mut self, elem: T) -> bool {
        match &mut self.repr {
            Repr::Small(elems) => match elems.iter().position(|&e| e == elem) {
                Some(i) => {
                    elems.swap_remove(i);
                    true
                }
                None => false,
            },
            Repr::Large(bv) => bv.remove(elem),
        }
    }

    fn union(&mut self, other: &Self) -> bool {
        match &other.repr {
            Repr::Small(elems) => {
                let mut changed = false;
                for &e in elems {
                    changed |= self.insert(e);
                }
                changed
            }
            Repr::Large(bv) => {
                self.spill();
                let Repr::Large(this) = &mut self.repr else {
                    unreachable!()
                };
                this.union(bv)
            }
        }
    }

    fn subtract(&mut self, other: &Self) -> bool {
        match &mut self.repr {
            Repr::Small(elems) => {
                let before = elems.len();
                elems.retain(|&e| !other.contains(e));
                elems.len() != before
            }
            Repr::Large(bv) => bv.subtract(&other.as_large()),
        }
    }

    fn iter(&self) -> HybridIter<'_, T> {
        match &self.repr {
            Repr::Small(elems) => HybridIter::Small(elems.iter()),
            Repr::Large(bv) => HybridIter::Large(bv.iter()),
        }
    }
}

impl<'a, T: Idx> IntoIterator for &'a HybridPointsToSet<T> {
    type Item = T;
    type IntoIter = HybridIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Idx> fmt::Debug for HybridPointsToSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

pub enum HybridIter<'a, T> {
    Small(std::slice::Iter<'a, T>),
    Large(BitIter<'a, T>),
}

impl<'a, T: Idx> Iterator for HybridIter<'a, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        match self {
            HybridIter::Small(it) => it.next().copied(),
            HybridIter::Large(it) => it.next(),
        }
    }
}
