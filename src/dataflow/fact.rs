// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Dataflow fact containers: the constant-propagation lattice, variable
//! maps over it, and variable sets for liveness.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::ir::{StmtId, VarId};

/// The three-level constant-propagation lattice over `i32`.
///
/// `Undef` is bottom, `Nac` ("not a constant") is top. The meet is the
/// greatest lower bound under `Undef ⊑ Const(c) ⊑ Nac`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CpValue {
    Undef,
    Const(i32),
    Nac,
}

impl CpValue {
    pub fn is_undef(self) -> bool {
        matches!(self, CpValue::Undef)
    }

    pub fn is_const(self) -> bool {
        matches!(self, CpValue::Const(_))
    }

    pub fn is_nac(self) -> bool {
        matches!(self, CpValue::Nac)
    }

    pub fn const_value(self) -> Option<i32> {
        match self {
            CpValue::Const(c) => Some(c),
            _ => None,
        }
    }

    /// The meet of two values; commutative, associative and idempotent.
    pub fn meet(v1: CpValue, v2: CpValue) -> CpValue {
        match (v1, v2) {
            (CpValue::Nac, _) | (_, CpValue::Nac) => CpValue::Nac,
            (CpValue::Undef, v) | (v, CpValue::Undef) => v,
            (CpValue::Const(a), CpValue::Const(b)) => {
                if a == b {
                    CpValue::Const(a)
                } else {
                    CpValue::Nac
                }
            }
        }
    }
}

/// A map from variables to [`CpValue`]s; absent variables are `Undef`.
/// `Undef` is never stored explicitly.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct CpFact {
    map: HashMap<VarId, CpValue>,
}

impl CpFact {
    pub fn new() -> Self {
        CpFact {
            map: HashMap::new(),
        }
    }

    pub fn get(&self, var: VarId) -> CpValue {
        self.map.get(&var).copied().unwrap_or(CpValue::Undef)
    }

    /// Binds `var` to `value`; returns true iff the stored value changed.
    pub fn update(&mut self, var: VarId, value: CpValue) -> bool {
        if value.is_undef() {
            self.map.remove(&var).is_some()
        } else {
            self.map.insert(var, value) != Some(value)
        }
    }

    /// Drops the binding of `var` (back to `Undef`).
    pub fn remove(&mut self, var: VarId) -> bool {
        self.map.remove(&var).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VarId, CpValue)> + '_ {
        self.map.iter().map(|(&v, &val)| (v, val))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// A set of items with union as the meet, used for live variables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetFact<T: Eq + Hash + Copy> {
    set: HashSet<T>,
}

impl<T: Eq + Hash + Copy> SetFact<T> {
    pub fn new() -> Self {
        SetFact {
            set: HashSet::new(),
        }
    }

    pub fn contains(&self, item: T) -> bool {
        self.set.contains(&item)
    }

    pub fn insert(&mut self, item: T) -> bool {
        self.set.insert(item)
    }

    pub fn remove(&mut self, item: T) -> bool {
        self.set.remove(&item)
    }

    /// `self = self ∪ other`; returns true if `self` grew.
    pub fn union(&mut self, other: &SetFact<T>) -> bool {
        let before = self.set.len();
        self.set.extend(other.set.iter().copied());
        self.set.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.set.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

impl<T: Eq + Hash + Copy> Default for SetFact<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-node IN/OUT facts produced by a solver.
#[derive(Debug)]
pub struct DataflowResult<F> {
    in_facts: HashMap<StmtId, F>,
    out_facts: HashMap<StmtId, F>,
}

impl<F> DataflowResult<F> {
    pub fn new() -> Self {
        DataflowResult {
            in_facts: HashMap::new(),
            out_facts: HashMap::new(),
        }
    }

    pub fn in_fact(&self, node: StmtId) -> &F {
        &self.in_facts[&node]
    }

    pub fn out_fact(&self, node: StmtId) -> &F {
        &self.out_facts[&node]
    }

    pub fn get_in_fact(&self, node: StmtId) -> Option<&F> {
        self.in_facts.get(&node)
    }

    pub fn get_out_fact(&self, node: StmtId) -> Option<&F> {
        self.out_facts.get(&node)
    }

    pub fn set_in_fact(&mut self, node: StmtId, fact: F) {
        self.in_facts.insert(node, fact);
    }

    pub fn set_out_fact(&mut self, node: StmtId, fact: F) {
        self.out_facts.insert(node, fact);
    }

    pub(crate) fn out_fact_mut(&mut self, node: StmtId) -> &mut F {
        self.out_facts.get_mut(&node).expect("uninitialized OUT fact")
    }

    pub(crate) fn in_fact_mut(&mut self, node: StmtId) -> &mut F {
        self.in_facts.get_mut(&node).expect("uninitialized IN fact")
    }
}

impl<F> Default for DataflowResult<F> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::bit_vec::Idx;

    const VALUES: [CpValue; 4] = [
        CpValue::Undef,
        CpValue::Const(1),
        CpValue::Const(2),
        CpValue::Nac,
    ];

    #[test]
    fn meet_is_commutative_and_associative() {
        for a in VALUES {
            for b in VALUES {
                assert_eq!(CpValue::meet(a, b), CpValue::meet(b, a));
                for c in VALUES {
                    assert_eq!(
                        CpValue::meet(a, CpValue::meet(b, c)),
                        CpValue::meet(CpValue::meet(a, b), c)
                    );
                }
            }
        }
    }

    #[test]
    fn meet_identities() {
        for a in VALUES {
            assert_eq!(CpValue::meet(a, a), a);
            assert_eq!(CpValue::meet(a, CpValue::Undef), a);
            assert_eq!(CpValue::meet(a, CpValue::Nac), CpValue::Nac);
        }
        assert_eq!(
            CpValue::meet(CpValue::Const(1), CpValue::Const(2)),
            CpValue::Nac
        );
    }

    #[test]
    fn fact_update_reports_change() {
        let x = VarId::new(0);
        let mut fact = CpFact::new();
        assert_eq!(fact.get(x), CpValue::Undef);
        assert!(fact.update(x, CpValue::Const(1)));
        assert!(!fact.update(x, CpValue::Const(1)));
        assert!(fact.update(x, CpValue::Nac));
        assert!(fact.update(x, CpValue::Undef));
        assert_eq!(fact.get(x), CpValue::Undef);
        assert!(fact.is_empty());
    }
}
