//
// Abstract environments: finite maps into the signed-constant domain
//

use std::collections::HashMap;
use std::hash::Hash;

use crate::analysis::generic::AbstractDomain;
use crate::analysis::signed::SignedConstantDomain;
use crate::ir::bridge::value::{FieldSlot, Register};

/// A point-wise lifting of the signed-constant domain over any key space.
///
/// Absent keys mean Top, and Top bindings are never stored, so structural
/// equality coincides with semantic equality. Storing a bottom binding
/// poisons the whole environment: an environment with an impossible binding
/// describes no concrete state at all.
#[derive(Eq, PartialEq, Clone, Debug)]
pub struct AbstractEnvironment<K: Eq + Hash + Clone> {
    /// `None` is the bottom environment
    bindings: Option<HashMap<K, SignedConstantDomain>>,
}

impl<K: Eq + Hash + Clone> AbstractEnvironment<K> {
    pub fn get(&self, key: &K) -> SignedConstantDomain {
        match &self.bindings {
            None => SignedConstantDomain::bottom(),
            Some(map) => map
                .get(key)
                .copied()
                .unwrap_or_else(SignedConstantDomain::top),
        }
    }

    pub fn set(&mut self, key: K, value: SignedConstantDomain) {
        let Some(map) = &mut self.bindings else {
            // already bottom, nothing can resurrect it
            return;
        };
        if value.is_bottom() {
            self.bindings = None;
        } else if value.is_top() {
            map.remove(&key);
        } else {
            map.insert(key, value);
        }
    }

    /// Forget everything known about a key
    pub fn clear(&mut self, key: &K) {
        if let Some(map) = &mut self.bindings {
            map.remove(key);
        }
    }

    fn combine<F>(&self, other: &Self, op: F) -> Self
    where
        F: Fn(&SignedConstantDomain, &SignedConstantDomain) -> SignedConstantDomain,
    {
        let (lhs, rhs) = match (&self.bindings, &other.bindings) {
            (None, _) => return other.clone(),
            (_, None) => return self.clone(),
            (Some(lhs), Some(rhs)) => (lhs, rhs),
        };
        // keys absent on either side are Top and join away
        let mut map = HashMap::new();
        for (key, value) in lhs {
            if let Some(other_value) = rhs.get(key) {
                let combined = op(value, other_value);
                if !combined.is_top() {
                    map.insert(key.clone(), combined);
                }
            }
        }
        Self {
            bindings: Some(map),
        }
    }
}

impl<K: Eq + Hash + Clone + std::fmt::Debug> AbstractDomain for AbstractEnvironment<K> {
    fn top() -> Self {
        Self {
            bindings: Some(HashMap::new()),
        }
    }

    fn bottom() -> Self {
        Self { bindings: None }
    }

    fn join(&self, other: &Self) -> Self {
        self.combine(other, |a, b| a.join(b))
    }

    fn meet(&self, other: &Self) -> Self {
        let (lhs, rhs) = match (&self.bindings, &other.bindings) {
            (None, _) | (_, None) => return Self::bottom(),
            (Some(lhs), Some(rhs)) => (lhs, rhs),
        };
        let mut result = Self::top();
        for (key, value) in lhs {
            result.set(key.clone(), *value);
        }
        for (key, value) in rhs {
            let met = result.get(key).meet(value);
            result.set(key.clone(), met);
            if result.is_bottom() {
                return result;
            }
        }
        result
    }

    fn widen(&self, previous: &Self) -> Self {
        self.combine(previous, |a, b| a.widen(b))
    }

    fn leq(&self, other: &Self) -> bool {
        match (&self.bindings, &other.bindings) {
            (None, _) => true,
            (_, None) => false,
            (Some(_), Some(rhs)) => {
                // every constraint on the right must be implied on the left
                rhs.iter().all(|(key, value)| self.get(key).leq(value))
            }
        }
    }

    fn is_bottom(&self) -> bool {
        self.bindings.is_none()
    }

    fn is_top(&self) -> bool {
        matches!(&self.bindings, Some(map) if map.is_empty())
    }
}

/// The full dataflow state: one environment over registers and a parallel
/// one over static fields, with identical semantics
#[derive(Eq, PartialEq, Clone, Debug)]
pub struct ConstantState {
    regs: AbstractEnvironment<Register>,
    fields: AbstractEnvironment<FieldSlot>,
}

impl ConstantState {
    pub fn get_reg(&self, reg: Register) -> SignedConstantDomain {
        self.regs.get(&reg)
    }

    pub fn set_reg(&mut self, reg: Register, value: SignedConstantDomain) {
        self.regs.set(reg, value);
        self.normalize();
    }

    pub fn get_field(&self, field: FieldSlot) -> SignedConstantDomain {
        self.fields.get(&field)
    }

    pub fn set_field(&mut self, field: FieldSlot, value: SignedConstantDomain) {
        self.fields.set(field, value);
        self.normalize();
    }

    /// Forget all static-field knowledge (a callee may write any of them)
    pub fn clear_fields(&mut self) {
        if !self.is_bottom() {
            self.fields = AbstractEnvironment::top();
        }
    }

    // an impossible binding anywhere makes the whole state unreachable
    fn normalize(&mut self) {
        if self.regs.is_bottom() || self.fields.is_bottom() {
            *self = Self::bottom();
        }
    }
}

impl AbstractDomain for ConstantState {
    fn top() -> Self {
        Self {
            regs: AbstractEnvironment::top(),
            fields: AbstractEnvironment::top(),
        }
    }

    fn bottom() -> Self {
        Self {
            regs: AbstractEnvironment::bottom(),
            fields: AbstractEnvironment::bottom(),
        }
    }

    fn join(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone();
        }
        if other.is_bottom() {
            return self.clone();
        }
        Self {
            regs: self.regs.join(&other.regs),
            fields: self.fields.join(&other.fields),
        }
    }

    fn meet(&self, other: &Self) -> Self {
        let mut result = Self {
            regs: self.regs.meet(&other.regs),
            fields: self.fields.meet(&other.fields),
        };
        result.normalize();
        result
    }

    fn widen(&self, previous: &Self) -> Self {
        if self.is_bottom() {
            return previous.clone();
        }
        if previous.is_bottom() {
            return self.clone();
        }
        Self {
            regs: self.regs.widen(&previous.regs),
            fields: self.fields.widen(&previous.fields),
        }
    }

    fn leq(&self, other: &Self) -> bool {
        if self.is_bottom() {
            return true;
        }
        if other.is_bottom() {
            return false;
        }
        self.regs.leq(&other.regs) && self.fields.leq(&other.fields)
    }

    fn is_bottom(&self) -> bool {
        self.regs.is_bottom() || self.fields.is_bottom()
    }

    fn is_top(&self) -> bool {
        self.regs.is_top() && self.fields.is_top()
    }
}
