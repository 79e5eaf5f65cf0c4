//
// Flat constant lattice over 64-bit integers
//

use crate::analysis::generic::AbstractDomain;

#[derive(Eq, PartialEq, Ord, PartialOrd, Copy, Clone, Hash, Debug)]
pub enum ConstantDomain {
    Bottom,
    Value(i64),
    Top,
}

impl ConstantDomain {
    pub fn get_constant(&self) -> Option<i64> {
        match self {
            Self::Value(v) => Some(*v),
            Self::Bottom | Self::Top => None,
        }
    }
}

impl AbstractDomain for ConstantDomain {
    fn top() -> Self {
        ConstantDomain::Top
    }

    fn bottom() -> Self {
        ConstantDomain::Bottom
    }

    fn join(&self, other: &Self) -> Self {
        use ConstantDomain::*;
        match (self, other) {
            (Bottom, x) | (x, Bottom) => *x,
            (Value(x), Value(y)) if x == y => Value(*x),
            _ => Top,
        }
    }

    fn meet(&self, other: &Self) -> Self {
        use ConstantDomain::*;
        match (self, other) {
            (Top, x) | (x, Top) => *x,
            (Value(x), Value(y)) if x == y => Value(*x),
            _ => Bottom,
        }
    }

    fn leq(&self, other: &Self) -> bool {
        use ConstantDomain::*;
        match (self, other) {
            (Bottom, _) => true,
            (_, Top) => true,
            (Value(x), Value(y)) => x == y,
            _ => false,
        }
    }
}
