//
// Reduced product of the sign interval and the flat constant lattice
//

use crate::analysis::constant::ConstantDomain;
use crate::analysis::generic::AbstractDomain;
use crate::analysis::sign::Interval;

/// A sign interval and a flat constant, each propagating into the other.
/// The representation is kept reduced at all times:
/// - an `Eqz` interval forces the constant down to zero;
/// - a known constant forces the interval down to its tightest sign, and a
///   constant outside the interval collapses the pair to bottom;
/// - bottom in either coordinate is bottom in both.
#[derive(Eq, PartialEq, Copy, Clone, Hash, Debug)]
pub struct SignedConstantDomain {
    interval: Interval,
    constant: ConstantDomain,
}

impl SignedConstantDomain {
    fn reduce(self) -> Self {
        let Self {
            mut interval,
            mut constant,
        } = self;

        if interval == Interval::Eqz {
            constant = constant.meet(&ConstantDomain::Value(0));
        }
        if let Some(v) = constant.get_constant() {
            if !interval.contains(v) {
                return Self::bottom();
            }
            interval = interval.meet(&Interval::from_int(v));
        }
        if interval.is_bottom() || constant.is_bottom() {
            return Self::bottom();
        }
        Self { interval, constant }
    }

    pub fn from_value(v: i64) -> Self {
        Self {
            interval: Interval::All,
            constant: ConstantDomain::Value(v),
        }
        .reduce()
    }

    pub fn from_interval(interval: Interval) -> Self {
        Self {
            interval,
            constant: ConstantDomain::Top,
        }
        .reduce()
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn get_constant(&self) -> Option<i64> {
        self.constant.get_constant()
    }

    /// Largest value consistent with this abstraction
    pub fn max_element(&self) -> i64 {
        match self.get_constant() {
            Some(v) => v,
            None => self.interval.max_value(),
        }
    }

    /// Smallest value consistent with this abstraction
    pub fn min_element(&self) -> i64 {
        match self.get_constant() {
            Some(v) => v,
            None => self.interval.min_value(),
        }
    }

    /// Membership of a concrete value
    pub fn contains(&self, v: i64) -> bool {
        self.interval.contains(v)
            && match self.get_constant() {
                Some(c) => c == v,
                None => !self.constant.is_bottom(),
            }
    }
}

impl AbstractDomain for SignedConstantDomain {
    fn top() -> Self {
        Self {
            interval: Interval::All,
            constant: ConstantDomain::Top,
        }
    }

    fn bottom() -> Self {
        Self {
            interval: Interval::Bottom,
            constant: ConstantDomain::Bottom,
        }
    }

    fn join(&self, other: &Self) -> Self {
        Self {
            interval: self.interval.join(&other.interval),
            constant: self.constant.join(&other.constant),
        }
        .reduce()
    }

    fn meet(&self, other: &Self) -> Self {
        Self {
            interval: self.interval.meet(&other.interval),
            constant: self.constant.meet(&other.constant),
        }
        .reduce()
    }

    fn leq(&self, other: &Self) -> bool {
        self.interval.leq(&other.interval) && self.constant.leq(&other.constant)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn interval_strategy() -> impl Strategy<Value = Interval> {
        prop_oneof![
            Just(Interval::Bottom),
            Just(Interval::Eqz),
            Just(Interval::Ltz),
            Just(Interval::Gtz),
            Just(Interval::Lez),
            Just(Interval::Gez),
            Just(Interval::Nez),
            Just(Interval::All),
        ]
    }

    fn constant_strategy() -> impl Strategy<Value = ConstantDomain> {
        prop_oneof![
            Just(ConstantDomain::Bottom),
            Just(ConstantDomain::Top),
            prop_oneof![
                Just(-2i64),
                Just(-1i64),
                Just(0i64),
                Just(1i64),
                Just(2i64),
                any::<i64>()
            ]
            .prop_map(ConstantDomain::Value),
        ]
    }

    // arbitrary reduced element of the product
    fn domain_strategy() -> impl Strategy<Value = SignedConstantDomain> {
        (interval_strategy(), constant_strategy()).prop_map(|(interval, constant)| {
            SignedConstantDomain { interval, constant }.reduce()
        })
    }

    proptest! {
        /// Reduction leaves an already-reduced element alone.
        #[test]
        fn reduce_is_idempotent(x in domain_strategy()) {
            prop_assert_eq!(x.reduce(), x);
        }

        /// `from_value` abstracts the value it was built from.
        #[test]
        fn from_value_is_sound(v in any::<i64>()) {
            prop_assert!(SignedConstantDomain::from_value(v).contains(v));
        }

        #[test]
        fn join_is_commutative(x in domain_strategy(), y in domain_strategy()) {
            prop_assert_eq!(x.join(&y), y.join(&x));
        }

        #[test]
        fn meet_is_commutative(x in domain_strategy(), y in domain_strategy()) {
            prop_assert_eq!(x.meet(&y), y.meet(&x));
        }

        #[test]
        fn join_is_associative(
            x in domain_strategy(),
            y in domain_strategy(),
            z in domain_strategy(),
        ) {
            prop_assert_eq!(x.join(&y).join(&z), x.join(&y.join(&z)));
        }

        #[test]
        fn meet_is_associative(
            x in domain_strategy(),
            y in domain_strategy(),
            z in domain_strategy(),
        ) {
            prop_assert_eq!(x.meet(&y).meet(&z), x.meet(&y.meet(&z)));
        }

        /// x ⊔ (x ⊓ y) = x and x ⊓ (x ⊔ y) = x.
        #[test]
        fn absorption(x in domain_strategy(), y in domain_strategy()) {
            prop_assert_eq!(x.join(&x.meet(&y)), x);
            prop_assert_eq!(x.meet(&x.join(&y)), x);
        }

        /// Bottom is the identity of join, top the identity of meet.
        #[test]
        fn identities(x in domain_strategy()) {
            prop_assert_eq!(SignedConstantDomain::bottom().join(&x), x);
            prop_assert_eq!(SignedConstantDomain::top().meet(&x), x);
        }

        /// Join is an upper bound and meet a lower bound.
        #[test]
        fn order_consistency(x in domain_strategy(), y in domain_strategy()) {
            prop_assert!(x.leq(&x.join(&y)));
            prop_assert!(x.meet(&y).leq(&x));
        }
    }
}
