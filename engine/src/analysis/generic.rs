use std::fmt::Debug;

/// An abstract domain which forms a lattice
pub trait AbstractDomain: Clone + Eq + Debug {
    /// Get the Top value of this lattice
    fn top() -> Self;

    /// Get the Bottom value of this lattice
    fn bottom() -> Self;

    /// Join two abstract values
    fn join(&self, other: &Self) -> Self;

    /// Meet two abstract values
    fn meet(&self, other: &Self) -> Self;

    /// Widening of the current value against the previous iteration.
    /// Every domain here has finite height, so the join is already a
    /// terminating widening; taller domains can override.
    fn widen(&self, previous: &Self) -> Self {
        self.join(previous)
    }

    /// Partial-order comparison: is `self` at or below `other`?
    fn leq(&self, other: &Self) -> bool;

    fn is_top(&self) -> bool {
        *self == Self::top()
    }

    fn is_bottom(&self) -> bool {
        *self == Self::bottom()
    }
}
