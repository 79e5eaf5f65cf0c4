//
// Sign intervals: which side of zero a value can be on
//

use crate::analysis::generic::AbstractDomain;

/// The eight intervals expressible relative to zero
#[derive(Eq, PartialEq, Ord, PartialOrd, Copy, Clone, Hash, Debug)]
pub enum Interval {
    Bottom, // no value
    Eqz,    // exactly zero
    Ltz,    // strictly negative
    Gtz,    // strictly positive
    Lez,    // at most zero
    Gez,    // at least zero
    Nez,    // anything but zero
    All,    // any value
}

impl Interval {
    /// The tightest interval holding a single concrete value
    pub fn from_int(v: i64) -> Self {
        match v {
            0 => Self::Eqz,
            _ if v < 0 => Self::Ltz,
            _ => Self::Gtz,
        }
    }

    /// Membership of a concrete value
    pub fn contains(&self, v: i64) -> bool {
        match self {
            Self::Bottom => false,
            Self::Eqz => v == 0,
            Self::Ltz => v < 0,
            Self::Gtz => v > 0,
            Self::Lez => v <= 0,
            Self::Gez => v >= 0,
            Self::Nez => v != 0,
            Self::All => true,
        }
    }

    /// Largest value in the interval (minimum of i64 when empty)
    pub fn max_value(&self) -> i64 {
        match self {
            Self::Bottom => i64::MIN,
            Self::Eqz | Self::Lez => 0,
            Self::Ltz => -1,
            Self::Gtz | Self::Gez | Self::Nez | Self::All => i64::MAX,
        }
    }

    /// Smallest value in the interval (maximum of i64 when empty)
    pub fn min_value(&self) -> i64 {
        match self {
            Self::Bottom => i64::MAX,
            Self::Eqz | Self::Gez => 0,
            Self::Gtz => 1,
            Self::Ltz | Self::Lez | Self::Nez | Self::All => i64::MIN,
        }
    }
}

impl AbstractDomain for Interval {
    fn top() -> Self {
        Interval::All
    }

    fn bottom() -> Self {
        Interval::Bottom
    }

    fn join(&self, other: &Self) -> Self {
        use Interval::*;
        match (*self, *other) {
            (Bottom, x) | (x, Bottom) => x,
            (All, _) | (_, All) => All,
            (x, y) if x == y => x,
            (Eqz, Ltz) | (Ltz, Eqz) => Lez,
            (Eqz, Gtz) | (Gtz, Eqz) => Gez,
            (Eqz, Lez) | (Lez, Eqz) => Lez,
            (Eqz, Gez) | (Gez, Eqz) => Gez,
            (Ltz, Gtz) | (Gtz, Ltz) => Nez,
            (Ltz, Lez) | (Lez, Ltz) => Lez,
            (Ltz, Nez) | (Nez, Ltz) => Nez,
            (Gtz, Gez) | (Gez, Gtz) => Gez,
            (Gtz, Nez) | (Nez, Gtz) => Nez,
            _ => All,
        }
    }

    fn meet(&self, other: &Self) -> Self {
        use Interval::*;
        match (*self, *other) {
            (Bottom, _) | (_, Bottom) => Bottom,
            (All, x) | (x, All) => x,
            (x, y) if x == y => x,
            (Eqz, Lez) | (Lez, Eqz) => Eqz,
            (Eqz, Gez) | (Gez, Eqz) => Eqz,
            (Ltz, Lez) | (Lez, Ltz) => Ltz,
            (Ltz, Nez) | (Nez, Ltz) => Ltz,
            (Gtz, Gez) | (Gez, Gtz) => Gtz,
            (Gtz, Nez) | (Nez, Gtz) => Gtz,
            (Lez, Gez) | (Gez, Lez) => Eqz,
            (Lez, Nez) | (Nez, Lez) => Ltz,
            (Gez, Nez) | (Nez, Gez) => Gtz,
            _ => Bottom,
        }
    }

    fn leq(&self, other: &Self) -> bool {
        self.join(other) == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Interval::*;

    const ELEMENTS: [Interval; 8] = [Bottom, Eqz, Ltz, Gtz, Lez, Gez, Nez, All];
    const SAMPLES: [i64; 7] = [i64::MIN, -17, -1, 0, 1, 42, i64::MAX];

    #[test]
    fn join_table() {
        let expected = [
            // Bottom   Eqz  Ltz  Gtz  Lez  Gez  Nez  All
            [Bottom, Eqz, Ltz, Gtz, Lez, Gez, Nez, All], // Bottom
            [Eqz, Eqz, Lez, Gez, Lez, Gez, All, All],    // Eqz
            [Ltz, Lez, Ltz, Nez, Lez, All, Nez, All],    // Ltz
            [Gtz, Gez, Nez, Gtz, All, Gez, Nez, All],    // Gtz
            [Lez, Lez, Lez, All, Lez, All, All, All],    // Lez
            [Gez, Gez, All, Gez, All, Gez, All, All],    // Gez
            [Nez, All, Nez, Nez, All, All, Nez, All],    // Nez
            [All, All, All, All, All, All, All, All],    // All
        ];
        for (i, x) in ELEMENTS.iter().enumerate() {
            for (j, y) in ELEMENTS.iter().enumerate() {
                assert_eq!(x.join(y), expected[i][j], "{:?} join {:?}", x, y);
            }
        }
    }

    #[test]
    fn meet_table() {
        let expected = [
            // Bottom      Eqz     Ltz     Gtz     Lez     Gez     Nez  All
            [Bottom, Bottom, Bottom, Bottom, Bottom, Bottom, Bottom, Bottom], // Bottom
            [Bottom, Eqz, Bottom, Bottom, Eqz, Eqz, Bottom, Eqz],             // Eqz
            [Bottom, Bottom, Ltz, Bottom, Ltz, Bottom, Ltz, Ltz],             // Ltz
            [Bottom, Bottom, Bottom, Gtz, Bottom, Gtz, Gtz, Gtz],             // Gtz
            [Bottom, Eqz, Ltz, Bottom, Lez, Eqz, Ltz, Lez],                   // Lez
            [Bottom, Eqz, Bottom, Gtz, Eqz, Gez, Gtz, Gez],                   // Gez
            [Bottom, Bottom, Ltz, Gtz, Ltz, Gtz, Nez, Nez],                   // Nez
            [Bottom, Eqz, Ltz, Gtz, Lez, Gez, Nez, All],                      // All
        ];
        for (i, x) in ELEMENTS.iter().enumerate() {
            for (j, y) in ELEMENTS.iter().enumerate() {
                assert_eq!(x.meet(y), expected[i][j], "{:?} meet {:?}", x, y);
            }
        }
    }

    #[test]
    fn lattice_agrees_with_membership() {
        // join is an upper bound and meet is exact on the samples
        for x in ELEMENTS {
            for y in ELEMENTS {
                for v in SAMPLES {
                    if x.contains(v) || y.contains(v) {
                        assert!(x.join(&y).contains(v));
                    }
                    assert_eq!(x.meet(&y).contains(v), x.contains(v) && y.contains(v));
                }
            }
        }
    }

    #[test]
    fn from_int_is_sound_and_tight() {
        for v in SAMPLES {
            let interval = Interval::from_int(v);
            assert!(interval.contains(v));
            // nothing strictly below it still holds the value
            for smaller in ELEMENTS {
                if smaller != interval && smaller.leq(&interval) {
                    assert!(!smaller.contains(v));
                }
            }
        }
    }

    #[test]
    fn bounds() {
        assert_eq!(Ltz.max_value(), -1);
        assert_eq!(Ltz.min_value(), i64::MIN);
        assert_eq!(Gtz.min_value(), 1);
        assert_eq!(Eqz.max_value(), 0);
        assert_eq!(Eqz.min_value(), 0);
        assert_eq!(All.max_value(), i64::MAX);
        assert_eq!(All.min_value(), i64::MIN);
    }
}
