use crate::vm::Choice;

/// Stores a range, with conservative calculations to guarantee that it always
/// contains the actual value.
///
/// An interval is either `[lower, upper]` with `lower <= upper`, or the `NaN`
/// interval, which represents an undefined result (e.g. the square root of a
/// range containing negative values).  The renderer treats the `NaN` interval
/// as ambiguous.
///
/// # Warning
/// This implementation does not set rounding modes, so it may not be _perfect_.
#[derive(Copy, Clone, PartialEq)]
#[repr(C)]
pub struct Interval {
    lower: f32,
    upper: f32,
}

impl std::fmt::Debug for Interval {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> Result<(), std::fmt::Error> {
        f.debug_tuple("")
            .field(&self.lower)
            .field(&self.upper)
            .finish()
    }
}

impl Default for Interval {
    fn default() -> Self {
        Interval::from(0.0)
    }
}

impl Interval {
    /// Builds a new interval
    ///
    /// # Panics
    /// Panics if the resulting interval would be invalid, i.e. if
    /// `lower > upper` or if only one bound is `NaN`.
    #[inline]
    pub fn new(lower: f32, upper: f32) -> Self {
        assert!(
            upper >= lower || (lower.is_nan() && upper.is_nan()),
            "invalid interval [{lower}, {upper}]"
        );
        Self { lower, upper }
    }
    /// Builds a new interval, returning the `NaN` interval if the bounds are
    /// not valid (e.g. after `inf - inf`)
    #[inline]
    fn new_or_nan(lower: f32, upper: f32) -> Self {
        if lower <= upper {
            Self { lower, upper }
        } else {
            f32::NAN.into()
        }
    }
    /// Returns the lower bound of the interval
    #[inline]
    pub fn lower(&self) -> f32 {
        self.lower
    }
    /// Returns the upper bound of the interval
    #[inline]
    pub fn upper(&self) -> f32 {
        self.upper
    }
    /// Checks whether the given value is contained in the interval
    #[inline]
    pub fn contains(&self, v: f32) -> bool {
        v >= self.lower && v <= self.upper
    }
    /// Returns `true` if either bound of the interval is `NaN`
    pub fn has_nan(&self) -> bool {
        self.lower.is_nan() || self.upper.is_nan()
    }
    /// Calculates the absolute value of the interval
    pub fn abs(self) -> Self {
        if self.lower < 0.0 {
            if self.upper > 0.0 {
                Interval::new(0.0, self.upper.max(-self.lower))
            } else {
                Interval::new(-self.upper, -self.lower)
            }
        } else {
            self
        }
    }
    /// Squares the interval
    ///
    /// Note that this has tighter bounds than multiplication, because we know
    /// that both sides of the multiplication are the same value.
    pub fn square(self) -> Self {
        if self.upper < 0.0 {
            Interval::new(self.upper.powi(2), self.lower.powi(2))
        } else if self.lower > 0.0 {
            Interval::new(self.lower.powi(2), self.upper.powi(2))
        } else if self.has_nan() {
            f32::NAN.into()
        } else {
            Interval::new(0.0, self.lower.abs().max(self.upper.abs()).powi(2))
        }
    }
    /// Calculates the square root of the interval
    ///
    /// If the interval contains values below 0, returns a `NaN` interval.
    pub fn sqrt(self) -> Self {
        if self.lower < 0.0 {
            f32::NAN.into()
        } else {
            Interval::new(self.lower.sqrt(), self.upper.sqrt())
        }
    }
    /// Calculates the reciprocal of the interval
    ///
    /// If the interval includes 0, returns the `NaN` interval
    pub fn recip(self) -> Self {
        if self.lower > 0.0 || self.upper < 0.0 {
            Interval::new(1.0 / self.upper, 1.0 / self.lower)
        } else {
            f32::NAN.into()
        }
    }
    /// Calculates the minimum of two intervals
    ///
    /// Returns both the result and a [`Choice`] indicating whether one side is
    /// always less than the other.
    ///
    /// If either side is `NaN`, returns the `NaN` interval and `Choice::Both`.
    pub fn min_choice(self, rhs: Self) -> (Self, Choice) {
        if self.has_nan() || rhs.has_nan() {
            return (f32::NAN.into(), Choice::Both);
        }
        let choice = if self.upper < rhs.lower {
            Choice::Left
        } else if rhs.upper < self.lower {
            Choice::Right
        } else {
            Choice::Both
        };
        (
            Interval::new(self.lower.min(rhs.lower), self.upper.min(rhs.upper)),
            choice,
        )
    }
    /// Calculates the maximum of two intervals
    ///
    /// Returns both the result and a [`Choice`] indicating whether one side is
    /// always greater than the other.
    ///
    /// If either side is `NaN`, returns the `NaN` interval and `Choice::Both`.
    pub fn max_choice(self, rhs: Self) -> (Self, Choice) {
        if self.has_nan() || rhs.has_nan() {
            return (f32::NAN.into(), Choice::Both);
        }
        let choice = if self.lower > rhs.upper {
            Choice::Left
        } else if rhs.lower > self.upper {
            Choice::Right
        } else {
            Choice::Both
        };
        (
            Interval::new(self.lower.max(rhs.lower), self.upper.max(rhs.upper)),
            choice,
        )
    }

    /// Returns the midpoint of the interval
    pub fn midpoint(self) -> f32 {
        (self.lower + self.upper) / 2.0
    }

    /// Calculates the width of the interval
    ///
    /// ```
    /// # use heightmap::types::Interval;
    /// let a = Interval::new(2.0, 3.0);
    /// assert_eq!(a.width(), 1.0);
    /// let b = Interval::new(2.0, 5.0);
    /// assert_eq!(b.width(), 3.0);
    /// ```
    pub fn width(self) -> f32 {
        self.upper - self.lower
    }

    /// Checks that the two values are roughly equal, panicking otherwise
    #[cfg(test)]
    pub(crate) fn compare_eq(&self, other: Self) {
        let d = (self.lower - other.lower)
            .abs()
            .max((self.upper - other.upper).abs());
        if d >= 1e-6 {
            panic!("lhs != rhs ({self:?} != {other:?})");
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}

impl From<[f32; 2]> for Interval {
    fn from(i: [f32; 2]) -> Interval {
        Interval::new(i[0], i[1])
    }
}

impl From<f32> for Interval {
    fn from(f: f32) -> Self {
        Interval::new(f, f)
    }
}

impl std::ops::Add<Interval> for Interval {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        if self.has_nan() || rhs.has_nan() {
            return f32::NAN.into();
        }
        Interval::new_or_nan(self.lower + rhs.lower, self.upper + rhs.upper)
    }
}

/// Returns the smallest interval containing every product / quotient
fn corners(a: Interval, b: Interval, f: impl Fn(f32, f32) -> f32) -> Interval {
    let mut lower = f32::INFINITY;
    let mut upper = f32::NEG_INFINITY;
    for i in [a.lower, a.upper] {
        for j in [b.lower, b.upper] {
            let v = f(i, j);
            if v.is_nan() {
                return f32::NAN.into();
            }
            lower = lower.min(v);
            upper = upper.max(v);
        }
    }
    Interval::new_or_nan(lower, upper)
}

impl std::ops::Mul<Interval> for Interval {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        if self.has_nan() || rhs.has_nan() {
            return f32::NAN.into();
        }
        corners(self, rhs, |a, b| a * b)
    }
}

impl std::ops::Div<Interval> for Interval {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        if self.has_nan() {
            return f32::NAN.into();
        }
        if rhs.lower > 0.0 || rhs.upper < 0.0 {
            corners(self, rhs, |a, b| a / b)
        } else {
            f32::NAN.into()
        }
    }
}

impl std::ops::Sub<Interval> for Interval {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        if self.has_nan() || rhs.has_nan() {
            return f32::NAN.into();
        }
        Interval::new_or_nan(self.lower - rhs.upper, self.upper - rhs.lower)
    }
}

impl std::ops::Neg for Interval {
    type Output = Self;
    fn neg(self) -> Self {
        Interval::new(-self.upper, -self.lower)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_min_max_choice() {
        let a = Interval::new(0.0, 1.0);
        let b = Interval::new(0.5, 1.5);
        let (v, c) = a.min_choice(b);
        assert_eq!(v, [0.0, 1.0].into());
        assert_eq!(c, Choice::Both);

        let b = Interval::new(2.0, 3.0);
        let (v, c) = a.min_choice(b);
        assert_eq!(v, [0.0, 1.0].into());
        assert_eq!(c, Choice::Left);

        let (v, c) = a.max_choice(b);
        assert_eq!(v, [2.0, 3.0].into());
        assert_eq!(c, Choice::Right);

        let (v, c) = a.max_choice(f32::NAN.into());
        assert!(v.has_nan());
        assert_eq!(c, Choice::Both);
    }

    #[test]
    fn test_mul() {
        let a = Interval::new(-1.0, 2.0);
        let b = Interval::new(-3.0, 0.5);
        (a * b).compare_eq(Interval::new(-6.0, 3.0));

        let b = Interval::new(2.0, 3.0);
        (a * b).compare_eq(Interval::new(-3.0, 6.0));
    }

    #[test]
    fn test_div() {
        let a = Interval::new(1.0, 2.0);
        (a / Interval::new(2.0, 4.0)).compare_eq(Interval::new(0.25, 1.0));
        assert!((a / Interval::new(-1.0, 1.0)).has_nan());
    }

    #[test]
    fn test_square_abs() {
        let a = Interval::new(-3.0, 2.0);
        assert_eq!(a.square(), Interval::new(0.0, 9.0));
        assert_eq!(a.abs(), Interval::new(0.0, 3.0));

        let b = Interval::new(-3.0, -2.0);
        assert_eq!(b.square(), Interval::new(4.0, 9.0));
        assert_eq!(b.abs(), Interval::new(2.0, 3.0));
    }

    #[test]
    fn test_sqrt() {
        assert_eq!(Interval::new(4.0, 9.0).sqrt(), Interval::new(2.0, 3.0));
        assert!(Interval::new(-1.0, 9.0).sqrt().has_nan());
    }

    #[test]
    fn test_nan_propagation() {
        let n = Interval::from(f32::NAN);
        let a = Interval::new(0.0, 1.0);
        assert!((n + a).has_nan());
        assert!((a - n).has_nan());
        assert!((n * a).has_nan());
        assert!(n.square().has_nan());

        // Neither bound test succeeds, which is how callers detect ambiguity
        assert!(!(n.upper() < 0.0));
        assert!(!(n.lower() > 0.0));
    }

    #[test]
    #[should_panic]
    fn test_invalid() {
        Interval::new(1.0, 0.0);
    }
}
