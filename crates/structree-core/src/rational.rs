//! Exact signed rationals over 64-bit integers.
//!
//! Values are always stored in lowest terms with a positive denominator, so
//! the derived equality and hash are value-based. Intermediate products are
//! computed in 128 bits; a reduced result that does not fit back into 64 bits
//! is reported as [`ArithmeticFault::Overflow`]. `i64::MIN` is never used as a
//! numerator, which keeps negation and absolute value infallible.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ArithmeticFault, ParseRationalError};

/// An immutable exact fraction `numerator / denominator`.
///
/// Invariant: `gcd(|numerator|, denominator) == 1`, `denominator > 0`, and
/// `numerator != i64::MIN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RationalRepr", into = "RationalRepr")]
pub struct Rational {
    numerator: i64,
    denominator: i64,
}

impl Rational {
    pub const ZERO: Self = Self::from_integer(0);
    pub const ONE: Self = Self::from_integer(1);
    pub const MINUS_ONE: Self = Self::from_integer(-1);

    /// Build and reduce a rational, rejecting a zero denominator.
    pub fn new(numerator: i64, denominator: i64) -> Result<Self, ArithmeticFault> {
        reduce(i128::from(numerator), i128::from(denominator), "new")
    }

    /// Whole-number rational.
    #[must_use]
    pub const fn from_integer(value: i32) -> Self {
        Self {
            numerator: value as i64,
            denominator: 1,
        }
    }

    /// Numerator of the reduced form (carries the sign).
    #[must_use]
    pub const fn numerator(self) -> i64 {
        self.numerator
    }

    /// Denominator of the reduced form (always > 0).
    #[must_use]
    pub const fn denominator(self) -> i64 {
        self.denominator
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.numerator == 0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.numerator > 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.numerator < 0
    }

    /// True when the fractional part is zero.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        self.denominator == 1
    }

    /// `-1`, `0`, or `1`.
    #[must_use]
    pub const fn signum(self) -> Self {
        Self::from_integer(self.numerator.signum() as i32)
    }

    /// Magnitude with the sign dropped.
    #[must_use]
    pub const fn abs(self) -> Self {
        Self {
            numerator: self.numerator.abs(),
            denominator: self.denominator,
        }
    }

    pub fn checked_add(self, other: Self) -> Result<Self, ArithmeticFault> {
        let (a, b, c, d) = self.widen(other);
        let numerator = (a * d)
            .checked_add(c * b)
            .ok_or(ArithmeticFault::Overflow { operation: "add" })?;
        reduce(numerator, b * d, "add")
    }

    /// Signed difference `self - other`.
    pub fn checked_sub(self, other: Self) -> Result<Self, ArithmeticFault> {
        let (a, b, c, d) = self.widen(other);
        let numerator = (a * d)
            .checked_sub(c * b)
            .ok_or(ArithmeticFault::Overflow { operation: "sub" })?;
        reduce(numerator, b * d, "sub")
    }

    pub fn checked_mul(self, other: Self) -> Result<Self, ArithmeticFault> {
        let (a, b, c, d) = self.widen(other);
        reduce(a * c, b * d, "mul")
    }

    pub fn checked_div(self, other: Self) -> Result<Self, ArithmeticFault> {
        if other.is_zero() {
            return Err(ArithmeticFault::DivisionByZero { operation: "div" });
        }
        let (a, b, c, d) = self.widen(other);
        reduce(a * d, b * c, "div")
    }

    /// `1 / self`; fails when `self` is zero.
    pub fn reciprocal(self) -> Result<Self, ArithmeticFault> {
        if self.is_zero() {
            return Err(ArithmeticFault::DivisionByZero {
                operation: "reciprocal",
            });
        }
        reduce(
            i128::from(self.denominator),
            i128::from(self.numerator),
            "reciprocal",
        )
    }

    /// Integer power. `pow(0) == 1`; a negative exponent takes the
    /// reciprocal of the positive power.
    pub fn pow(self, exponent: i32) -> Result<Self, ArithmeticFault> {
        let magnitude = self.pow_unsigned(exponent.unsigned_abs())?;
        if exponent < 0 {
            magnitude.reciprocal()
        } else {
            Ok(magnitude)
        }
    }

    fn pow_unsigned(self, mut exponent: u32) -> Result<Self, ArithmeticFault> {
        let mut result = Self::ONE;
        let mut base = self;
        while exponent > 0 {
            if exponent & 1 == 1 {
                result = result.checked_mul(base)?;
            }
            exponent >>= 1;
            if exponent > 0 {
                base = base.checked_mul(base)?;
            }
        }
        Ok(result)
    }

    /// Largest integer `<= self`.
    #[must_use]
    pub const fn floor(self) -> Self {
        Self {
            numerator: self.numerator.div_euclid(self.denominator),
            denominator: 1,
        }
    }

    /// Smallest integer `>= self`.
    #[must_use]
    pub const fn ceil(self) -> Self {
        Self {
            numerator: -(-self.numerator).div_euclid(self.denominator),
            denominator: 1,
        }
    }

    /// Truncating integer part (rounds toward zero).
    #[must_use]
    pub const fn integer_part(self) -> Self {
        Self {
            numerator: self.numerator / self.denominator,
            denominator: 1,
        }
    }

    /// `self - integer_part()`; carries the sign of `self`.
    #[must_use]
    pub const fn fractional_part(self) -> Self {
        let remainder = self.numerator % self.denominator;
        if remainder == 0 {
            Self::ZERO
        } else {
            // gcd(n % d, d) == gcd(n, d) == 1, so the remainder stays reduced.
            Self {
                numerator: remainder,
                denominator: self.denominator,
            }
        }
    }

    /// Exact sum of a sequence.
    pub fn checked_sum<I>(values: I) -> Result<Self, ArithmeticFault>
    where
        I: IntoIterator<Item = Self>,
    {
        values
            .into_iter()
            .try_fold(Self::ZERO, |acc, value| acc.checked_add(value))
    }

    fn widen(self, other: Self) -> (i128, i128, i128, i128) {
        (
            i128::from(self.numerator),
            i128::from(self.denominator),
            i128::from(other.numerator),
            i128::from(other.denominator),
        )
    }
}

fn reduce(
    numerator: i128,
    denominator: i128,
    operation: &'static str,
) -> Result<Rational, ArithmeticFault> {
    if denominator == 0 {
        return Err(ArithmeticFault::ZeroDenominator);
    }
    let gcd = gcd_u128(numerator.unsigned_abs(), denominator.unsigned_abs());
    // gcd divides |denominator|, which fits in i128.
    let gcd = gcd as i128;
    let (mut numerator, mut denominator) = (numerator / gcd, denominator / gcd);
    if denominator < 0 {
        numerator = -numerator;
        denominator = -denominator;
    }
    let overflow = ArithmeticFault::Overflow { operation };
    let numerator = i64::try_from(numerator).map_err(|_| overflow)?;
    let denominator = i64::try_from(denominator).map_err(|_| overflow)?;
    if numerator == i64::MIN {
        return Err(overflow);
    }
    Ok(Rational {
        numerator,
        denominator,
    })
}

fn gcd_u128(mut left: u128, mut right: u128) -> u128 {
    while right != 0 {
        let rem = left % right;
        left = right;
        right = rem;
    }
    left.max(1)
}

impl Default for Rational {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b, c, d) = self.widen(*other);
        (a * d).cmp(&(c * b))
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<i32> for Rational {
    fn from(value: i32) -> Self {
        Self::from_integer(value)
    }
}

impl TryFrom<i64> for Rational {
    type Error = ArithmeticFault;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value, 1)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator == 1 {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

impl FromStr for Rational {
    type Err = ParseRationalError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ParseRationalError::Empty);
        }
        let parse = |component: &str| {
            component
                .trim()
                .parse::<i64>()
                .map_err(|_| ParseRationalError::InvalidInteger {
                    input: input.to_string(),
                    component: component.to_string(),
                })
        };
        let (numerator, denominator) = match trimmed.split_once('/') {
            Some((numerator, denominator)) => (parse(numerator)?, parse(denominator)?),
            None => (parse(trimmed)?, 1),
        };
        Ok(Self::new(numerator, denominator)?)
    }
}

// Operator impls panic on a fault, the same way integer overflow does in
// debug builds. The engine only uses the checked forms.

impl Add for Rational {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.checked_add(rhs).unwrap_or_else(|fault| panic!("{fault}"))
    }
}

impl Sub for Rational {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.checked_sub(rhs).unwrap_or_else(|fault| panic!("{fault}"))
    }
}

impl Mul for Rational {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.checked_mul(rhs).unwrap_or_else(|fault| panic!("{fault}"))
    }
}

impl Div for Rational {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        self.checked_div(rhs).unwrap_or_else(|fault| panic!("{fault}"))
    }
}

impl Neg for Rational {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            numerator: -self.numerator,
            denominator: self.denominator,
        }
    }
}

/// Wire form: either a `"n/d"` string or an explicit pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RationalRepr {
    Parts { numerator: i64, denominator: i64 },
    Text(String),
}

impl From<Rational> for RationalRepr {
    fn from(value: Rational) -> Self {
        Self::Parts {
            numerator: value.numerator,
            denominator: value.denominator,
        }
    }
}

impl TryFrom<RationalRepr> for Rational {
    type Error = ParseRationalError;

    fn try_from(repr: RationalRepr) -> Result<Self, Self::Error> {
        match repr {
            RationalRepr::Parts {
                numerator,
                denominator,
            } => Ok(Self::new(numerator, denominator)?),
            RationalRepr::Text(text) => text.parse(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn r(numerator: i64, denominator: i64) -> Rational {
        Rational::new(numerator, denominator).expect("test rational must be valid")
    }

    #[test]
    fn new_reduces_and_normalizes_sign() {
        let value = r(12, -8);
        assert_eq!(value.numerator(), -3);
        assert_eq!(value.denominator(), 2);
        assert_eq!(r(0, -5), Rational::ZERO);
        assert_eq!(r(-4, -6), r(2, 3));
    }

    #[test]
    fn zero_denominator_is_rejected() {
        assert_eq!(Rational::new(1, 0), Err(ArithmeticFault::ZeroDenominator));
    }

    #[test]
    fn subtraction_preserves_sign() {
        assert_eq!(r(1, 4) - r(3, 4), r(-1, 2));
        assert_eq!(r(1, 3).checked_sub(r(1, 2)), Ok(r(-1, 6)));
    }

    #[test]
    fn reciprocal_of_zero_faults() {
        assert_eq!(
            Rational::ZERO.reciprocal(),
            Err(ArithmeticFault::DivisionByZero {
                operation: "reciprocal"
            })
        );
        assert_eq!(r(-2, 3).reciprocal(), Ok(r(-3, 2)));
    }

    #[test]
    fn pow_handles_zero_and_negative_exponents() {
        assert_eq!(r(2, 3).pow(0), Ok(Rational::ONE));
        assert_eq!(r(1, 2).pow(3), Ok(r(1, 8)));
        assert_eq!(r(1, 2).pow(-3), Ok(r(8, 1)));
        assert_eq!(r(-2, 3).pow(3), Ok(r(-8, 27)));
        assert_eq!(Rational::ZERO.pow(0), Ok(Rational::ONE));
        assert!(Rational::ZERO.pow(-1).is_err());
    }

    #[test]
    fn floor_and_ceil_round_toward_infinities() {
        assert_eq!(r(7, 2).floor(), r(3, 1));
        assert_eq!(r(7, 2).ceil(), r(4, 1));
        assert_eq!(r(-7, 2).floor(), r(-4, 1));
        assert_eq!(r(-7, 2).ceil(), r(-3, 1));
        assert_eq!(r(-3, 1).floor(), r(-3, 1));
        assert_eq!(r(-3, 1).ceil(), r(-3, 1));
    }

    #[test]
    fn integer_and_fractional_parts_truncate() {
        assert_eq!(r(-7, 2).integer_part(), r(-3, 1));
        assert_eq!(r(-7, 2).fractional_part(), r(-1, 2));
        assert_eq!(r(9, 3).fractional_part(), Rational::ZERO);
        assert!(r(9, 3).is_integer());
    }

    #[test]
    fn ordering_uses_cross_multiplication() {
        assert!(r(1, 3) < r(1, 2));
        assert!(r(-1, 2) < r(-1, 3));
        assert_eq!(r(2, 4).cmp(&r(1, 2)), Ordering::Equal);
        assert_eq!(r(-5, 2).abs(), r(5, 2));
    }

    #[test]
    fn overflow_is_reported_not_wrapped() {
        let big = r(i64::MAX, 1);
        assert_eq!(
            big.checked_mul(big),
            Err(ArithmeticFault::Overflow { operation: "mul" })
        );
        assert_eq!(
            Rational::new(i64::MIN, 1),
            Err(ArithmeticFault::Overflow { operation: "new" })
        );
        // Intermediate products may exceed 64 bits as long as the result fits.
        let wide = r(i64::MAX, 3);
        assert_eq!(wide.checked_mul(r(3, i64::MAX)), Ok(Rational::ONE));
    }

    #[test]
    fn display_and_parse_agree() {
        assert_eq!(r(3, 1).to_string(), "3");
        assert_eq!(r(-3, 4).to_string(), "-3/4");
        assert_eq!(" -6 / 8 ".parse::<Rational>(), Ok(r(-3, 4)));
        assert_eq!("5".parse::<Rational>(), Ok(r(5, 1)));
        assert_eq!("".parse::<Rational>(), Err(ParseRationalError::Empty));
        assert!(matches!(
            "1/x".parse::<Rational>(),
            Err(ParseRationalError::InvalidInteger { .. })
        ));
        assert_eq!(
            "1/0".parse::<Rational>(),
            Err(ParseRationalError::Arithmetic(
                ArithmeticFault::ZeroDenominator
            ))
        );
    }

    #[test]
    fn serde_accepts_pairs_and_strings() {
        let value: Rational =
            serde_json::from_str(r#"{"numerator":4,"denominator":-6}"#).expect("pair form");
        assert_eq!(value, r(-2, 3));
        let value: Rational = serde_json::from_str(r#""1/2""#).expect("string form");
        assert_eq!(value, r(1, 2));
        let json = serde_json::to_string(&r(-2, 3)).expect("serialize");
        assert_eq!(json, r#"{"numerator":-2,"denominator":3}"#);
        assert!(serde_json::from_str::<Rational>(r#"{"numerator":1,"denominator":0}"#).is_err());
    }

    fn small() -> impl Strategy<Value = Rational> {
        (-1000i64..=1000, 1i64..=1000).prop_map(|(n, d)| r(n, d))
    }

    proptest! {
        #[test]
        fn stored_form_is_always_reduced(n in -10_000i64..=10_000, d in 1i64..=10_000) {
            let value = r(n, d);
            prop_assert!(value.denominator() > 0);
            let mut a = value.numerator().unsigned_abs();
            let mut b = value.denominator().unsigned_abs();
            while b != 0 {
                let rem = a % b;
                a = b;
                b = rem;
            }
            prop_assert_eq!(a.max(1), 1);
        }

        #[test]
        fn add_then_sub_is_identity(a in small(), b in small()) {
            prop_assert_eq!((a + b) - b, a);
        }

        #[test]
        fn mul_by_reciprocal_is_one(a in small()) {
            prop_assume!(!a.is_zero());
            prop_assert_eq!(a * a.reciprocal().expect("non-zero"), Rational::ONE);
        }

        #[test]
        fn floor_ceil_bracket_value(a in small()) {
            prop_assert!(a.floor() <= a);
            prop_assert!(a <= a.ceil());
            prop_assert!(a.ceil() - a.floor() <= Rational::ONE);
            prop_assert_eq!(a.is_integer(), a.floor() == a.ceil());
        }

        #[test]
        fn parts_recompose(a in small()) {
            prop_assert_eq!(a.integer_part() + a.fractional_part(), a);
            prop_assert_eq!(a.fractional_part().is_zero(), a.is_integer());
        }

        #[test]
        fn ordering_matches_difference_sign(a in small(), b in small()) {
            let diff = a - b;
            prop_assert_eq!(a.cmp(&b), diff.numerator().cmp(&0));
        }
    }
}
