use anyhow::{Error, anyhow};
use fraction::{BigFraction, GenericFraction, Sign};
use num_traits::ToPrimitive;
use num_rational::Ratio;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::{
    borrow::Borrow,
    cmp::Ordering,
    hash::Hash,
    iter::Sum,
    ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use super::traits::{One, Signed, Zero};

pub type UInt = num_bigint::BigUint;

/// An exact rational number of arbitrary precision.
///
/// All sizes, weights and thresholds are fractions. Nothing is ever rounded, except when a
/// fraction is displayed with an explicit precision (e.g. `{:.5}`).
#[derive(Clone)]
pub struct Fraction(pub BigFraction);

impl Fraction {
    /**
     * 1/self
     */
    pub fn recip(&self) -> Self {
        Self(self.0.recip())
    }

    pub fn one_minus(self) -> Self {
        &Self::one() - &self
    }

    pub fn two() -> Fraction {
        Self(GenericFraction::Rational(
            Sign::Plus,
            Ratio::new_raw(UInt::from(2u32), UInt::from(1u32)),
        ))
    }

    pub fn is_integer(&self) -> bool {
        match &self.0 {
            GenericFraction::Rational(_, ratio) => ratio.is_integer(),
            _ => false,
        }
    }

    /// The largest natural number not above this fraction, if this fraction is non-negative and the
    /// result fits in a usize.
    pub fn floor_usize(&self) -> Option<usize> {
        match &self.0 {
            GenericFraction::Rational(Sign::Plus, ratio) => ratio.to_integer().to_usize(),
            GenericFraction::Rational(Sign::Minus, ratio) if num::Zero::is_zero(ratio) => Some(0),
            _ => None,
        }
    }
}

impl One for Fraction {
    fn one() -> Self {
        Self(GenericFraction::Rational(Sign::Plus, num::One::one()))
    }

    fn is_one(&self) -> bool {
        fraction::One::is_one(&self.0)
    }
}

impl Zero for Fraction {
    fn zero() -> Self {
        Self(GenericFraction::Rational(Sign::Plus, num::Zero::zero()))
    }

    fn is_zero(&self) -> bool {
        fraction::Zero::is_zero(&self.0)
    }
}

impl Signed for Fraction {
    fn abs(&self) -> Self {
        Self(fraction::Signed::abs(&self.0))
    }

    fn is_positive(&self) -> bool {
        !fraction::Zero::is_zero(&self.0) && fraction::Signed::is_positive(&self.0)
    }

    fn is_negative(&self) -> bool {
        !fraction::Zero::is_zero(&self.0) && fraction::Signed::is_negative(&self.0)
    }
}

impl FromStr for Fraction {
    type Err = Error;

    fn from_str(s: &str) -> std::prelude::v1::Result<Self, Self::Err> {
        let result = Self(BigFraction::from_str(s.trim())?);
        match &result.0 {
            GenericFraction::Rational(_, _) => Ok(result),
            _ => Err(anyhow!("`{}` is not a finite fraction", s)),
        }
    }
}

impl Serialize for Fraction {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Fraction {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Fraction::from_str(&s).map_err(de::Error::custom)
    }
}

impl std::fmt::Display for Fraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl std::fmt::Debug for Fraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Fraction").field(&self.0).finish()
    }
}

impl Add<&Fraction> for &Fraction {
    type Output = Fraction;

    fn add(self, rhs: &Fraction) -> Self::Output {
        match (self, rhs) {
            (Fraction(x), Fraction(y)) => Fraction(x.add(y)),
        }
    }
}

impl<T> AddAssign<T> for Fraction
where
    T: Borrow<Fraction>,
{
    fn add_assign(&mut self, rhs: T) {
        let rhs = rhs.borrow();
        match (self, rhs) {
            (Fraction(x), Fraction(y)) => x.add_assign(y),
        }
    }
}

impl Sub<&Fraction> for &Fraction {
    type Output = Fraction;

    fn sub(self, rhs: &Fraction) -> Self::Output {
        match (self, rhs) {
            (Fraction(x), Fraction(y)) => Fraction(x.sub(y)),
        }
    }
}

impl<T> SubAssign<T> for Fraction
where
    T: Borrow<Fraction>,
{
    fn sub_assign(&mut self, rhs: T) {
        let rhs = rhs.borrow();
        match (self, rhs) {
            (Fraction(x), Fraction(y)) => x.sub_assign(y),
        }
    }
}

impl Mul<&Fraction> for &Fraction {
    type Output = Fraction;

    fn mul(self, rhs: &Fraction) -> Self::Output {
        match (self, rhs) {
            (Fraction(x), Fraction(y)) => Fraction(x.mul(y)),
        }
    }
}

impl<T> MulAssign<T> for Fraction
where
    T: Borrow<Fraction>,
{
    fn mul_assign(&mut self, rhs: T) {
        let rhs = rhs.borrow();
        match (self, rhs) {
            (Fraction(x), Fraction(y)) => x.mul_assign(y),
        }
    }
}

impl Div<&Fraction> for &Fraction {
    type Output = Fraction;

    fn div(self, rhs: &Fraction) -> Self::Output {
        match (self, rhs) {
            (Fraction(x), Fraction(y)) => Fraction(x.div(y)),
        }
    }
}

impl<T> DivAssign<T> for Fraction
where
    T: Borrow<Fraction>,
{
    fn div_assign(&mut self, rhs: T) {
        let rhs = rhs.borrow();
        match (self, rhs) {
            (Fraction(x), Fraction(y)) => x.div_assign(y),
        }
    }
}

impl Neg for Fraction {
    type Output = Fraction;

    fn neg(self) -> Self::Output {
        Fraction(self.0.neg())
    }
}

impl<'a> Neg for &'a Fraction {
    type Output = Fraction;

    fn neg(self) -> Self::Output {
        match self {
            Fraction(f) => Fraction(f.neg()),
        }
    }
}

impl PartialEq for Fraction {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Fraction(x), Fraction(y)) => x == y,
        }
    }
}

impl Eq for Fraction {}

impl PartialOrd for Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fraction {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl Hash for Fraction {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Fraction(f) => f.hash(state),
        }
    }
}

impl Sum for Fraction {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |sum, f| &sum + &f)
    }
}

impl<'a> Sum<&'a Fraction> for Fraction {
    fn sum<I: Iterator<Item = &'a Fraction>>(iter: I) -> Self {
        iter.fold(Fraction::zero(), |sum, f| &sum + f)
    }
}

//======================== primitive types ========================//

macro_rules! from {
    ($t:ident) => {
        impl From<$t> for Fraction {
            fn from(value: $t) -> Self {
                Self(GenericFraction::Rational(
                    Sign::Plus,
                    Ratio::new(UInt::from(value), UInt::from(1u32)),
                ))
            }
        }
    };
}

macro_rules! from_signed {
    ($t:ident) => {
        impl From<$t> for Fraction {
            fn from(value: $t) -> Self {
                Self(GenericFraction::Rational(
                    if value.is_negative() {
                        Sign::Minus
                    } else {
                        Sign::Plus
                    },
                    Ratio::new(UInt::from(value.unsigned_abs()), UInt::from(1u32)),
                ))
            }
        }
    };
}

macro_rules! from_tuple_u_u {
    ($t:ident,$tt:ident) => {
        impl From<($t, $tt)> for Fraction {
            fn from(value: ($t, $tt)) -> Self {
                Fraction(GenericFraction::Rational(
                    Sign::Plus,
                    Ratio::new(UInt::from(value.0), UInt::from(value.1)),
                ))
            }
        }
    };
}

macro_rules! from_tuple_i_u {
    ($t:ident,$tt:ident) => {
        impl From<($t, $tt)> for Fraction {
            fn from(value: ($t, $tt)) -> Self {
                let s0 = if value.0.is_negative() {
                    Sign::Minus
                } else {
                    Sign::Plus
                };
                Self(GenericFraction::Rational(
                    s0,
                    Ratio::new(UInt::from(value.0.unsigned_abs()), UInt::from(value.1)),
                ))
            }
        }
    };
}

macro_rules! mul {
    ($t:ident) => {
        impl<'a> Mul<$t> for &'a Fraction {
            type Output = Fraction;

            fn mul(self, rhs: $t) -> Self::Output {
                let rhs: Fraction = rhs.into();
                match (self, rhs) {
                    (Fraction(x), Fraction(y)) => Fraction(x.mul(&y)),
                }
            }
        }
    };
}

macro_rules! div {
    ($t:ident) => {
        impl<'a> Div<$t> for &'a Fraction {
            type Output = Fraction;

            fn div(self, rhs: $t) -> Self::Output {
                let rhs: Fraction = rhs.into();
                match (self, rhs) {
                    (Fraction(x), Fraction(y)) => Fraction(x.div(&y)),
                }
            }
        }
    };
}

from!(usize);
from!(u64);
from!(u32);
from_signed!(i64);
from_signed!(i32);
from_tuple_u_u!(usize, usize);
from_tuple_u_u!(u64, u64);
from_tuple_u_u!(u32, u32);
from_tuple_i_u!(i64, u64);
mul!(usize);
div!(usize);

#[cfg(test)]
mod tests {
    use std::{ops::Neg, str::FromStr};

    use crate::math::{
        fraction::Fraction,
        traits::{One, Signed, Zero},
    };

    #[test]
    fn fraction_neg() {
        let one = Fraction::one();
        assert!(one.is_positive());
        let one = one.neg();
        assert!(one.is_negative());
    }

    #[test]
    fn fraction_exact() {
        let zero = Fraction::one().one_minus();

        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());
    }

    #[test]
    fn fraction_parse() {
        let f = Fraction::from_str("3/8").unwrap();
        assert_eq!(f, Fraction::from((3u64, 8u64)));
        assert_eq!(f.to_string(), "3/8");

        let g = Fraction::from_str(" 2 ").unwrap();
        assert_eq!(g, Fraction::two());

        assert!(Fraction::from_str("a/b").is_err());
    }

    #[test]
    fn fraction_floor() {
        assert_eq!(Fraction::from((7u64, 2u64)).floor_usize(), Some(3));
        assert_eq!(Fraction::from((6u64, 2u64)).floor_usize(), Some(3));
        assert!(Fraction::from((6u64, 2u64)).is_integer());
        assert!(!Fraction::from((7u64, 2u64)).is_integer());
        assert_eq!(Fraction::zero().floor_usize(), Some(0));
        assert_eq!(Fraction::from((-1i64, 2u64)).floor_usize(), None);
    }

    #[test]
    fn fraction_serde() {
        let f = Fraction::from((2u64, 3u64));
        let json = serde_json::to_string(&f).unwrap();
        assert_eq!(json, "\"2/3\"");
        let g: Fraction = serde_json::from_str(&json).unwrap();
        assert_eq!(f, g);
    }

    #[test]
    fn fraction_arithmetic_is_exact() {
        let third = Fraction::from((1u64, 3u64));
        let sum: Fraction = [third.clone(), third.clone(), third].iter().sum();
        assert!(sum.is_one());

        let x = &Fraction::from((1u64, 7u64)) * 7usize;
        assert!(x.is_one());
        assert_eq!(&x / 4usize, Fraction::from((1u64, 4u64)));
        assert_eq!(Fraction::from((1u64, 4u64)).recip(), Fraction::from(4u64));
        assert_eq!(Fraction::from((-1i64, 4u64)).abs(), Fraction::from((1u64, 4u64)));
    }
}
