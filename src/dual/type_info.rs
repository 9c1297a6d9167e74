use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::math::{
    fraction::Fraction,
    traits::{One, Zero},
};

/// An item type with a size below 1/2, and how the algorithm packs it.
///
/// Items of this type are colored: a fraction `red_fraction` of them is red and packed `redfit`
/// per bin, the others are blue and packed `bluefit` per bin. `needs` is the red class of the type
/// (the index of the red space its red items require) and `leaves` is the red class of the space
/// its blue bins leave free, if any.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub size_lower_bound: Fraction,
    pub red_fraction: Fraction,
    pub bluefit: usize,
    pub redfit: usize,
    pub needs: usize,
    pub leaves: Option<usize>,
}

impl TypeInfo {
    /// `(1 - red) / bluefit`
    pub fn blue_weight(&self) -> Fraction {
        &self.red_fraction.clone().one_minus() / self.bluefit
    }

    /// `red / redfit`, or zero if no item of this type is red.
    pub fn red_weight(&self) -> Fraction {
        if self.red_fraction.is_zero() {
            Fraction::zero()
        } else {
            &self.red_fraction / self.redfit
        }
    }

    pub fn max_weight(&self) -> Fraction {
        &self.blue_weight() + &self.red_weight()
    }

    /// Whether the w-weight of this type includes the red weight in class `k`.
    pub fn is_w_high(&self, k: usize) -> bool {
        self.needs >= k || self.needs == 0
    }

    /// Whether the v-weight of this type includes the blue weight in class `k`.
    pub fn is_v_high(&self, k: usize) -> bool {
        match self.leaves {
            Some(leaves) => leaves < k,
            None => true,
        }
    }

    pub fn weight_w(&self, k: usize) -> Fraction {
        if self.is_w_high(k) {
            self.max_weight()
        } else {
            self.blue_weight()
        }
    }

    pub fn weight_v(&self, k: usize) -> Fraction {
        if self.is_v_high(k) {
            self.max_weight()
        } else {
            self.red_weight()
        }
    }

    /// `(1 - y3) * w + y3 * v`
    pub fn simple_weight(&self, k: usize, y3: &Fraction) -> Fraction {
        &(&y3.clone().one_minus() * &self.weight_w(k)) + &(y3 * &self.weight_v(k))
    }

    /// The weight ω of this type in the extended dual LP, in which `type_of_r` is the type of the
    /// item r.
    pub fn omega(
        &self,
        type_of_r: &TypeInfo,
        y1: &Fraction,
        y2: &Fraction,
        y3: &Fraction,
    ) -> Fraction {
        let k = type_of_r.needs;
        let one_minus_y3 = y3.clone().one_minus();
        let v = self.weight_v(k);

        if self == type_of_r {
            let compensation = &self.red_fraction.clone().one_minus()
                / &(&Fraction::one() + &self.red_fraction);
            return &(&(&one_minus_y3 * &self.max_weight()) + &(y3 * &v)) + &(y1 * &compensation);
        }

        let simple = &(&one_minus_y3 * &self.weight_w(k)) + &(y3 * &v);
        match type_of_r.leaves {
            Some(leaves) if self.needs > 0 && self.needs <= leaves => {
                &simple + &(y2 * &self.red_weight())
            }
            _ => simple,
        }
    }
}

impl Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.5} (red = {:.5})",
            self.size_lower_bound, self.red_fraction
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::math::{
        fraction::Fraction,
        traits::{One, Zero},
    };

    use super::TypeInfo;

    fn f(numerator: u64, denominator: u64) -> Fraction {
        Fraction::from((numerator, denominator))
    }

    fn type_info(red_fraction: Fraction, needs: usize, leaves: Option<usize>) -> TypeInfo {
        TypeInfo {
            size_lower_bound: f(1, 4),
            red_fraction,
            bluefit: 3,
            redfit: 2,
            needs,
            leaves,
        }
    }

    #[test]
    fn type_weights() {
        let t = type_info(f(1, 5), 2, Some(1));
        assert_eq!(t.blue_weight(), f(4, 15));
        assert_eq!(t.red_weight(), f(1, 10));
        assert_eq!(t.max_weight(), f(11, 30));

        //needs >= k
        assert_eq!(t.weight_w(2), f(11, 30));
        assert_eq!(t.weight_w(3), f(4, 15));
        //leaves < k
        assert_eq!(t.weight_v(2), f(11, 30));
        assert_eq!(t.weight_v(1), f(1, 10));

        let blue = type_info(Fraction::zero(), 0, None);
        assert!(blue.red_weight().is_zero());
        assert_eq!(blue.weight_w(5), f(1, 3));
        assert_eq!(blue.weight_v(0), f(1, 3));
    }

    #[test]
    fn type_simple_weight() {
        let t = type_info(f(1, 5), 2, Some(1));
        assert_eq!(t.simple_weight(1, &Fraction::zero()), t.weight_w(1));
        assert_eq!(t.simple_weight(1, &Fraction::one()), t.weight_v(1));
        //w = 11/30, v = 1/10 at k = 1
        assert_eq!(t.simple_weight(1, &f(1, 2)), f(7, 30));
    }

    #[test]
    fn type_omega() {
        let type_of_r = type_info(f(1, 5), 2, Some(3));
        let y1 = f(1, 20);
        let y2 = f(1, 10);
        let y3 = f(1, 4);

        //the type of r itself: (1 - y3) * (blue + red) + y3 * v + y1 * (1 - red) / (1 + red)
        let expected = &(&(&f(3, 4) * &f(11, 30)) + &(&f(1, 4) * &type_of_r.weight_v(2)))
            + &(&f(1, 20) * &f(2, 3));
        assert_eq!(type_of_r.omega(&type_of_r, &y1, &y2, &y3), expected);

        //a type whose red class is at most the leaves of r receives y2 * red weight
        let mut other = type_info(f(1, 6), 3, None);
        other.size_lower_bound = f(1, 8);
        let simple = other.simple_weight(2, &y3);
        assert_eq!(
            other.omega(&type_of_r, &y1, &y2, &y3),
            &simple + &(&y2 * &other.red_weight())
        );

        //a type without red class does not
        let mut blue = type_info(Fraction::zero(), 0, None);
        blue.size_lower_bound = f(1, 9);
        assert_eq!(blue.omega(&type_of_r, &y1, &y2, &y3), blue.simple_weight(2, &y3));
    }
}
