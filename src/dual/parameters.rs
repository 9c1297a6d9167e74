use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, path::Path, str::FromStr};
use strum_macros::EnumIter;

use crate::math::{
    fraction::Fraction,
    traits::{One, Signed, Zero},
};

use super::type_info::TypeInfo;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    #[default]
    ExtremeHarmonic,
    SuperHarmonic,
}

impl Algorithm {
    /// The interval that is searched for y3, and the first value of y3 that is tried.
    pub fn y3_search_range(&self) -> (Fraction, Fraction, Fraction) {
        match self {
            Algorithm::ExtremeHarmonic => (
                Fraction::zero(),
                Fraction::from((3u64, 8u64)),
                Fraction::from((3u64, 16u64)),
            ),
            Algorithm::SuperHarmonic => (
                Fraction::zero(),
                Fraction::one(),
                Fraction::from((3u64, 16u64)),
            ),
        }
    }

    /// The largest value of y3 that is accepted in a certificate.
    pub fn y3_upper_limit(&self) -> Fraction {
        match self {
            Algorithm::ExtremeHarmonic => Fraction::from((3u64, 5u64)),
            Algorithm::SuperHarmonic => Fraction::from((1u64, 2u64)),
        }
    }

    /// The upper end of the size range of the largest item type. Both families classify the items
    /// above 1/2 separately.
    pub fn first_type_upper_bound(&self) -> Fraction {
        match self {
            Algorithm::ExtremeHarmonic | Algorithm::SuperHarmonic => Fraction::from((1u64, 2u64)),
        }
    }

    /// Whether items larger than 1/2 take part in the dual LPs.
    pub fn has_large_types(&self) -> bool {
        match self {
            Algorithm::ExtremeHarmonic => true,
            Algorithm::SuperHarmonic => false,
        }
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Algorithm::ExtremeHarmonic => "Extreme Harmonic",
                Algorithm::SuperHarmonic => "Super Harmonic",
            }
        )
    }
}

/// The dual variables of one case.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DualValues {
    pub y1: Fraction,
    pub y2: Fraction,
    pub y3: Fraction,
}

impl DualValues {
    pub fn only_y3(y3: Fraction) -> Self {
        Self {
            y1: Fraction::zero(),
            y2: Fraction::zero(),
            y3,
        }
    }
}

/// A full parameter set of an algorithm: its item types, its red spaces and the competitive
/// ratio to be proven. A certificate additionally contains the dual values of every case.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Parameters {
    #[serde(default)]
    pub algorithm: Algorithm,
    pub target_ratio: Fraction,
    pub red_spaces: Vec<Fraction>,
    pub types: Vec<TypeInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dual_values: Vec<Option<DualValues>>,
}

impl Parameters {
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading parameter file {:?}", path))?;
        text.parse::<Self>()
            .with_context(|| format!("parsing parameter file {:?}", path))
    }

    /// Checks the structural requirements on the parameters that the proof relies on.
    pub fn validate(&self) -> Result<()> {
        let Some(smallest) = self.types.last() else {
            return Err(anyhow!("there are no item types"));
        };

        if !self.target_ratio.is_positive() {
            return Err(anyhow!(
                "the target ratio {} is not positive",
                self.target_ratio
            ));
        }

        let first_upper_bound = self.algorithm.first_type_upper_bound();
        if self.types[0].size_lower_bound >= first_upper_bound {
            return Err(anyhow!(
                "the largest item type {} is not below {}",
                self.types[0].size_lower_bound,
                first_upper_bound
            ));
        }

        for (larger, smaller) in self.types.iter().zip(self.types.iter().skip(1)) {
            if smaller.size_lower_bound >= larger.size_lower_bound {
                return Err(anyhow!(
                    "item types are not sorted by strictly decreasing size: {} is followed by {}",
                    larger.size_lower_bound,
                    smaller.size_lower_bound
                ));
            }
        }

        if !smallest.size_lower_bound.is_positive() {
            return Err(anyhow!(
                "the smallest item type {} is not positive",
                smallest.size_lower_bound
            ));
        }
        if smallest.size_lower_bound >= Fraction::from((1u64, 10u64)) {
            return Err(anyhow!(
                "the smallest item type must be below 1/10 but is {}",
                smallest.size_lower_bound
            ));
        }

        for (previous, next) in self.red_spaces.iter().zip(self.red_spaces.iter().skip(1)) {
            if next <= previous {
                return Err(anyhow!(
                    "red spaces are not strictly increasing: {} is followed by {}",
                    previous,
                    next
                ));
            }
        }
        if let Some(red_space) = self.red_spaces.iter().find(|r| r.is_negative()) {
            return Err(anyhow!("red space {} is negative", red_space));
        }

        let third = Fraction::from((1u64, 3u64));
        for t in &self.types {
            if t.red_fraction.is_negative() || t.red_fraction >= third {
                return Err(anyhow!(
                    "the red fraction of type {} is {}, which is not in [0, 1/3)",
                    t.size_lower_bound,
                    t.red_fraction
                ));
            }
            if t.bluefit == 0 {
                return Err(anyhow!(
                    "type {} does not fit any blue item in a bin",
                    t.size_lower_bound
                ));
            }
            if t.red_fraction.is_positive() && t.redfit == 0 {
                return Err(anyhow!(
                    "type {} has red items, but does not fit any red item in a bin",
                    t.size_lower_bound
                ));
            }
        }

        self.check_medium_types_spacing()?;
        for i in 0..self.types.len() {
            self.check_bluefit(i)?;
            self.check_leaves(i)?;
            self.check_needs(i)?;
        }

        Ok(())
    }

    /// Items of type i have a size in (t_i, t_{i-1}]; the largest type is bounded by the
    /// algorithm.
    pub fn size_upper_bound(&self, i: usize) -> Fraction {
        match i.checked_sub(1) {
            Some(previous) => self.types[previous].size_lower_bound.clone(),
            None => self.algorithm.first_type_upper_bound(),
        }
    }

    /// Consecutive types of at least 1/3 are less than the smallest type apart.
    fn check_medium_types_spacing(&self) -> Result<()> {
        let third = Fraction::from((1u64, 3u64));
        let Some(smallest) = self.types.last() else {
            return Ok(());
        };
        for (larger, smaller) in self.types.iter().zip(self.types.iter().skip(1)) {
            if smaller.size_lower_bound < third {
                break;
            }
            let gap = &larger.size_lower_bound - &smaller.size_lower_bound;
            if gap >= smallest.size_lower_bound {
                return Err(anyhow!(
                    "types {} and {} are {} apart, which is not less than the smallest type {}",
                    larger.size_lower_bound,
                    smaller.size_lower_bound,
                    gap,
                    smallest.size_lower_bound
                ));
            }
        }
        Ok(())
    }

    /// A blue bin of type i holds as many items as fit when they have the largest size of the type.
    fn check_bluefit(&self, i: usize) -> Result<()> {
        let t = &self.types[i];
        let expected = self
            .size_upper_bound(i)
            .recip()
            .floor_usize()
            .ok_or_else(|| anyhow!("the bluefit of type {} cannot be determined", t.size_lower_bound))?;
        if t.bluefit != expected {
            return Err(anyhow!(
                "the bluefit of type {} should be {} but is {}",
                t.size_lower_bound,
                expected,
                t.bluefit
            ));
        }
        Ok(())
    }

    /// The space that a full blue bin of type i leaves free is at least the red space `leaves` and
    /// below the next red space. Without `leaves`, it is below every red space.
    fn check_leaves(&self, i: usize) -> Result<()> {
        let t = &self.types[i];
        let upper_bound = self.size_upper_bound(i);
        let free = (&upper_bound * t.bluefit).one_minus();
        if free > upper_bound {
            return Err(anyhow!(
                "{} blue items of type {} leave space {}, which fits another item",
                t.bluefit,
                t.size_lower_bound,
                free
            ));
        }

        match t.leaves {
            None => {
                if let Some(first) = self.red_spaces.first() {
                    if &free >= first {
                        return Err(anyhow!(
                            "type {} has no leaves, but its blue bins leave space {}, which is at least the red space {}",
                            t.size_lower_bound,
                            free,
                            first
                        ));
                    }
                }
            }
            Some(leaves) => {
                let lower = self.red_spaces.get(leaves).ok_or_else(|| {
                    anyhow!(
                        "the leaves {} of type {} is not a red space",
                        leaves,
                        t.size_lower_bound
                    )
                })?;
                let upper = self
                    .red_spaces
                    .get(leaves + 1)
                    .cloned()
                    .unwrap_or_else(Fraction::one);
                if &free < lower || free >= upper {
                    return Err(anyhow!(
                        "the leaves of type {} is {}, but its blue bins leave space {}, which is not in [{}, {})",
                        t.size_lower_bound,
                        leaves,
                        free,
                        lower,
                        upper
                    ));
                }
            }
        }
        Ok(())
    }

    /// The space that `redfit` red items of type i occupy lies in (red space `needs - 1`, red
    /// space `needs`]. A type without red items fits no red items.
    fn check_needs(&self, i: usize) -> Result<()> {
        let t = &self.types[i];
        if t.red_fraction.is_zero() {
            if t.redfit != 0 {
                return Err(anyhow!(
                    "the redfit of type {} must be 0, as its red fraction is 0",
                    t.size_lower_bound
                ));
            }
            return Ok(());
        }

        let upper_bound = self.size_upper_bound(i);
        let Some(largest_red_space) = self.red_spaces.last() else {
            return Err(anyhow!(
                "type {} has red items, but there are no red spaces",
                t.size_lower_bound
            ));
        };
        if &upper_bound > largest_red_space {
            return Err(anyhow!(
                "type {} cannot have red items, as its items may be larger than the largest red space {}",
                t.size_lower_bound,
                largest_red_space
            ));
        }

        let occupied = &upper_bound * t.redfit;
        let upper = self.red_spaces.get(t.needs).ok_or_else(|| {
            anyhow!(
                "the needs {} of type {} is not a red space",
                t.needs,
                t.size_lower_bound
            )
        })?;
        let above_lower = match t.needs.checked_sub(1) {
            Some(previous) => occupied > self.red_spaces[previous],
            None => true,
        };
        if !above_lower || &occupied > upper {
            return Err(anyhow!(
                "the needs of type {} is {}, but its red items occupy {}",
                t.size_lower_bound,
                t.needs,
                occupied
            ));
        }
        Ok(())
    }

    /// The expansion of sand: `1 / (1 - smallest size)`.
    pub fn sand_expansion(&self) -> Result<Fraction> {
        let smallest = self
            .types
            .last()
            .ok_or_else(|| anyhow!("there are no item types"))?;
        Ok(smallest.size_lower_bound.clone().one_minus().recip())
    }

    /// Patterns of weight up to this value are not of interest to the knapsack searches.
    pub fn pattern_weight_threshold(&self) -> Fraction {
        &self.target_ratio - &Fraction::from((1u64, 1000u64))
    }

    /// The case k = K + 1, in which there is no item r.
    pub fn case_without_r(&self) -> usize {
        self.red_spaces.len()
    }

    /// The first type whose red items need red space k.
    pub fn type_of_r(&self, k: usize) -> Option<usize> {
        self.types.iter().position(|t| t.needs == k)
    }

    /// A case k needs to be checked if its red space is not zero and some type needs it.
    pub fn is_necessary_to_check_case(&self, k: usize) -> bool {
        match self.red_spaces.get(k) {
            Some(red_space) => !red_space.is_zero() && self.type_of_r(k).is_some(),
            None => false,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl FromStr for Parameters {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}
