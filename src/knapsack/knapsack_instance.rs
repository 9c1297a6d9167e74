use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::{path::Path, str::FromStr};

use crate::math::fraction::Fraction;

use super::{
    knapsack_solver::{ItemType, KnapsackSolver, KnapsackStatistics},
    pattern::Pattern,
    pattern_check::{AllowAll, MutualExclusion, PatternFeasibilityCheck},
};

/// A stand-alone knapsack search, as read from JSON.
#[derive(Clone, Debug, Deserialize)]
pub struct KnapsackInstance {
    pub sizes: Vec<Fraction>,
    pub weights: Vec<Fraction>,
    pub sand_expansion: Fraction,
    pub threshold: Fraction,
    /// Two sizes that may not be combined in a pattern.
    #[serde(default)]
    pub exclusive: Option<(Fraction, Fraction)>,
}

impl KnapsackInstance {
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading knapsack instance {:?}", path))?;
        text.parse::<Self>()
            .with_context(|| format!("parsing knapsack instance {:?}", path))
    }

    pub fn solver(&self) -> Result<KnapsackSolver> {
        if self.sizes.len() != self.weights.len() {
            return Err(anyhow!(
                "there are {} sizes but {} weights",
                self.sizes.len(),
                self.weights.len()
            ));
        }

        let items = self
            .sizes
            .iter()
            .zip(self.weights.iter())
            .map(|(size, weight)| ItemType::new(size.clone(), weight.clone()))
            .collect();

        let check: Box<dyn PatternFeasibilityCheck> = match &self.exclusive {
            Some((a, b)) => Box::new(MutualExclusion::new(a.clone(), b.clone())),
            None => Box::new(AllowAll),
        };

        KnapsackSolver::new(items, check, self.sand_expansion.clone())
    }

    pub fn solve(&self) -> Result<(Option<Pattern>, KnapsackStatistics)> {
        Ok(self.solver()?.solve_with_statistics(&self.threshold))
    }
}

impl FromStr for KnapsackInstance {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::math::fraction::Fraction;

    use super::KnapsackInstance;

    fn f(numerator: u64, denominator: u64) -> Fraction {
        Fraction::from((numerator, denominator))
    }

    #[test]
    fn instance_sand() {
        let fin = fs::read_to_string("testfiles/knapsack_sand.json").unwrap();
        let instance = fin.parse::<KnapsackInstance>().unwrap();
        assert!(instance.exclusive.is_none());

        let (pattern, statistics) = instance.solve().unwrap();
        let pattern = pattern.unwrap();
        assert_eq!(pattern.copies_of(&f(1, 2)), 1);
        assert_eq!(pattern.weight_incl_filler(&instance.sand_expansion), f(2, 1));
        assert!(statistics.nodes_explored > 0);
    }

    #[test]
    fn instance_exclusive() {
        let fin = fs::read_to_string("testfiles/knapsack_exclusive.json").unwrap();
        let instance = fin.parse::<KnapsackInstance>().unwrap();
        assert_eq!(instance.exclusive, Some((f(1, 2), f(1, 3))));

        let pattern = instance.solve().unwrap().0.unwrap();
        assert_eq!(pattern.weight_incl_filler(&instance.sand_expansion), f(3, 2));
        assert!(!pattern.contains_size(&f(1, 2)));
    }

    #[test]
    fn instance_mismatch() {
        let mut instance = fs::read_to_string("testfiles/knapsack_sand.json")
            .unwrap()
            .parse::<KnapsackInstance>()
            .unwrap();
        instance.weights.pop();
        assert!(instance.solve().is_err());
    }
}
