use anyhow::Result;
use std::fmt::Display;

use crate::{
    knapsack::pattern::Pattern,
    math::{fraction::Fraction, traits::Signed},
};

/// A case whose item weights depend on one continuous parameter.
pub trait ParameterisedCase {
    /// Returns the heaviest pattern for the weights at the given parameter value, if its weight
    /// exceeds the threshold of the case.
    fn heaviest_pattern(&mut self, parameter: &Fraction) -> Result<Option<Pattern>>;

    /// The (w, v) weight components of a pattern. The pattern weight at parameter p is
    /// `(1 - p) * w + p * v`, plus sand.
    fn weight_components(&self, pattern: &Pattern) -> (Fraction, Fraction);

    fn sand_expansion(&self) -> &Fraction;

    fn target_ratio(&self) -> &Fraction;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExhaustionReason {
    IterationLimit,
    Converged,
    /// The heaviest pattern has equal w- and v-weight: no parameter value makes it lighter.
    ParameterInvariant,
}

impl Display for ExhaustionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ExhaustionReason::IterationLimit => "the maximum number of iterations was reached",
                ExhaustionReason::Converged => "the search interval became too small",
                ExhaustionReason::ParameterInvariant =>
                    "the weight of the heaviest pattern does not depend on the parameter",
            }
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BisectionStatus {
    Resolved(Fraction),
    Exhausted(ExhaustionReason),
}

#[derive(Clone, Debug)]
pub struct BisectionResult {
    pub status: BisectionStatus,
    pub evaluations: usize,
    pub lower: Fraction,
    pub upper: Fraction,
    /// The heaviest patterns of the last two evaluations, the most recent last.
    pub last_patterns: Vec<Option<Pattern>>,
}

impl BisectionResult {
    pub fn is_resolved(&self) -> bool {
        matches!(self.status, BisectionStatus::Resolved(_))
    }

    pub fn last_pattern(&self) -> Option<&Pattern> {
        self.last_patterns.last().and_then(|pattern| pattern.as_ref())
    }
}

/// Bisection over the parameter of a case, until the heaviest pattern does not exceed the target.
///
/// If a pattern is too heavy and its w-weight exceeds its v-weight, a larger parameter makes it
/// lighter; otherwise a smaller parameter does.
pub struct FeasibilityLoop {
    lower: Fraction,
    upper: Fraction,
    center: Fraction,
    max_iterations: usize,
    tolerance: Fraction,
}

impl FeasibilityLoop {
    pub const MAX_ITERATIONS: usize = 20;

    pub fn new(lower: Fraction, upper: Fraction, center: Fraction) -> Self {
        Self {
            lower,
            upper,
            center,
            max_iterations: Self::MAX_ITERATIONS,
            tolerance: Fraction::from((1u64, 10_000_000u64)),
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn run<C: ParameterisedCase>(mut self, case: &mut C) -> Result<BisectionResult> {
        let mut evaluations = 0;
        let mut last_patterns: Vec<Option<Pattern>> = vec![];

        loop {
            evaluations += 1;
            let pattern = case.heaviest_pattern(&self.center)?;

            let status = match &pattern {
                Some(p) if p.weight_incl_filler(case.sand_expansion()) > *case.target_ratio() => {
                    let (w, v) = case.weight_components(p);
                    log::debug!(
                        "parameter {:.5}: heaviest pattern {} of weight {:.5} (w {:.5}, v {:.5})",
                        self.center,
                        p,
                        p.weight_incl_filler(case.sand_expansion()),
                        w,
                        v
                    );
                    if w == v {
                        Some(BisectionStatus::Exhausted(
                            ExhaustionReason::ParameterInvariant,
                        ))
                    } else {
                        if w > v {
                            self.lower = self.center.clone();
                        } else {
                            self.upper = self.center.clone();
                        }
                        self.center = &(&self.lower + &self.upper) / 2usize;

                        if evaluations >= self.max_iterations {
                            Some(BisectionStatus::Exhausted(ExhaustionReason::IterationLimit))
                        } else if (&(&self.upper - &self.lower) / 2usize).abs() < self.tolerance {
                            Some(BisectionStatus::Exhausted(ExhaustionReason::Converged))
                        } else {
                            None
                        }
                    }
                }
                _ => {
                    log::debug!("parameter {:.5} is feasible", self.center);
                    Some(BisectionStatus::Resolved(self.center.clone()))
                }
            };

            last_patterns.push(pattern);
            if last_patterns.len() > 2 {
                last_patterns.remove(0);
            }

            if let Some(status) = status {
                return Ok(BisectionResult {
                    status,
                    evaluations,
                    lower: self.lower,
                    upper: self.upper,
                    last_patterns,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use crate::{
        knapsack::{
            knapsack_solver::{ItemType, KnapsackSolver},
            pattern::Pattern,
            pattern_check::AllowAll,
        },
        math::{
            fraction::Fraction,
            traits::{One, Zero},
        },
    };

    use super::{BisectionStatus, ExhaustionReason, FeasibilityLoop, ParameterisedCase};

    /// Items with weight `(1 - p) * w + p * v`, no sand.
    struct LinearCase {
        items: Vec<(Fraction, Fraction, Fraction)>,
        sand_expansion: Fraction,
        target_ratio: Fraction,
    }

    impl LinearCase {
        fn new(items: &[((u64, u64), (u64, u64), (u64, u64))], target_ratio: Fraction) -> Self {
            Self {
                items: items
                    .iter()
                    .map(|(size, w, v)| {
                        (
                            Fraction::from(*size),
                            Fraction::from(*w),
                            Fraction::from(*v),
                        )
                    })
                    .collect(),
                sand_expansion: Fraction::zero(),
                target_ratio,
            }
        }

        fn component(&self, size: &Fraction, v: bool) -> Fraction {
            self.items
                .iter()
                .find(|(s, _, _)| s == size)
                .map(|(_, w_weight, v_weight)| if v { v_weight.clone() } else { w_weight.clone() })
                .unwrap()
        }
    }

    impl ParameterisedCase for LinearCase {
        fn heaviest_pattern(&mut self, parameter: &Fraction) -> Result<Option<Pattern>> {
            let one_minus = parameter.clone().one_minus();
            let items = self
                .items
                .iter()
                .map(|(size, w, v)| {
                    ItemType::new(size.clone(), &(&one_minus * w) + &(parameter * v))
                })
                .collect();
            let solver = KnapsackSolver::new(items, Box::new(AllowAll), self.sand_expansion.clone())?;
            Ok(solver.solve(&(&self.target_ratio - &Fraction::from((1u64, 1000u64)))))
        }

        fn weight_components(&self, pattern: &Pattern) -> (Fraction, Fraction) {
            (
                pattern.weight_components(|size| self.component(size, false)),
                pattern.weight_components(|size| self.component(size, true)),
            )
        }

        fn sand_expansion(&self) -> &Fraction {
            &self.sand_expansion
        }

        fn target_ratio(&self) -> &Fraction {
            &self.target_ratio
        }
    }

    fn f(numerator: u64, denominator: u64) -> Fraction {
        Fraction::from((numerator, denominator))
    }

    #[test]
    fn bisection_dyadic_root() {
        //max(3/2 (1 - p), 5/2 p) is at most 15/16 exactly at p = 3/8
        let mut case = LinearCase::new(
            &[((3, 5), (3, 2), (0, 1)), ((11, 20), (0, 1), (5, 2))],
            f(15, 16),
        );
        let result = FeasibilityLoop::new(Fraction::zero(), Fraction::one(), f(1, 2))
            .run(&mut case)
            .unwrap();

        assert_eq!(result.status, BisectionStatus::Resolved(f(3, 8)));
        assert_eq!(result.evaluations, 3);
        assert_eq!(result.lower, f(1, 4));
        assert_eq!(result.upper, f(1, 2));
        assert_eq!(result.last_patterns.len(), 2);
        assert!(result.is_resolved());
    }

    #[test]
    fn bisection_non_dyadic_root() {
        //max(3/2 (1 - p), 3 p) is at most 1 only at p = 1/3
        let mut case = LinearCase::new(
            &[((3, 5), (3, 2), (0, 1)), ((11, 20), (0, 1), (3, 1))],
            Fraction::one(),
        );
        let result = FeasibilityLoop::new(Fraction::zero(), Fraction::one(), f(1, 2))
            .run(&mut case)
            .unwrap();

        assert_eq!(
            result.status,
            BisectionStatus::Exhausted(ExhaustionReason::IterationLimit)
        );
        assert_eq!(result.evaluations, FeasibilityLoop::MAX_ITERATIONS);
        assert!(result.lower < f(1, 3) && f(1, 3) < result.upper);
        assert!(result.last_pattern().is_some());
    }

    #[test]
    fn bisection_converged() {
        let mut case = LinearCase::new(
            &[((3, 5), (3, 2), (0, 1)), ((11, 20), (0, 1), (3, 1))],
            Fraction::one(),
        );
        let result = FeasibilityLoop::new(Fraction::zero(), Fraction::one(), f(1, 2))
            .with_max_iterations(30)
            .run(&mut case)
            .unwrap();

        assert_eq!(
            result.status,
            BisectionStatus::Exhausted(ExhaustionReason::Converged)
        );
        assert_eq!(result.evaluations, 23);
    }

    #[test]
    fn bisection_decreasing() {
        //2 (1 - p) is at most 1 for p >= 1/2
        let mut case = LinearCase::new(&[((1, 2), (2, 1), (0, 1))], Fraction::one());
        let result = FeasibilityLoop::new(Fraction::zero(), Fraction::one(), f(3, 16))
            .run(&mut case)
            .unwrap();

        assert_eq!(result.status, BisectionStatus::Resolved(f(19, 32)));
        assert_eq!(result.evaluations, 2);
    }

    #[test]
    fn bisection_parameter_invariant() {
        let mut case = LinearCase::new(&[((1, 2), (2, 1), (2, 1))], Fraction::one());
        let result = FeasibilityLoop::new(Fraction::zero(), Fraction::one(), f(3, 16))
            .run(&mut case)
            .unwrap();

        assert_eq!(
            result.status,
            BisectionStatus::Exhausted(ExhaustionReason::ParameterInvariant)
        );
        assert_eq!(result.evaluations, 1);
        assert_eq!(result.last_patterns.len(), 1);
    }

    #[test]
    fn bisection_immediately_feasible() {
        let mut case = LinearCase::new(&[((1, 2), (1, 4), (1, 4))], Fraction::one());
        let result = FeasibilityLoop::new(Fraction::zero(), Fraction::one(), f(3, 16))
            .run(&mut case)
            .unwrap();

        assert_eq!(result.status, BisectionStatus::Resolved(f(3, 16)));
        assert_eq!(result.evaluations, 1);
        assert!(result.last_pattern().is_none());
    }
}
