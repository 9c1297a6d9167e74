use anyhow::{Context, Result, anyhow};
use itertools::Itertools;
use serde::Serialize;
use std::fmt::Display;

use crate::{
    knapsack::{
        knapsack_solver::{ItemType, KnapsackSolver},
        pattern::Pattern,
        pattern_check::{AllowAll, MutualExclusion, PatternFeasibilityCheck},
    },
    math::{
        fraction::Fraction,
        traits::{One, Signed, Zero},
    },
};

use super::{
    parameters::{DualValues, Parameters},
    type_info::TypeInfo,
};

/// The kind of dual LP that is checked in a case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LpKind {
    /// The case k = K + 1, in which there is no item r.
    WithoutR,
    /// The item types only, without large items.
    TypesOnly,
    SmallR,
    MediumR,
    MediumRExtended,
}

impl Display for LpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                LpKind::WithoutR => "case without r",
                LpKind::TypesOnly => "simple dual LP on the item types",
                LpKind::SmallR => "r is small, simple dual LP",
                LpKind::MediumR => "r is medium, simple dual LP",
                LpKind::MediumRExtended => "r is medium, extended dual LP",
            }
        )
    }
}

/// Where the dual variables of a case come from.
#[derive(Clone, Debug)]
pub enum DualValueSource {
    /// Searching: y3 is given, and y1 and y2 are derived from the weight of the pattern q1.
    Derive(Fraction),
    /// Verifying: all dual values are given, and are checked against their admissible ranges.
    Given(DualValues),
}

impl DualValueSource {
    pub fn y3(&self) -> &Fraction {
        match self {
            DualValueSource::Derive(y3) => y3,
            DualValueSource::Given(values) => &values.y3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaseSetup {
    pub k: usize,
    pub kind: LpKind,
    /// Index of the type of the item r.
    pub type_of_r: Option<usize>,
    /// Weight of the pattern q1, for medium r.
    pub w1: Option<Fraction>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CasePlan {
    Skip(String),
    Check(CaseSetup),
}

#[derive(Clone, Debug)]
pub struct Evaluation {
    pub kind: LpKind,
    pub dual_values: Option<DualValues>,
    /// The knapsack instance, before merging and filtering.
    pub items: Vec<ItemType>,
    /// The heaviest pattern with a weight above the pattern weight threshold, if any.
    pub pattern: Option<Pattern>,
    /// A violated constraint that made a knapsack search unnecessary.
    pub violation: Option<String>,
}

/// Sets up and checks the dual LPs of the cases of a parameter set.
pub struct DualLpChecker {
    parameters: Parameters,
    sand_expansion: Fraction,
    threshold: Fraction,
}

impl DualLpChecker {
    pub fn new(parameters: Parameters) -> Result<Self> {
        parameters.validate().context("validating parameters")?;
        let sand_expansion = parameters.sand_expansion()?;
        let threshold = parameters.pattern_weight_threshold();
        Ok(Self {
            parameters,
            sand_expansion,
            threshold,
        })
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn sand_expansion(&self) -> &Fraction {
        &self.sand_expansion
    }

    pub fn target_ratio(&self) -> &Fraction {
        &self.parameters.target_ratio
    }

    pub fn pattern_weight_threshold(&self) -> &Fraction {
        &self.threshold
    }

    /// Decides whether case k needs to be checked, and with which dual LP.
    pub fn plan_case(&self, k: usize) -> Result<CasePlan> {
        let parameters = &self.parameters;
        if k == parameters.case_without_r() {
            return Ok(CasePlan::Check(CaseSetup {
                k,
                kind: LpKind::WithoutR,
                type_of_r: None,
                w1: None,
            }));
        }

        let red_space = parameters
            .red_spaces
            .get(k)
            .ok_or_else(|| anyhow!("there is no case {}", k))?;
        if !parameters.is_necessary_to_check_case(k) {
            return Ok(CasePlan::Skip(if red_space.is_zero() {
                format!("red space {} is zero", k)
            } else {
                format!("no item type has red class {}", k)
            }));
        }
        let t = parameters
            .type_of_r(k)
            .ok_or_else(|| anyhow!("no item type has red class {}", k))?;

        if !parameters.algorithm.has_large_types() {
            return Ok(CasePlan::Check(CaseSetup {
                k,
                kind: LpKind::TypesOnly,
                type_of_r: Some(t),
                w1: None,
            }));
        }

        if red_space <= &Fraction::from((1u64, 3u64)) {
            return Ok(CasePlan::Check(CaseSetup {
                k,
                kind: LpKind::SmallR,
                type_of_r: Some(t),
                w1: None,
            }));
        }

        //r is medium
        if parameters.types[t].red_fraction.is_zero() {
            return Ok(CasePlan::Skip(format!(
                "no red item of class {} can exist, as the red fraction of type {} is zero",
                k, parameters.types[t].size_lower_bound
            )));
        }
        if t == 0 {
            return Err(anyhow!(
                "case {} has a medium r of the largest item type {}, which leaves no range for t(r)",
                k,
                parameters.types[t].size_lower_bound
            ));
        }

        let w1 = self.weight_of_q1(t);
        let range_of_r = &parameters.types[t - 1].size_lower_bound - &parameters.types[t].size_lower_bound;
        let range_of_r_small_enough = match parameters.types.last() {
            Some(smallest) => range_of_r <= smallest.size_lower_bound,
            None => false,
        };

        let kind = if !range_of_r_small_enough || w1 <= parameters.target_ratio {
            LpKind::MediumR
        } else {
            LpKind::MediumRExtended
        };

        Ok(CasePlan::Check(CaseSetup {
            k,
            kind,
            type_of_r: Some(t),
            w1: Some(w1),
        }))
    }

    /// The weight of the pattern q1 (and q2): an item of size 1 - t_{t(r)-1}, r itself and sand.
    pub fn weight_of_q1(&self, type_of_r: usize) -> Fraction {
        let types = &self.parameters.types;
        let sand = &(&types[type_of_r - 1].size_lower_bound - &types[type_of_r].size_lower_bound)
            * &self.sand_expansion;
        &(&Fraction::one() + &types[type_of_r].max_weight()) + &sand
    }

    /// Sets up the knapsack instance of a case for the given dual values and searches for its
    /// heaviest pattern.
    pub fn evaluate(&self, setup: &CaseSetup, source: &DualValueSource) -> Result<Evaluation> {
        let parameters = &self.parameters;
        let k = setup.k;
        let one = Fraction::one();
        let y3 = source.y3();
        let one_minus_y3 = y3.clone().one_minus();

        let mut violation = None;
        if matches!(source, DualValueSource::Given(_)) && setup.kind != LpKind::WithoutR {
            violation = self.check_y3(y3);
        }

        let mut items = vec![];
        let mut dual_values = Some(DualValues::only_y3(y3.clone()));
        let mut check: Box<dyn PatternFeasibilityCheck> = Box::new(AllowAll);

        match setup.kind {
            LpKind::WithoutR => {
                dual_values = None;
                if parameters.algorithm.has_large_types() {
                    items.push(ItemType::new(Fraction::from((2u64, 3u64)), one.clone()));
                    items.push(ItemType::new(Fraction::from((1u64, 2u64)), one.clone()));
                }
                for t in &parameters.types {
                    items.push(ItemType::new(t.size_lower_bound.clone(), t.blue_weight()));
                }
            }
            LpKind::TypesOnly => {
                for t in &parameters.types {
                    items.push(ItemType::new(
                        t.size_lower_bound.clone(),
                        t.simple_weight(k, y3),
                    ));
                }
            }
            LpKind::SmallR => {
                items.push(ItemType::new(Fraction::from((2u64, 3u64)), one.clone()));
                items.push(ItemType::new(Fraction::from((1u64, 2u64)), one_minus_y3.clone()));
                for t in &parameters.types {
                    items.push(ItemType::new(
                        t.size_lower_bound.clone(),
                        t.simple_weight(k, y3),
                    ));
                }
            }
            LpKind::MediumR | LpKind::MediumRExtended => {
                let (t, w1) = match (setup.type_of_r, &setup.w1) {
                    (Some(t), Some(w1)) if t > 0 => (t, w1),
                    _ => return Err(anyhow!("case {} with medium r has no type of r", k)),
                };
                let type_of_r = &parameters.types[t];
                let complement = parameters.types[t - 1].size_lower_bound.clone().one_minus();

                items.push(ItemType::new(Fraction::from((2u64, 3u64)), one.clone()));
                items.push(ItemType::new(complement.clone(), one.clone()));
                items.push(ItemType::new(Fraction::from((1u64, 2u64)), one_minus_y3.clone()));

                if setup.kind == LpKind::MediumR {
                    for t in &parameters.types {
                        items.push(ItemType::new(
                            t.size_lower_bound.clone(),
                            t.simple_weight(k, y3),
                        ));
                    }
                } else {
                    let values = match source {
                        DualValueSource::Derive(_) => {
                            let y1 = w1 - &parameters.target_ratio;
                            let y2 = &y1 * 2usize;
                            let values = DualValues {
                                y1,
                                y2,
                                y3: y3.clone(),
                            };
                            //y1 = w1 - c is only admissible if c is close enough to w1
                            if let Some(reason) = Self::check_y1_y2(&values) {
                                log::warn!(
                                    "case {}: derived dual values out of range, {}",
                                    k,
                                    reason
                                );
                                violation = violation.or(Some(reason));
                            }
                            values
                        }
                        DualValueSource::Given(values) => {
                            violation = violation.or_else(|| Self::check_y1_y2(values));
                            values.clone()
                        }
                    };

                    violation = violation.or_else(|| {
                        self.check_q1_q2_constraints(k, w1, &values)
                    });

                    for t in &parameters.types {
                        items.push(ItemType::new(
                            t.size_lower_bound.clone(),
                            t.omega(type_of_r, &values.y1, &values.y2, &values.y3),
                        ));
                    }
                    check = Box::new(MutualExclusion::new(
                        complement,
                        type_of_r.size_lower_bound.clone(),
                    ));
                    dual_values = Some(values);
                }
            }
        }

        if violation.is_some() {
            return Ok(Evaluation {
                kind: setup.kind,
                dual_values,
                items,
                pattern: None,
                violation,
            });
        }

        log::trace!(
            "knapsack data for case {}: sizes [{}], weights [{}]",
            k,
            items.iter().map(|item| item.size.to_string()).join(", "),
            items.iter().map(|item| item.weight.to_string()).join(", ")
        );

        let solver = KnapsackSolver::new(items.clone(), check, self.sand_expansion.clone())
            .with_context(|| format!("setting up the knapsack search of case {}", k))?;
        let mut pattern = solver.solve(&self.threshold);

        if let (LpKind::MediumRExtended, Some(t), Some(values)) =
            (setup.kind, setup.type_of_r, &dual_values)
        {
            pattern = self.compare_with_q3(pattern, t, k, values);
        }

        Ok(Evaluation {
            kind: setup.kind,
            dual_values,
            items,
            pattern,
            violation: None,
        })
    }

    /// Whether the dual LP of an evaluated case is feasible: no constraint is violated and no pattern
    /// is heavier than the target ratio.
    pub fn is_feasible(&self, evaluation: &Evaluation) -> bool {
        evaluation.violation.is_none()
            && match &evaluation.pattern {
                Some(pattern) => {
                    pattern.weight_incl_filler(&self.sand_expansion) <= self.parameters.target_ratio
                }
                None => true,
            }
    }

    fn check_y3(&self, y3: &Fraction) -> Option<String> {
        let limit = self.parameters.algorithm.y3_upper_limit();
        if y3.is_negative() {
            Some(format!("y3 must be non-negative but is {}", y3))
        } else if y3 > &limit {
            Some(format!("y3 must be at most {} but is {}", limit, y3))
        } else {
            None
        }
    }

    fn check_y1_y2(values: &DualValues) -> Option<String> {
        if values.y1.is_negative() {
            Some(format!("y1 must be non-negative but is {}", values.y1))
        } else if values.y1 > Fraction::from((1u64, 20u64)) {
            Some(format!("y1 must be at most 1/20 but is {}", values.y1))
        } else if values.y2.is_negative() {
            Some(format!("y2 must be non-negative but is {}", values.y2))
        } else {
            None
        }
    }

    /// The constraints of the patterns q1 and q2, which are excluded from the knapsack search.
    fn check_q1_q2_constraints(&self, k: usize, w1: &Fraction, values: &DualValues) -> Option<String> {
        let target = &self.parameters.target_ratio;
        if &(&values.y1 + target) < w1 {
            return Some(format!(
                "the first constraint (y1 + c >= w1) is violated in case {}: {:.5} + {:.5} < {:.5}",
                k, values.y1, target, w1
            ));
        }
        if &(&(&values.y2 / 2usize) + target) < w1 {
            return Some(format!(
                "the second constraint (y2 / 2 + c >= w1) is violated in case {}: {:.5} / 2 + {:.5} < {:.5}",
                k, values.y2, target, w1
            ));
        }
        log::debug!("first two constraints of the dual LP of case {} hold", k);
        None
    }

    /// The pattern q3 consists of an item of size 1 - t_{t(r)-1} and r. The mutual exclusion
    /// removes it from the knapsack search, so it is compared separately.
    fn compare_with_q3(
        &self,
        pattern: Option<Pattern>,
        t: usize,
        k: usize,
        values: &DualValues,
    ) -> Option<Pattern> {
        let types = &self.parameters.types;
        let type_of_r = &types[t];
        let one = Fraction::one();
        let one_minus_y3 = values.y3.clone().one_minus();

        let sand_volume = &types[t - 1].size_lower_bound - &type_of_r.size_lower_bound;
        let sand_weight = &sand_volume * &self.sand_expansion;
        let compensation = &(&values.y1 * &type_of_r.red_fraction.clone().one_minus())
            / &(&one + &type_of_r.red_fraction);

        let w3 = &(&one + &type_of_r.blue_weight()) + &sand_weight;
        let v3 = &(&one + &type_of_r.weight_v(k)) + &sand_weight;
        let weight_q3 = &(&(&one_minus_y3 * &w3) + &(&values.y3 * &v3)) + &compensation;
        log::debug!("weight of q3 is {:.5}", weight_q3);

        if weight_q3 <= self.threshold {
            return pattern;
        }
        if let Some(p) = &pattern {
            if weight_q3 <= p.weight_incl_filler(&self.sand_expansion) {
                return pattern;
            }
        }

        let r_weight = &(&(&type_of_r.blue_weight() * &one_minus_y3)
            + &(&type_of_r.weight_v(k) * &values.y3))
            + &compensation;
        let mut q3 = Pattern::new();
        q3.add_copies(&types[t - 1].size_lower_bound.clone().one_minus(), &one, 1);
        q3.add_copies(&type_of_r.size_lower_bound, &r_weight, 1);
        assert!(
            q3.weight_incl_filler(&self.sand_expansion) == weight_q3,
            "the weight of q3 is inconsistent"
        );
        Some(q3)
    }

    fn type_with_size(&self, size: &Fraction) -> Option<&TypeInfo> {
        self.parameters
            .types
            .iter()
            .find(|t| &t.size_lower_bound == size)
    }

    /// The w-weight of the items of a pattern in case k. Large items have w-weight 1.
    pub fn weight_w(&self, pattern: &Pattern, k: usize) -> Fraction {
        pattern.weight_components(|size| match self.type_with_size(size) {
            Some(t) => t.weight_w(k),
            None => Fraction::one(),
        })
    }

    /// The v-weight of the items of a pattern in case k. Large items have v-weight 1, except for
    /// items in (1/2, 2/3], which have v-weight 0.
    pub fn weight_v(&self, pattern: &Pattern, k: usize) -> Fraction {
        let half = Fraction::from((1u64, 2u64));
        pattern.weight_components(|size| match self.type_with_size(size) {
            Some(t) => t.weight_v(k),
            None if size == &half => Fraction::zero(),
            None => Fraction::one(),
        })
    }

    /// Describes the items of a pattern, with whether their w- and v-weights are high in case k.
    pub fn describe_pattern(&self, pattern: &Pattern, k: usize) -> String {
        if pattern.is_empty() {
            return "only sand".to_string();
        }
        pattern
            .entries()
            .map(|entry| match self.type_with_size(&entry.size) {
                Some(t) => format!(
                    "{} [{} times; {} w, {} v]",
                    entry.size,
                    entry.copies,
                    if t.is_w_high(k) { "high" } else { "low" },
                    if t.is_v_high(k) { "high" } else { "low" }
                ),
                None => format!("{} [{} times]", entry.size, entry.copies),
            })
            .join(" , ")
    }
}
