use serde::Serialize;

use crate::{
    knapsack::{
        knapsack_solver::ItemType,
        pattern::{Pattern, PatternEntry},
    },
    math::fraction::Fraction,
};

use super::{
    dual_lp::{Evaluation, LpKind},
    parameters::{Algorithm, DualValues, Parameters},
};

#[derive(Clone, Debug, Serialize)]
pub struct PatternReport {
    pub entries: Vec<PatternEntry>,
    pub total_size: Fraction,
    pub sand_weight: Fraction,
    pub weight: Fraction,
    pub weight_approximation: String,
}

impl PatternReport {
    pub fn new(pattern: &Pattern, sand_expansion: &Fraction) -> Self {
        let weight = pattern.weight_incl_filler(sand_expansion);
        Self {
            entries: pattern.entries().cloned().collect(),
            total_size: pattern.total_size().clone(),
            sand_weight: pattern.sand_weight(sand_expansion),
            weight_approximation: format!("{:.5}", weight),
            weight,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CaseOutcome {
    Skipped { reason: String },
    Resolved,
    Infeasible { reason: String },
}

impl CaseOutcome {
    pub fn is_infeasible(&self) -> bool {
        matches!(self, CaseOutcome::Infeasible { .. })
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CaseReport {
    pub case: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lp: Option<LpKind>,
    #[serde(flatten)]
    pub outcome: CaseOutcome,
    pub evaluations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dual_values: Option<DualValues>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heaviest_pattern: Option<PatternReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<ItemType>,
}

impl CaseReport {
    pub fn skipped(case: usize, reason: String) -> Self {
        Self {
            case,
            lp: None,
            outcome: CaseOutcome::Skipped { reason },
            evaluations: 0,
            dual_values: None,
            heaviest_pattern: None,
            items: vec![],
        }
    }

    pub fn evaluated(
        case: usize,
        outcome: CaseOutcome,
        evaluations: usize,
        evaluation: &Evaluation,
        sand_expansion: &Fraction,
    ) -> Self {
        Self {
            case,
            lp: Some(evaluation.kind),
            outcome,
            evaluations,
            dual_values: evaluation.dual_values.clone(),
            heaviest_pattern: evaluation
                .pattern
                .as_ref()
                .map(|pattern| PatternReport::new(pattern, sand_expansion)),
            items: evaluation.items.clone(),
        }
    }
}

/// The result of a search or a verification of a parameter set.
#[derive(Clone, Debug, Serialize)]
pub struct CertificateReport {
    pub algorithm: Algorithm,
    pub target_ratio: Fraction,
    pub target_ratio_approximation: String,
    pub sand_expansion: Fraction,
    pub feasible: bool,
    pub cases: Vec<CaseReport>,
    /// For a successful search: the parameter set together with the dual values that were found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<Parameters>,
}

impl CertificateReport {
    pub fn new(parameters: &Parameters, sand_expansion: &Fraction, cases: Vec<CaseReport>) -> Self {
        Self {
            algorithm: parameters.algorithm,
            target_ratio: parameters.target_ratio.clone(),
            target_ratio_approximation: format!("{:.5}", parameters.target_ratio),
            sand_expansion: sand_expansion.clone(),
            feasible: !cases.iter().any(|case| case.outcome.is_infeasible()),
            cases,
            certificate: None,
        }
    }

    pub fn first_infeasible_case(&self) -> Option<&CaseReport> {
        self.cases.iter().find(|case| case.outcome.is_infeasible())
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use crate::{knapsack::pattern::Pattern, math::fraction::Fraction};

    use super::{CaseOutcome, CaseReport, PatternReport};

    #[test]
    fn outcome_pattern_report() {
        let mut pattern = Pattern::new();
        pattern.add_copies(&Fraction::from((1u64, 3u64)), &Fraction::from((1u64, 2u64)), 2);

        let report = PatternReport::new(&pattern, &Fraction::from((3u64, 2u64)));
        assert_eq!(report.sand_weight, Fraction::from((1u64, 2u64)));
        assert_eq!(report.weight, Fraction::from((3u64, 2u64)));
        assert!(report.weight_approximation.starts_with("1.5"));
        assert_eq!(report.entries.len(), 1);
    }

    #[test]
    fn outcome_json() {
        let report = CaseReport::skipped(2, "red space 2 is zero".to_string());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["case"], 2);
        assert_eq!(json["outcome"], "skipped");
        assert_eq!(json["reason"], "red space 2 is zero");
        assert!(json.get("heaviest_pattern").is_none());

        assert!(
            CaseOutcome::Infeasible {
                reason: String::new()
            }
            .is_infeasible()
        );
        assert!(!CaseOutcome::Resolved.is_infeasible());
    }
}
