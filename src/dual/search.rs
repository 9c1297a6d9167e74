use anyhow::{Context, Result};

use crate::{
    dualcert_framework::dualcert_command::DualcertCommand,
    knapsack::pattern::Pattern,
    math::{fraction::Fraction, traits::Zero},
};

use super::{
    dual_lp::{CasePlan, CaseSetup, DualLpChecker, DualValueSource, Evaluation, LpKind},
    feasibility_loop::{BisectionStatus, FeasibilityLoop, ParameterisedCase},
    outcome::{CaseOutcome, CaseReport, CertificateReport},
    parameters::{DualValues, Parameters},
};

/// A case in which y3 is searched for, while y1 and y2 are derived.
struct CaseUnderSearch<'a> {
    checker: &'a DualLpChecker,
    setup: &'a CaseSetup,
    last_evaluation: Option<Evaluation>,
}

impl<'a> CaseUnderSearch<'a> {
    fn new(checker: &'a DualLpChecker, setup: &'a CaseSetup) -> Self {
        Self {
            checker,
            setup,
            last_evaluation: None,
        }
    }
}

impl<'a> ParameterisedCase for CaseUnderSearch<'a> {
    fn heaviest_pattern(&mut self, y3: &Fraction) -> Result<Option<Pattern>> {
        let evaluation = self
            .checker
            .evaluate(self.setup, &DualValueSource::Derive(y3.clone()))?;
        let pattern = evaluation.pattern.clone();
        self.last_evaluation = Some(evaluation);
        Ok(pattern)
    }

    fn weight_components(&self, pattern: &Pattern) -> (Fraction, Fraction) {
        (
            self.checker.weight_w(pattern, self.setup.k),
            self.checker.weight_v(pattern, self.setup.k),
        )
    }

    fn sand_expansion(&self) -> &Fraction {
        self.checker.sand_expansion()
    }

    fn target_ratio(&self) -> &Fraction {
        self.checker.target_ratio()
    }
}

/// The order in which the cases are handled: the case without r first, then every red class.
pub(crate) fn case_order(parameters: &Parameters) -> Vec<usize> {
    let without_r = parameters.case_without_r();
    std::iter::once(without_r).chain(0..without_r).collect()
}

pub(crate) fn too_heavy_reason(checker: &DualLpChecker, k: usize, evaluation: &Evaluation) -> String {
    if let Some(violation) = &evaluation.violation {
        return violation.clone();
    }
    match &evaluation.pattern {
        Some(pattern) => format!(
            "the pattern {} has weight {:.5}, which exceeds the target ratio {:.5}",
            checker.describe_pattern(pattern, k),
            pattern.weight_incl_filler(checker.sand_expansion()),
            checker.target_ratio()
        ),
        None => "no pattern is too heavy".to_string(),
    }
}

/// Searches dual values for every case of the parameter set. The search stops at the first case
/// that cannot be made feasible.
pub fn search_certificate(parameters: Parameters) -> Result<CertificateReport> {
    let checker = DualLpChecker::new(parameters)?;
    let parameters = checker.parameters();
    let order = case_order(parameters);

    log::info!(
        "search dual values for {} cases of {} with target ratio {:.5}",
        order.len(),
        parameters.algorithm,
        parameters.target_ratio
    );
    let progress_bar = DualcertCommand::get_progress_bar(order.len());

    let mut dual_values: Vec<Option<DualValues>> = vec![None; parameters.case_without_r()];
    let mut cases = vec![];
    for k in order {
        let report = search_case(&checker, k).with_context(|| format!("searching case {}", k))?;
        progress_bar.inc(1);

        if let (CaseOutcome::Resolved, Some(values)) = (&report.outcome, &report.dual_values) {
            if k < dual_values.len() {
                dual_values[k] = Some(values.clone());
            }
        }

        let infeasible = report.outcome.is_infeasible();
        cases.push(report);
        if infeasible {
            log::info!("case {} is infeasible; stop", k);
            break;
        }
    }
    progress_bar.finish_and_clear();

    let mut report = CertificateReport::new(parameters, checker.sand_expansion(), cases);
    if report.feasible {
        let mut certificate = parameters.clone();
        certificate.dual_values = dual_values;
        report.certificate = Some(certificate);
        log::info!("found dual values for all cases");
    }
    Ok(report)
}

fn search_case(checker: &DualLpChecker, k: usize) -> Result<CaseReport> {
    let setup = match checker.plan_case(k)? {
        CasePlan::Skip(reason) => {
            log::info!("case {}: skip, {}", k, reason);
            return Ok(CaseReport::skipped(k, reason));
        }
        CasePlan::Check(setup) => setup,
    };
    log::info!("case {}: {}", k, setup.kind);

    if setup.kind == LpKind::WithoutR {
        let evaluation = checker.evaluate(&setup, &DualValueSource::Derive(Fraction::zero()))?;
        let outcome = if checker.is_feasible(&evaluation) {
            CaseOutcome::Resolved
        } else {
            CaseOutcome::Infeasible {
                reason: too_heavy_reason(checker, k, &evaluation),
            }
        };
        return Ok(CaseReport::evaluated(
            k,
            outcome,
            1,
            &evaluation,
            checker.sand_expansion(),
        ));
    }

    let (lower, upper, center) = checker.parameters().algorithm.y3_search_range();
    let mut case = CaseUnderSearch::new(checker, &setup);
    let result = FeasibilityLoop::new(lower, upper, center).run(&mut case)?;

    let Some(evaluation) = case.last_evaluation else {
        unreachable!("the feasibility loop evaluates at least once")
    };

    let outcome = match &result.status {
        //a violated constraint does not depend on y3
        _ if evaluation.violation.is_some() => {
            let reason = too_heavy_reason(checker, k, &evaluation);
            log::info!("case {}: {}", k, reason);
            CaseOutcome::Infeasible { reason }
        }
        BisectionStatus::Resolved(y3) => {
            log::info!(
                "case {}: feasible for y3 = {} after {} evaluations",
                k,
                y3,
                result.evaluations
            );
            CaseOutcome::Resolved
        }
        BisectionStatus::Exhausted(reason) => {
            for pattern in result.last_patterns.iter().flatten() {
                log::info!(
                    "case {}: too heavy pattern {} (weights {})",
                    k,
                    checker.describe_pattern(pattern, k),
                    pattern.weight_string()
                );
            }
            log::info!(
                "case {}: y3 remained in [{:.5}, {:.5}]",
                k,
                result.lower,
                result.upper
            );
            CaseOutcome::Infeasible {
                reason: format!("{}: {}", reason, too_heavy_reason(checker, k, &evaluation)),
            }
        }
    };

    Ok(CaseReport::evaluated(
        k,
        outcome,
        result.evaluations,
        &evaluation,
        checker.sand_expansion(),
    ))
}
