use anyhow::{Context, Result, anyhow};

use crate::{
    dualcert_framework::dualcert_command::DualcertCommand,
    math::{fraction::Fraction, traits::Zero},
};

use super::{
    dual_lp::{CasePlan, DualLpChecker, DualValueSource, LpKind},
    outcome::{CaseOutcome, CaseReport, CertificateReport},
    parameters::Parameters,
    search::{case_order, too_heavy_reason},
};

/// Checks a certificate: every case is evaluated once with its given dual values. The verification
/// stops at the first infeasible case.
pub fn verify_certificate(parameters: Parameters) -> Result<CertificateReport> {
    if parameters.dual_values.len() != parameters.case_without_r() {
        return Err(anyhow!(
            "the certificate contains dual values for {} cases, but there are {} red spaces",
            parameters.dual_values.len(),
            parameters.case_without_r()
        ));
    }

    let checker = DualLpChecker::new(parameters)?;
    let parameters = checker.parameters();
    let order = case_order(parameters);

    log::info!(
        "verify {} cases of {} with target ratio {:.5}",
        order.len(),
        parameters.algorithm,
        parameters.target_ratio
    );
    let progress_bar = DualcertCommand::get_progress_bar(order.len());

    let mut cases = vec![];
    for k in order {
        let report = verify_case(&checker, k).with_context(|| format!("verifying case {}", k))?;
        progress_bar.inc(1);

        let infeasible = report.outcome.is_infeasible();
        cases.push(report);
        if infeasible {
            log::info!("case {} is infeasible; stop", k);
            break;
        }
    }
    progress_bar.finish_and_clear();

    let report = CertificateReport::new(parameters, checker.sand_expansion(), cases);
    if report.feasible {
        log::info!("all cases are feasible");
    }
    Ok(report)
}

fn verify_case(checker: &DualLpChecker, k: usize) -> Result<CaseReport> {
    let setup = match checker.plan_case(k)? {
        CasePlan::Skip(reason) => {
            log::info!("case {}: skip, {}", k, reason);
            return Ok(CaseReport::skipped(k, reason));
        }
        CasePlan::Check(setup) => setup,
    };
    log::info!("case {}: {}", k, setup.kind);

    let source = if setup.kind == LpKind::WithoutR {
        DualValueSource::Derive(Fraction::zero())
    } else {
        match checker.parameters().dual_values.get(k) {
            Some(Some(values)) => DualValueSource::Given(values.clone()),
            _ => {
                let mut report = CaseReport::skipped(k, String::new());
                report.lp = Some(setup.kind);
                report.outcome = CaseOutcome::Infeasible {
                    reason: format!("the certificate contains no dual values for case {}", k),
                };
                return Ok(report);
            }
        }
    };

    let evaluation = checker.evaluate(&setup, &source)?;
    let outcome = if checker.is_feasible(&evaluation) {
        CaseOutcome::Resolved
    } else {
        let reason = too_heavy_reason(checker, k, &evaluation);
        log::info!("case {}: {}", k, reason);
        CaseOutcome::Infeasible { reason }
    };

    Ok(CaseReport::evaluated(
        k,
        outcome,
        1,
        &evaluation,
        checker.sand_expansion(),
    ))
}
