use serde::Serialize;
use strum::IntoEnumIterator;

use crate::{
    dual::parameters::Algorithm, dualcert_framework::dualcert_command::DualcertCommand,
    math::fraction::Fraction,
};

#[derive(Serialize)]
struct AlgorithmInfo {
    algorithm: Algorithm,
    name: String,
    large_types: bool,
    y3_search_lower: Fraction,
    y3_search_upper: Fraction,
    y3_search_start: Fraction,
    y3_limit: Fraction,
}

pub const DUALCERT_ALGORITHMS: DualcertCommand = DualcertCommand::Command {
    name_short: "a",
    name_long: Some("algorithms"),
    explanation_short: "Show the supported algorithm families and how their dual values are searched.",
    explanation_long: None,
    cli_command: None,
    input_names: &[],
    input_helps: &[],
    execute: |_, _| {
        let infos = Algorithm::iter()
            .map(|algorithm| {
                let (lower, upper, start) = algorithm.y3_search_range();
                AlgorithmInfo {
                    algorithm,
                    name: algorithm.to_string(),
                    large_types: algorithm.has_large_types(),
                    y3_search_lower: lower,
                    y3_search_upper: upper,
                    y3_search_start: start,
                    y3_limit: algorithm.y3_upper_limit(),
                }
            })
            .collect::<Vec<_>>();
        Ok(serde_json::to_string_pretty(&infos)?)
    },
};
