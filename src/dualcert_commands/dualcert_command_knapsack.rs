use serde::Serialize;

use crate::{
    dual::outcome::PatternReport,
    dualcert_framework::dualcert_command::DualcertCommand,
    knapsack::{
        knapsack_instance::KnapsackInstance,
        knapsack_solver::{ItemType, KnapsackStatistics},
    },
};

#[derive(Serialize)]
struct KnapsackReport {
    /// The items that take part in the search, in search order.
    items: Vec<ItemType>,
    heaviest_pattern: Option<PatternReport>,
    statistics: KnapsackStatistics,
}

pub const DUALCERT_KNAPSACK: DualcertCommand = DualcertCommand::Command {
    name_short: "k",
    name_long: Some("knapsack"),
    explanation_short: "Find the heaviest pattern of a single knapsack instance.",
    explanation_long: Some(
        "Find the heaviest pattern of a single knapsack instance: item sizes and weights, the sand expansion, a weight threshold and optionally two sizes that exclude each other. Only patterns that are strictly heavier than the threshold are reported.",
    ),
    cli_command: None,
    input_names: &["FILE"],
    input_helps: &["The knapsack instance (JSON)."],
    execute: |mut inputs, _| {
        let instance = KnapsackInstance::read(&inputs.remove(0))?;
        let solver = instance.solver()?;
        let (pattern, statistics) = solver.solve_with_statistics(&instance.threshold);

        match &pattern {
            Some(p) => log::info!(
                "heaviest pattern {} of weight {:.5}",
                p,
                p.weight_incl_filler(&instance.sand_expansion)
            ),
            None => log::info!("no pattern is heavier than {}", instance.threshold),
        }

        let report = KnapsackReport {
            items: solver.items().to_vec(),
            heaviest_pattern: pattern
                .as_ref()
                .map(|p| PatternReport::new(p, &instance.sand_expansion)),
            statistics,
        };
        Ok(serde_json::to_string_pretty(&report)?)
    },
};
