use anyhow::Context;
use clap::{Arg, ArgAction, Command, value_parser};
use std::path::PathBuf;

use crate::{
    dual::{parameters::Parameters, search::search_certificate},
    dualcert_framework::dualcert_command::DualcertCommand,
};

pub const ARG_ID_CERTIFICATE: &str = "certificate";

pub const DUALCERT_SEARCH: DualcertCommand = DualcertCommand::Command {
    name_short: "s",
    name_long: Some("search"),
    explanation_short: "Search dual values that prove the target ratio of a parameter set.",
    explanation_long: Some(
        "Search dual values that prove the target ratio of a parameter set. For every case, y3 is found by bisection, and the search stops at the first case that cannot be made feasible. The result is a report per case; if all cases are feasible, it contains the certificate, which can be checked with the verify command.",
    ),
    cli_command: Some(cli_certificate),
    input_names: &["FILE"],
    input_helps: &["The parameter set (JSON)."],
    execute: |mut inputs, cli_matches| {
        let parameters = Parameters::read(&inputs.remove(0))?;
        let report = search_certificate(parameters)?;

        if let Some(to_file) = cli_matches.get_one::<PathBuf>(ARG_ID_CERTIFICATE) {
            match &report.certificate {
                Some(certificate) => {
                    log::info!("Writing certificate to {:?}", to_file);
                    std::fs::write(to_file, certificate.to_json()?)
                        .with_context(|| format!("writing certificate to {:?}", to_file))?;
                }
                None => log::info!("No certificate was found; {:?} is not written", to_file),
            }
        }

        report.to_json()
    },
};

pub fn cli_certificate(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_ID_CERTIFICATE)
            .short('c')
            .long(ARG_ID_CERTIFICATE)
            .action(ArgAction::Set)
            .value_name("FILE")
            .help("Saves the certificate, if one is found, to a file.")
            .required(false)
            .value_parser(value_parser!(PathBuf)),
    )
}
