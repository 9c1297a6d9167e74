use crate::{
    dual::{parameters::Parameters, verify::verify_certificate},
    dualcert_framework::dualcert_command::DualcertCommand,
};

pub const DUALCERT_VERIFY: DualcertCommand = DualcertCommand::Command {
    name_short: "v",
    name_long: Some("verify"),
    explanation_short: "Verify a certificate: a parameter set with dual values for every case.",
    explanation_long: None,
    cli_command: None,
    input_names: &["FILE"],
    input_helps: &["The certificate (JSON), as written by the search command."],
    execute: |mut inputs, _| {
        let certificate = Parameters::read(&inputs.remove(0))?;
        let report = verify_certificate(certificate)?;
        if !report.feasible {
            log::info!("The certificate is not valid");
        }
        report.to_json()
    },
};
