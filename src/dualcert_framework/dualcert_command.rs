use anyhow::{Context, Result, anyhow};
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    fmt::{Debug, Display},
    path::PathBuf,
};

use crate::dualcert_commands::{
    dualcert_command_algorithms, dualcert_command_knapsack, dualcert_command_search,
    dualcert_command_verify,
};

pub const DUALCERT_COMMANDS: DualcertCommand = DualcertCommand::Group {
    name_short: "dualcert",
    name_long: None,
    explanation_short: "Dualcert: competitive ratio certificates for online bin packing.",
    explanation_long: None,
    children: &[
        &dualcert_command_algorithms::DUALCERT_ALGORITHMS,
        &dualcert_command_knapsack::DUALCERT_KNAPSACK,
        &dualcert_command_search::DUALCERT_SEARCH,
        &dualcert_command_verify::DUALCERT_VERIFY,
    ],
};

pub const ARG_SHORT_OUTPUT: char = 'o';
pub const ARG_ID_OUTPUT: &str = "output";

pub enum DualcertCommand {
    Group {
        name_short: &'static str,
        name_long: Option<&'static str>,
        explanation_short: &'static str,
        explanation_long: Option<&'static str>,
        children: &'static [&'static DualcertCommand],
    },
    Command {
        name_short: &'static str,
        name_long: Option<&'static str>,
        explanation_short: &'static str,
        explanation_long: Option<&'static str>,
        cli_command: Option<fn(command: Command) -> Command>, //an output -o argument is always added

        input_names: &'static [&'static str], //every input is a file
        input_helps: &'static [&'static str],

        execute: fn(inputs: Vec<PathBuf>, cli_matches: &ArgMatches) -> Result<String>, //returns the result as JSON
    },
}

impl DualcertCommand {
    pub fn build_cli(&self) -> Command {
        let mut command;
        match self {
            DualcertCommand::Group {
                name_short,
                name_long,
                explanation_short,
                explanation_long,
                children,
            } => {
                let name = if let Some(x) = name_long { x } else { name_short };
                command = Command::new(*name)
                    .about(*explanation_short)
                    .subcommand_required(true)
                    .allow_external_subcommands(false);

                if name_long.is_some() {
                    command = command.alias(*name_short);
                }

                if let Some(l) = explanation_long {
                    command = command.long_about(*l);
                }

                for child in children.iter() {
                    command = command.subcommand(child.build_cli());
                }
            }
            DualcertCommand::Command {
                name_short,
                name_long,
                explanation_short,
                explanation_long,
                cli_command,
                input_names,
                input_helps,
                ..
            } => {
                let name = if let Some(x) = name_long { x } else { name_short };
                command = Command::new(*name).about(*explanation_short);

                if name_long.is_some() {
                    command = command.alias(*name_short);
                }

                if let Some(l) = explanation_long {
                    command = command.long_about(*l);
                }

                for (i, (input_name, input_help)) in
                    input_names.iter().zip(input_helps.iter()).enumerate()
                {
                    command = command.arg(
                        Arg::new(Self::input_id(input_name, i))
                            .action(ArgAction::Set)
                            .value_name(*input_name)
                            .help(*input_help)
                            .required(true)
                            .value_parser(value_parser!(PathBuf)),
                    );
                }

                if let Some(f) = cli_command {
                    command = (f)(command);
                }

                command = command.arg(
                    Arg::new(ARG_ID_OUTPUT)
                        .short(ARG_SHORT_OUTPUT)
                        .long(ARG_ID_OUTPUT)
                        .action(ArgAction::Set)
                        .value_name("FILE")
                        .help("Saves the result to a file.")
                        .required(false)
                        .value_parser(value_parser!(PathBuf)),
                );
            }
        };
        command
    }

    fn input_id(input_name: &str, index: usize) -> String {
        format!("{}x{}", input_name, index)
    }

    pub fn long_name(&self) -> &str {
        match self {
            DualcertCommand::Group {
                name_short,
                name_long,
                ..
            }
            | DualcertCommand::Command {
                name_short,
                name_long,
                ..
            } => match name_long {
                Some(x) => x,
                None => name_short,
            },
        }
    }

    pub fn get_progress_bar(total_ticks: usize) -> ProgressBar {
        let pb = ProgressBar::new(total_ticks as u64);
        if let Ok(style) = ProgressStyle::with_template("[{wide_bar:.cyan/blue}] {pos:>7}/{len:7}") {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_position(0);
        pb
    }

    pub fn execute(&self, cli_matches: &ArgMatches) -> Result<()> {
        match self {
            DualcertCommand::Group { children, .. } => {
                for child in children.iter() {
                    if let Some(sub_matches) = cli_matches.subcommand_matches(child.long_name()) {
                        return child.execute(sub_matches);
                    }
                }
            }
            DualcertCommand::Command {
                execute,
                input_names,
                ..
            } => {
                //gather the inputs
                let mut inputs = vec![];
                for (i, input_name) in input_names.iter().enumerate() {
                    let input = cli_matches
                        .get_one::<PathBuf>(&Self::input_id(input_name, i))
                        .ok_or_else(|| anyhow!("argument {} was not given", input_name))?;
                    inputs.push(input.clone());
                }

                log::info!("Starting {}", self.long_name());

                let result = (execute)(inputs, cli_matches)?;

                if let Some(to_file) = cli_matches.get_one::<PathBuf>(ARG_ID_OUTPUT) {
                    log::info!("Writing result to {:?}", to_file);
                    std::fs::write(to_file, result)
                        .with_context(|| format!("writing result to {:?}", to_file))?;
                } else {
                    println!("{}", result);
                }

                return Ok(());
            }
        }
        Err(anyhow!("command not recognised"))
    }
}

impl Display for DualcertCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.long_name())
    }
}

impl Debug for DualcertCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Group {
                name_short,
                name_long,
                ..
            } => f
                .debug_struct("Group")
                .field("name_short", name_short)
                .field("name_long", name_long)
                .finish(),
            Self::Command {
                name_short,
                name_long,
                ..
            } => f
                .debug_struct("Command")
                .field("name_short", name_short)
                .field("name_long", name_long)
                .finish(),
        }
    }
}
