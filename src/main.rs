use anyhow::{Context, Result};
use clap::{Args, FromArgMatches, crate_version};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use env_logger::Builder;

use dualcert::dualcert_framework::dualcert_command::DUALCERT_COMMANDS;

pub fn main() -> Result<()> {
    let command = DUALCERT_COMMANDS.build_cli();
    let command = Verbosity::<InfoLevel>::augment_args(command.version(crate_version!()));
    let cli_matches = command.get_matches();

    //-v and -q set the log level
    let verbosity = Verbosity::<InfoLevel>::from_arg_matches(&cli_matches)?;
    Builder::new()
        .filter_level(verbosity.log_level_filter())
        .init();

    log::info!("Dualcert starting");

    DUALCERT_COMMANDS
        .execute(&cli_matches)
        .context("Executing Dualcert")
}
