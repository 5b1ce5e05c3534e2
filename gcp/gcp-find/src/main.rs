use clap::Parser;
use eyre::Result;

use gcp_find::{Cli, run_cli};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _tracing_guard = env_tracing_logger::initiate_logging(
        cli.log_file.as_ref(),
        false,
        env_tracing_logger::default_level(cli.verbose),
    )
    .map_err(|e| eyre::eyre!("cannot start logging: {e}"))?;
    run_cli(cli)
}
