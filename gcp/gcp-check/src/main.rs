use clap::Parser;
use eyre::Result;

fn main() -> Result<()> {
    let _tracing_guard =
        env_tracing_logger::init().map_err(|e| eyre::eyre!("cannot start logging: {e}"))?;
    gcp_check::run_cli(gcp_check::Cli::parse())
}
