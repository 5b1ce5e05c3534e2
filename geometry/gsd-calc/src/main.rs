use clap::Parser;
use eyre::Result;

fn main() -> Result<()> {
    let _tracing_guard =
        env_tracing_logger::init().map_err(|e| eyre::eyre!("cannot start logging: {e}"))?;
    let cli = gsd_calc::Cli::parse();
    let res = gsd_calc::run_cli(&cli)?;
    print!("{res}");
    Ok(())
}
