use clap::Parser;
use eyre::Result;

fn main() -> Result<()> {
    let _tracing_guard =
        env_tracing_logger::init().map_err(|e| eyre::eyre!("cannot start logging: {e}"))?;
    let cli = exif_pos::Cli::parse();
    let stdout = std::io::stdout();
    exif_pos::run_cli(&cli, stdout.lock())
}
