mod app;
mod hardware;

use app::App;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "reflex",
    about = "Reaction-time session: LED stimulus, button response, scored record",
    long_about = None,
)]
struct Cli {
    /// Path to the JSON parameter file.
    #[arg(default_value = app::DEFAULT_PARAMS)]
    params: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Level is controlled by RUST_LOG (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    App::new(cli.params).run()
}
