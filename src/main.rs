use clap::Parser;
use tracing::debug;

use cadence::cli::{execute_command, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr) // keep stdout clean for JSON output
        .with_target(cli.verbose >= 2)
        .init();

    debug!("cadence started with verbosity level: {}", cli.verbose);

    if let Err(e) = execute_command(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
