//! codelode binary entry point.

use clap::Parser;
use codelode::cli::{Cli, execute};
use tracing_subscriber::EnvFilter;

/// Initializes the tracing subscriber. `RUST_LOG` wins; `--verbose` lifts
/// the default level to debug.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "codelode=debug" } else { "codelode=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(cli).await {
        Ok(output) => println!("{output}"),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.exit_code());
        }
    }
}
