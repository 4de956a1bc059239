/// Strata CLI
///
/// Runs and checks JSON execution trees from the command line.

use strata_core::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run_cli().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
