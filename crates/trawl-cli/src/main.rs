mod cli_args;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli_args::{Cli, Command};

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Command::Index {
            path,
            name,
            no_embeddings,
        } => commands::index::run(path, name, *no_embeddings, cli.verbose),
        Command::Watch { path, name } => {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("trawl: failed to start runtime: {e}");
                    std::process::exit(1);
                }
            };
            runtime.block_on(commands::watch::run(path, name, cli.verbose))
        }
        Command::Stats { path } => commands::stats::run(path),
        Command::Completion { shell } => {
            commands::completion::run(*shell);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("trawl: {e}");
        std::process::exit(1);
    }
}
