use std::path::PathBuf;

use clap::Parser;
use bulkmod::cli::commands::{Cli, Commands};
use bulkmod::cli::{handlers, logging};

fn main() {
    let cli = Cli::parse();

    let start = match &cli.workspace_dir {
        Some(dir) => Some(PathBuf::from(dir)),
        None => std::env::current_dir().ok(),
    };
    logging::init(start.as_deref());

    let result = match cli.command {
        // Init is handled before workspace discovery
        Commands::Init(args) => handlers::cmd_init(args),
        _ => handlers::dispatch(cli),
    };
    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
