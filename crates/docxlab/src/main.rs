mod cli;
mod commands;
mod data;
mod output;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Render(args) => commands::render::run(args, cli.verbose),
        Commands::Inspect { template, json } => commands::inspect::run(template, json, cli.verbose),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
