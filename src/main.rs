//! arbitrex CLI entrypoint.

use clap::Parser;

use arbitrex::cli::{Cli, Commands};
use arbitrex::error::Result;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Run(args) => arbitrex::cli::run::execute(&cli.config, args).await,
        Commands::Scan(args) => arbitrex::cli::scan::execute(&cli.config, args).await,
        Commands::Status => {
            let config = arbitrex::app::Config::load(&cli.config).ok();
            let status_path = config.as_ref().and_then(|c| c.status_file.as_deref());
            arbitrex::cli::status::execute(status_path);
            Ok(())
        }
        Commands::Link(command) => arbitrex::cli::link::execute(&cli.config, command).await,
        Commands::Stats(args) => arbitrex::cli::stats::execute(&cli.config, args).await,
        Commands::Config(arbitrex::cli::ConfigCommands::Show) => arbitrex::cli::config::execute_show(&cli.config),
        Commands::Config(arbitrex::cli::ConfigCommands::Validate) => arbitrex::cli::config::execute_validate(&cli.config),
    }
}
