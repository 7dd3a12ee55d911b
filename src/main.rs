use anyhow::Result;
use clap::Parser;
use log::info;

use dhis2_import_wizard::cli::commands::{connect, handle_mappings_command, wizard_command};
use dhis2_import_wizard::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger to file (truncate on each run); the TUI owns the terminal
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open("import-wizard.log")?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            log::warn!("Ignoring unreadable .env file: {}", e);
        }
    }

    let cli = Cli::parse();
    info!("Starting import-wizard {}", env!("CARGO_PKG_VERSION"));

    let connected = connect(&cli.connection).await?;

    match cli.command {
        Commands::Wizard => wizard_command(connected).await,
        Commands::Mappings(cmd) => handle_mappings_command(cmd, connected).await,
    }
}
