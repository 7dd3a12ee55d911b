use super::commands::mappings::MappingsCommands;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "import-wizard")]
#[command(about = "Import spreadsheet or API data into DHIS2 using saved mappings")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// DHIS2 API root, e.g. https://play.dhis2.org/dev/api
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[arg(short, long, global = true)]
    pub username: Option<String>,

    #[arg(long, global = true, conflicts_with = "ask_password")]
    pub password: Option<String>,

    /// Prompt for the password instead of reading it from config/env
    #[arg(long, global = true)]
    pub ask_password: bool,

    /// Only show mappings for this program uid
    #[arg(long, global = true)]
    pub program: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive import wizard
    Wizard,
    /// Manage saved mappings
    Mappings(MappingsCommands),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::mappings::MappingsSubcommands;

    #[test]
    fn test_parse_mapping_delete() {
        let cli = Cli::try_parse_from([
            "import-wizard",
            "--base-url",
            "https://play.example.org/api",
            "mappings",
            "delete",
            "abc",
            "--force",
        ])
        .unwrap();

        assert_eq!(cli.connection.base_url.as_deref(), Some("https://play.example.org/api"));
        match cli.command {
            Commands::Mappings(MappingsCommands {
                command: MappingsSubcommands::Delete { id, force },
            }) => {
                assert_eq!(id, "abc");
                assert!(force);
            }
            _ => panic!("expected mappings delete"),
        }
    }

    #[test]
    fn test_password_flags_conflict() {
        let result = Cli::try_parse_from(["import-wizard", "--password", "x", "--ask-password", "wizard"]);
        assert!(result.is_err());
    }
}
