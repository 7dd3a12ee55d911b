use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::*;
use std::path::PathBuf;

use super::Connected;
use crate::mapping::{Mapping, MappingStore};
use crate::ui::prompts;

#[derive(Args)]
pub struct MappingsCommands {
    #[command(subcommand)]
    pub command: MappingsSubcommands,
}

#[derive(Subcommand)]
pub enum MappingsSubcommands {
    /// List saved mappings
    List,
    /// Delete a mapping
    Delete {
        /// Mapping id
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Write a mapping template to a file
    Export {
        /// Mapping id
        id: String,
        /// Output file
        path: PathBuf,
    },
    /// Create a new mapping from a template file
    Import {
        /// Template file
        path: PathBuf,
    },
}

pub async fn handle_mappings_command(cmd: MappingsCommands, connected: Connected) -> Result<()> {
    let store = connected.store;

    match cmd.command {
        MappingsSubcommands::List => list_mappings(&store).await,
        MappingsSubcommands::Delete { id, force } => delete_mapping(&store, &id, force).await,
        MappingsSubcommands::Export { id, path } => {
            store.refresh().await.context("Failed to load mappings")?;
            let written = store
                .export_template(&id, &path)
                .await
                .with_context(|| format!("Failed to export mapping '{}'", id))?;
            println!(
                "{} Template for '{}' written to {}",
                "✓".bright_green().bold(),
                id.bright_green().bold(),
                written.display()
            );
            Ok(())
        }
        MappingsSubcommands::Import { path } => {
            let mapping = store
                .import_template(&path)
                .await
                .with_context(|| format!("Failed to import template {}", path.display()))?;
            println!(
                "{} Created mapping '{}' ({})",
                "✓".bright_green().bold(),
                mapping.name.bright_green().bold(),
                mapping.id.dimmed()
            );
            Ok(())
        }
    }
}

async fn list_mappings(store: &MappingStore) -> Result<()> {
    let mappings = store.refresh().await.context("Failed to load mappings")?;

    if mappings.is_empty() {
        println!("  {}", "⚠️  No mappings saved".bright_yellow().bold());
        println!("  {}", "Create one in the wizard or import a template.".dimmed());
        return Ok(());
    }

    println!();
    println!("  {}", "Saved mappings:".bright_white().bold());
    for mapping in &mappings {
        print_mapping(mapping);
    }
    println!();
    Ok(())
}

fn print_mapping(mapping: &Mapping) {
    println!(
        "  {} {} {}",
        "●".bright_cyan(),
        mapping.name.bright_white().bold(),
        format!("({})", mapping.id).dimmed()
    );
    println!(
        "      {} {} [{}], {} column(s)",
        "program:".dimmed(),
        mapping.program.name,
        mapping.program.kind.unit_label(),
        mapping.bindings.len()
    );
    if !mapping.description.is_empty() {
        println!("      {}", mapping.description.dimmed());
    }
}

async fn delete_mapping(store: &MappingStore, id: &str, force: bool) -> Result<()> {
    store.refresh().await.context("Failed to load mappings")?;
    let name = store
        .mappings()
        .into_iter()
        .find(|m| m.id == id)
        .map(|m| m.name)
        .unwrap_or_else(|| id.to_string());

    if !force && !prompts::prompt_delete_confirmation(&name)? {
        println!("  {}", "Cancelled".dimmed());
        return Ok(());
    }

    store
        .delete(id)
        .await
        .with_context(|| format!("Failed to delete mapping '{}'", id))?;
    println!("{} Deleted mapping '{}'", "✓".bright_green().bold(), name.bright_green().bold());
    Ok(())
}
