pub mod mappings;
pub mod wizard;

use anyhow::{Context, Result};
use log::info;
use std::sync::Arc;

use super::app::ConnectionArgs;
use crate::api::{BasicCredentials, Dhis2Client, Dhis2DataStore, RemoteClient, Session};
use crate::config::{Config, EnvVars, Overrides, resolve_server};
use crate::mapping::MappingStore;
use crate::ui::prompts;

pub use mappings::{MappingsCommands, handle_mappings_command};
pub use wizard::wizard_command;

/// Everything a command needs once logged in
pub struct Connected {
    pub config: Config,
    pub client: Dhis2Client,
    pub session: Session,
    pub store: MappingStore,
}

/// Load config, resolve credentials and authenticate against DHIS2
pub async fn connect(args: &ConnectionArgs) -> Result<Connected> {
    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let overrides = Overrides {
        base_url: args.base_url.clone(),
        username: args.username.clone(),
        password: args.password.clone(),
    };
    let server = resolve_server(&overrides, &EnvVars::from_env(), &config)?;

    let username = match server.username {
        Some(username) => username,
        None => prompts::prompt_username(None)?,
    };
    let password = match server.password {
        Some(password) if !args.ask_password => password,
        _ => prompts::prompt_password(&username)?,
    };

    let client = Dhis2Client::new(config.client_config())?;
    let session = client
        .authenticate(&server.base_url, &BasicCredentials::new(username, password))
        .await
        .with_context(|| format!("Failed to log in to {}", server.base_url))?;
    info!("Logged in as {}", session.display_name());

    let backend = Dhis2DataStore::new(client.clone(), session.clone(), config.import.namespace.clone());
    let program_filter = args.program.clone().or_else(|| config.import.program.clone());
    let store = MappingStore::new(Arc::new(backend)).with_program_filter(program_filter);

    Ok(Connected {
        config,
        client,
        session,
        store,
    })
}
