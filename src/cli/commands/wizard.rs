use anyhow::Result;
use log::info;
use std::sync::Arc;

use super::Connected;
use crate::parser::SpreadsheetParser;
use crate::tui;
use crate::wizard::Wizard;

pub async fn wizard_command(connected: Connected) -> Result<()> {
    let settings = connected.config.import_settings();
    info!(
        "Starting wizard (batch size {}, namespace {})",
        settings.batch_size, connected.config.import.namespace
    );

    let wizard = Wizard::new(
        Arc::new(connected.client),
        Arc::new(SpreadsheetParser::new()),
        connected.store,
        connected.session,
        settings,
    );
    tui::run(wizard).await
}
