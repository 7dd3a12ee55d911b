use anyhow::Result;
use dialoguer::{Input, Password, Select};
use is_terminal::IsTerminal;

/// Interactive confirmation prompt using arrow-key navigable selection
///
/// Returns `Ok(true)` if the user selects "Yes".
pub fn prompt_confirmation(prompt: &str, default_yes: bool) -> Result<bool> {
    let items = vec!["Yes", "No"];
    let default_index = if default_yes { 0 } else { 1 };

    let selection = Select::new()
        .with_prompt(prompt)
        .items(&items)
        .default(default_index)
        .interact()?;

    Ok(selection == 0)
}

pub fn prompt_delete_confirmation(mapping_name: &str) -> Result<bool> {
    prompt_confirmation(&format!("Delete mapping '{}'?", mapping_name), false)
}

pub fn prompt_username(default: Option<&str>) -> Result<String> {
    let mut input = Input::<String>::new().with_prompt("DHIS2 username");
    if let Some(default) = default {
        input = input.default(default.to_string());
    }
    Ok(input.interact_text()?)
}

/// Hidden password prompt; falls back to reading a line when stdin is piped
pub fn prompt_password(username: &str) -> Result<String> {
    if std::io::stdin().is_terminal() {
        Ok(Password::new()
            .with_prompt(format!("Password for {}", username))
            .interact()?)
    } else {
        Ok(rpassword::read_password()?)
    }
}
