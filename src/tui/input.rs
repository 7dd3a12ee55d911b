//! Key handling
//!
//! Turns key presses into wizard messages. Text entry happens in a local
//! line editor; the message is only sent when the line is committed.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::PathBuf;

use crate::session::SourceKind;
use crate::wizard::Msg;
use crate::wizard::view::{Body, DialogView, MappingRow, WizardView};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    FilePath,
    Url,
    Username,
    Password,
    ParamKey,
    ParamValue { key: String },
    ExportPath { id: String },
    TemplatePath,
}

impl Field {
    pub fn label(&self) -> String {
        match self {
            Field::FilePath => "File (.csv, .xls, .xlsx)".to_string(),
            Field::Url => "URL".to_string(),
            Field::Username => "Username".to_string(),
            Field::Password => "Password".to_string(),
            Field::ParamKey => "Parameter name".to_string(),
            Field::ParamValue { key } => format!("Value for '{}'", key),
            Field::ExportPath { .. } => "Export template to".to_string(),
            Field::TemplatePath => "Template file".to_string(),
        }
    }

    pub fn is_secret(&self) -> bool {
        matches!(self, Field::Password)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Editor {
    pub field: Field,
    pub buffer: String,
}

/// Screen-local state that never reaches the wizard
#[derive(Debug, Default)]
pub struct InputState {
    pub selected_row: usize,
    pub editor: Option<Editor>,
}

impl InputState {
    fn edit(&mut self, field: Field, initial: String) -> Option<Msg> {
        self.editor = Some(Editor { field, buffer: initial });
        None
    }

    pub fn handle_key(&mut self, key: KeyEvent, view: &WizardView) -> Option<Msg> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(Msg::Quit);
        }
        if self.editor.is_some() {
            return self.handle_editor_key(key);
        }
        if view.progress.is_some_and(|p| p.open) {
            return match key.code {
                KeyCode::Char('h') | KeyCode::Esc => Some(Msg::HideProgress),
                _ => None,
            };
        }
        if view.notice.is_some() && key.code == KeyCode::Esc {
            return Some(Msg::DismissNotice);
        }

        match &view.dialog {
            Some(DialogView::File(file)) => self.handle_file_dialog(key, view, &file.sheets, file.selected_sheet.as_deref()),
            Some(DialogView::Api(api)) => self.handle_api_dialog(key, view, &api.url, &api.parameters),
            None => self.handle_main(key, view),
        }
    }

    fn handle_main(&mut self, key: KeyEvent, view: &WizardView) -> Option<Msg> {
        let rows: &[MappingRow] = match &view.body {
            Body::Mappings(rows) => rows,
            Body::Onboarding => &[],
        };
        if !rows.is_empty() && self.selected_row >= rows.len() {
            self.selected_row = rows.len() - 1;
        }
        let current = rows.get(self.selected_row);

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Some(Msg::Quit),
            KeyCode::Down if !rows.is_empty() => {
                self.selected_row = (self.selected_row + 1) % rows.len();
                None
            }
            KeyCode::Up if !rows.is_empty() => {
                self.selected_row = self.selected_row.checked_sub(1).unwrap_or(rows.len() - 1);
                None
            }
            KeyCode::Enter => current.map(|row| Msg::SelectMapping(row.id.clone())),
            KeyCode::Char('d') => current.map(|row| Msg::DeleteMapping(row.id.clone())),
            KeyCode::Char('e') => {
                let row = current?;
                let default = format!("{}.json", row.name.replace(char::is_whitespace, "_"));
                self.edit(Field::ExportPath { id: row.id.clone() }, default)
            }
            KeyCode::Char('i') => self.edit(Field::TemplatePath, String::new()),
            KeyCode::Char('r') => Some(Msg::LoadMappings),
            KeyCode::Char('f') => Some(Msg::OpenDialog(SourceKind::File)),
            KeyCode::Char('a') => Some(Msg::OpenDialog(SourceKind::Api)),
            _ => None,
        }
    }

    fn handle_common_dialog(&self, key: KeyEvent, view: &WizardView) -> Option<Msg> {
        match key.code {
            KeyCode::Esc => Some(Msg::CloseDialog),
            KeyCode::Enter if view.import_enabled => Some(Msg::Import),
            KeyCode::Char('r') if view.error.is_some() || view.summary.is_some() => Some(Msg::Retry),
            KeyCode::Char('p') if view.progress.is_some() => Some(Msg::ShowProgress),
            _ => None,
        }
    }

    fn handle_file_dialog(
        &mut self,
        key: KeyEvent,
        view: &WizardView,
        sheets: &[String],
        selected: Option<&str>,
    ) -> Option<Msg> {
        match key.code {
            KeyCode::Char('o') => self.edit(Field::FilePath, String::new()),
            KeyCode::Char('s') => Some(Msg::SwitchSource(SourceKind::Api)),
            KeyCode::Right | KeyCode::Tab | KeyCode::Down => cycle_sheet(sheets, selected, 1),
            KeyCode::Left | KeyCode::BackTab | KeyCode::Up => cycle_sheet(sheets, selected, -1),
            KeyCode::Delete => Some(Msg::SelectSheet(None)),
            _ => self.handle_common_dialog(key, view),
        }
    }

    fn handle_api_dialog(
        &mut self,
        key: KeyEvent,
        view: &WizardView,
        url: &str,
        parameters: &[(String, String)],
    ) -> Option<Msg> {
        match key.code {
            KeyCode::Char('u') => self.edit(Field::Url, url.to_string()),
            KeyCode::Char('n') => self.edit(Field::Username, String::new()),
            KeyCode::Char('w') => self.edit(Field::Password, String::new()),
            KeyCode::Char('k') => self.edit(Field::ParamKey, String::new()),
            KeyCode::Char('x') => parameters.last().map(|(k, _)| Msg::RemoveParameter(k.clone())),
            KeyCode::Char('l') if pull_enabled(view) => Some(Msg::Pull),
            KeyCode::Char('s') => Some(Msg::SwitchSource(SourceKind::File)),
            _ => self.handle_common_dialog(key, view),
        }
    }

    fn handle_editor_key(&mut self, key: KeyEvent) -> Option<Msg> {
        let editor = self.editor.as_mut()?;
        match key.code {
            KeyCode::Esc => {
                self.editor = None;
                None
            }
            KeyCode::Backspace => {
                editor.buffer.pop();
                None
            }
            KeyCode::Char(c) => {
                editor.buffer.push(c);
                None
            }
            KeyCode::Enter => {
                let Editor { field, buffer } = self.editor.take()?;
                self.commit(field, buffer)
            }
            _ => None,
        }
    }

    fn commit(&mut self, field: Field, buffer: String) -> Option<Msg> {
        let value = buffer.trim().to_string();
        match field {
            Field::FilePath if !value.is_empty() => Some(Msg::FileChosen(PathBuf::from(value))),
            Field::Url => Some(Msg::SetUrl(value)),
            Field::Username => Some(Msg::SetUsername(value)),
            // Passwords may legitimately have surrounding spaces
            Field::Password => Some(Msg::SetPassword(buffer)),
            Field::ParamKey if !value.is_empty() => self.edit(Field::ParamValue { key: value }, String::new()),
            Field::ParamValue { key } => Some(Msg::SetParameter { key, value }),
            Field::ExportPath { id } if !value.is_empty() => Some(Msg::ExportTemplate {
                id,
                path: PathBuf::from(value),
            }),
            Field::TemplatePath if !value.is_empty() => Some(Msg::ImportTemplate(PathBuf::from(value))),
            _ => None,
        }
    }
}

fn cycle_sheet(sheets: &[String], selected: Option<&str>, step: isize) -> Option<Msg> {
    if sheets.is_empty() {
        return None;
    }
    let len = sheets.len() as isize;
    let next = match selected.and_then(|s| sheets.iter().position(|name| name == s)) {
        Some(idx) => (idx as isize + step).rem_euclid(len),
        None if step > 0 => 0,
        None => len - 1,
    };
    Some(Msg::SelectSheet(Some(sheets[next as usize].clone())))
}

fn pull_enabled(view: &WizardView) -> bool {
    matches!(&view.dialog, Some(DialogView::Api(api)) if api.pull_enabled)
}
