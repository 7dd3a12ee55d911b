//! Pure view model of the wizard screen
//!
//! Computed from the session and the mapping list on every frame; the
//! renderer only reads it.

use crate::api::models::{ImportSummary, ProgramKind};
use crate::mapping::Mapping;
use crate::session::{ImportSession, ImportSource, SessionState};

use super::progress::ProgressView;

pub const ONBOARDING_TITLE: &str = "Welcome to the data import wizard";
pub const ONBOARDING_INTRO: &str = "This wizard imports data into DHIS2 either from an Excel/CSV file \
or from an external system through a REST API. You have not created any mapping yet. To create one:";
pub const ONBOARDING_STEPS: &[&str] = &[
    "Create a new mapping",
    "Choose the program you want to map",
    "Enter a name and description for the mapping",
    "Select the import type",
    "For Excel/CSV, upload the file; otherwise enter the URL, and optionally a username, \
password and parameters, of the external API",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub program: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Mappings(Vec<MappingRow>),
    Onboarding,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDialogView {
    pub path: Option<String>,
    pub sheets: Vec<String>,
    pub selected_sheet: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiDialogView {
    pub url: String,
    pub username: String,
    pub has_password: bool,
    pub parameters: Vec<(String, String)>,
    pub pull_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogView {
    File(FileDialogView),
    Api(ApiDialogView),
}

impl DialogView {
    pub fn title(&self) -> &'static str {
        match self {
            DialogView::File(_) => "Upload Excel/CSV",
            DialogView::Api(_) => "Import data from API",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryView {
    pub title: String,
    pub rows: Vec<(String, usize)>,
    pub conflicts: Vec<String>,
}

impl SummaryView {
    pub fn new(summary: &ImportSummary) -> Self {
        let unit = summary.kind.unit_label();
        let title = match summary.kind {
            ProgramKind::Tracker => "Tracked entity import summary",
            ProgramKind::Event => "Event import summary",
        };

        Self {
            title: title.to_string(),
            rows: vec![
                (format!("Total {}", unit), summary.total),
                ("Imported".to_string(), summary.imported),
                ("Updated".to_string(), summary.updated),
                ("Skipped".to_string(), summary.skipped),
                ("Failed".to_string(), summary.failed),
            ],
            conflicts: summary.conflicts.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardView {
    pub user: String,
    pub body: Body,
    pub list_loading: bool,
    pub list_error: Option<String>,
    pub active_mapping: Option<String>,
    pub dialog: Option<DialogView>,
    pub state: String,
    pub entity_count: usize,
    /// Entity count belongs to a tracker program
    pub tracker: bool,
    pub import_enabled: bool,
    pub progress: Option<ProgressView>,
    pub summary: Option<SummaryView>,
    pub error: Option<String>,
    pub notice: Option<String>,
}

pub(crate) struct ViewInputs<'a> {
    pub user: &'a str,
    pub mappings: &'a [Mapping],
    pub list_loading: bool,
    pub list_error: Option<String>,
    pub session: &'a ImportSession,
    pub progress_hidden: bool,
    pub notice: Option<&'a str>,
}

impl WizardView {
    pub(crate) fn build(inputs: ViewInputs<'_>) -> Self {
        let session = inputs.session;
        let active_id = session.mapping().map(|m| m.id.as_str());

        let body = if inputs.mappings.is_empty() {
            Body::Onboarding
        } else {
            Body::Mappings(
                inputs
                    .mappings
                    .iter()
                    .map(|m| MappingRow {
                        id: m.id.clone(),
                        name: m.name.clone(),
                        description: m.description.clone(),
                        program: m.program.name.clone(),
                        selected: Some(m.id.as_str()) == active_id,
                    })
                    .collect(),
            )
        };

        let dialog = session.source().map(|source| match source {
            ImportSource::File(file) => DialogView::File(FileDialogView {
                path: file.path.as_ref().map(|p| p.display().to_string()),
                sheets: file.sheet_names.clone(),
                selected_sheet: file.selected_sheet.clone(),
            }),
            ImportSource::Api(api) => DialogView::Api(ApiDialogView {
                url: api.url.clone(),
                username: api.credentials.username.clone().unwrap_or_default(),
                has_password: api.credentials.password.as_deref().is_some_and(|p| !p.is_empty()),
                parameters: api.parameters.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                pull_enabled: session.can_pull(),
            }),
        });

        let error = match session.state() {
            SessionState::Failed => session.last_error().map(|e| e.to_string()),
            _ => None,
        };

        WizardView {
            user: inputs.user.to_string(),
            body,
            list_loading: inputs.list_loading,
            list_error: inputs.list_error,
            active_mapping: session.mapping().map(|m| m.name.clone()),
            dialog,
            state: session.state().label().to_string(),
            entity_count: session.entity_count(),
            tracker: session
                .mapping()
                .is_some_and(|m| m.program.kind == ProgramKind::Tracker),
            import_enabled: session.can_import(),
            progress: ProgressView::from_session(session, inputs.progress_hidden),
            summary: session.summary().map(SummaryView::new),
            error,
            notice: inputs.notice.map(str::to_string),
        }
    }

    pub fn is_onboarding(&self) -> bool {
        matches!(self.body, Body::Onboarding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_labels_follow_program_kind() {
        let mut summary = ImportSummary::new(ProgramKind::Tracker, 3);
        summary.imported = 2;
        summary.failed = 1;

        let view = SummaryView::new(&summary);
        assert_eq!(view.title, "Tracked entity import summary");
        assert_eq!(view.rows[0], ("Total tracked entities".to_string(), 3));

        let events = SummaryView::new(&ImportSummary::new(ProgramKind::Event, 0));
        assert_eq!(events.rows[0].0, "Total events");
    }
}
