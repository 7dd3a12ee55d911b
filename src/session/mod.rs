//! Import session state machine
//!
//! One session backs the wizard for its whole lifetime. Async work is started
//! with a `begin_*` call, which hands out a [`Ticket`], and finished with the
//! matching `complete_*` call. Every `begin_*`, source switch and close bumps
//! the generation, so a completion carrying an older ticket is discarded
//! instead of applied.

pub mod source;
pub mod state;

use log::{debug, info, warn};
use std::path::PathBuf;

use crate::api::models::ImportSummary;
use crate::error::ImportError;
use crate::import::ImportJob;
use crate::mapping::Mapping;
use crate::parser::{Record, SourceFormat, Workbook};

pub use source::{ApiSource, Credentials, FileSource, ImportSource, SourceKind};
pub use state::{SessionState, Ticket};

/// Data loaded for the active source
#[derive(Debug, Clone)]
enum SourceData {
    File(Workbook),
    Api(Vec<Record>),
}

#[derive(Debug)]
pub struct ImportSession {
    state: SessionState,
    source: Option<ImportSource>,
    data: Option<SourceData>,
    entity_count: usize,
    last_error: Option<ImportError>,
    mapping: Option<Mapping>,
    // Deleted while a dialog was open; dropped on close
    mapping_deleted: bool,
    generation: u64,
}

impl Default for ImportSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            source: None,
            data: None,
            entity_count: 0,
            last_error: None,
            mapping: None,
            mapping_deleted: false,
            generation: 0,
        }
    }

    // Accessors

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn source(&self) -> Option<&ImportSource> {
        self.source.as_ref()
    }

    pub fn source_kind(&self) -> Option<SourceKind> {
        self.source.as_ref().map(ImportSource::kind)
    }

    pub fn entity_count(&self) -> usize {
        self.entity_count
    }

    pub fn last_error(&self) -> Option<&ImportError> {
        self.last_error.as_ref()
    }

    pub fn mapping(&self) -> Option<&Mapping> {
        self.mapping.as_ref()
    }

    pub fn is_fetching(&self) -> bool {
        self.state.is_fetching()
    }

    pub fn is_creating(&self) -> bool {
        self.state.is_creating()
    }

    pub fn is_dialog_open(&self) -> bool {
        !matches!(self.state, SessionState::Idle)
    }

    /// Import progress, only while importing
    pub fn progress(&self) -> Option<u8> {
        match self.state {
            SessionState::Importing { progress } => Some(progress),
            _ => None,
        }
    }

    pub fn summary(&self) -> Option<&ImportSummary> {
        match &self.state {
            SessionState::Completed(summary) => Some(summary),
            _ => None,
        }
    }

    pub fn file_source(&self) -> Option<&FileSource> {
        match &self.source {
            Some(ImportSource::File(file)) => Some(file),
            _ => None,
        }
    }

    pub fn api_source(&self) -> Option<&ApiSource> {
        match &self.source {
            Some(ImportSource::Api(api)) => Some(api),
            _ => None,
        }
    }

    // Mapping context

    /// Make a mapping the active context for subsequent imports
    pub fn set_mapping(&mut self, mapping: Mapping) -> Result<(), ImportError> {
        self.ensure_idle_or_settled("change the active mapping")?;
        info!("Active mapping: {} ({})", mapping.name, mapping.id);
        self.mapping = Some(mapping);
        self.mapping_deleted = false;
        Ok(())
    }

    /// Drop the active mapping if it is the given one (after a delete).
    /// With a dialog open the mapping stays visible but can no longer be
    /// imported with, and is dropped when the dialog closes.
    pub fn forget_mapping(&mut self, id: &str) {
        if !self.mapping.as_ref().is_some_and(|m| m.id == id) {
            return;
        }
        if self.is_dialog_open() {
            warn!("Mapping {} deleted while the import dialog is open", id);
            self.mapping_deleted = true;
        } else {
            self.mapping = None;
        }
    }

    pub fn is_mapping_deleted(&self) -> bool {
        self.mapping_deleted
    }

    // Dialog lifecycle

    /// Open the dialog for a source kind
    pub fn open(&mut self, kind: SourceKind) -> Result<(), ImportError> {
        if self.mapping.is_none() {
            return Err(ImportError::Validation(
                "select a mapping before importing data".to_string(),
            ));
        }
        if self.is_dialog_open() {
            return self.switch_source(kind);
        }

        self.generation += 1;
        self.source = Some(ImportSource::empty(kind));
        self.data = None;
        self.entity_count = 0;
        self.last_error = None;
        self.state = SessionState::SelectingSource;
        debug!("Opened {:?} dialog", kind);
        Ok(())
    }

    /// Replace the active source, discarding any in-flight result
    pub fn switch_source(&mut self, kind: SourceKind) -> Result<(), ImportError> {
        if !self.is_dialog_open() {
            return Err(ImportError::Validation("no import dialog is open".to_string()));
        }
        if self.is_creating() {
            return Err(busy("switch source"));
        }
        if self.source_kind() == Some(kind) && !self.is_fetching() {
            return Ok(());
        }

        if self.is_fetching() {
            info!("Switching to {:?} while {}; pending result will be discarded", kind, self.state.label());
        }

        self.generation += 1;
        self.source = Some(ImportSource::empty(kind));
        self.data = None;
        self.entity_count = 0;
        self.last_error = None;
        self.state = SessionState::SelectingSource;
        Ok(())
    }

    /// Close the dialog. Returns true when an import completed, meaning
    /// the mapping list should be refreshed.
    pub fn close(&mut self) -> Result<bool, ImportError> {
        if self.is_creating() {
            return Err(busy("close the dialog"));
        }

        let completed = matches!(self.state, SessionState::Completed(_));
        if self.mapping_deleted {
            self.mapping = None;
            self.mapping_deleted = false;
        }
        self.generation += 1;
        self.source = None;
        self.data = None;
        self.entity_count = 0;
        self.last_error = None;
        self.state = SessionState::Idle;
        debug!("Closed import dialog (completed: {})", completed);
        Ok(completed)
    }

    /// Leave `Failed`/`Completed`: back to `ReadyToImport` when the loaded
    /// data can still be imported, else to source selection
    pub fn retry(&mut self) -> Result<(), ImportError> {
        match self.state {
            SessionState::Failed | SessionState::Completed(_) => {
                self.last_error = None;
                self.state = if self.has_valid_source_data() {
                    SessionState::ReadyToImport
                } else {
                    SessionState::SelectingSource
                };
                Ok(())
            }
            _ => Err(ImportError::Validation(format!(
                "nothing to retry while {}",
                self.state.label()
            ))),
        }
    }

    // File mode

    pub fn begin_file_load(&mut self, path: PathBuf) -> Result<Ticket, ImportError> {
        if !matches!(self.source, Some(ImportSource::File(_))) {
            return Err(ImportError::Validation("file upload is not the active source".to_string()));
        }
        if self.state.is_busy() {
            return Err(busy("load a file"));
        }

        self.generation += 1;
        self.data = None;
        self.entity_count = 0;
        self.source = Some(ImportSource::File(FileSource {
            path: Some(path.clone()),
            sheet_names: Vec::new(),
            selected_sheet: None,
        }));

        if let Err(e) = SourceFormat::from_path(&path) {
            return Err(self.fail(e));
        }

        self.last_error = None;
        self.state = SessionState::FetchingSheet;
        info!("Reading {}", path.display());
        Ok(Ticket(self.generation))
    }

    /// Apply a parse result; returns false when the result was stale
    pub fn complete_file_load(
        &mut self,
        ticket: Ticket,
        result: Result<Workbook, ImportError>,
    ) -> bool {
        if !self.is_current(ticket, &SessionState::FetchingSheet) {
            debug!("Discarding stale file result for ticket {:?}", ticket);
            return false;
        }

        match result {
            Ok(workbook) => {
                let sheet_names = workbook.sheet_names();
                info!("File loaded with sheets {:?}", sheet_names);
                if let Some(ImportSource::File(file)) = &mut self.source {
                    file.sheet_names = sheet_names;
                    file.selected_sheet = None;
                }
                self.data = Some(SourceData::File(workbook));
                self.entity_count = 0;
                self.state = SessionState::ReadyToImport;
            }
            Err(e) => {
                self.fail(e);
            }
        }
        true
    }

    /// Choose (or clear) the sheet to import
    pub fn select_sheet(&mut self, sheet: Option<String>) -> Result<(), ImportError> {
        if self.state.is_busy() {
            return Err(busy("select a sheet"));
        }
        let Some(SourceData::File(workbook)) = &self.data else {
            return Err(ImportError::Validation("no file has been loaded".to_string()));
        };

        let count = match &sheet {
            Some(name) => workbook
                .rows(name)
                .map(|rows| rows.len())
                .ok_or_else(|| ImportError::Validation(format!("sheet '{}' does not exist", name)))?,
            None => 0,
        };

        if let Some(ImportSource::File(file)) = &mut self.source {
            file.selected_sheet = sheet;
        }
        self.entity_count = count;
        if matches!(self.state, SessionState::SelectingSource | SessionState::Failed) {
            self.state = SessionState::ReadyToImport;
        }
        Ok(())
    }

    // API mode

    pub fn set_url(&mut self, url: String) -> Result<(), ImportError> {
        self.edit_api(|api| api.url = url)
    }

    pub fn set_username(&mut self, username: String) -> Result<(), ImportError> {
        self.edit_api(|api| api.credentials.username = Some(username))
    }

    pub fn set_password(&mut self, password: String) -> Result<(), ImportError> {
        self.edit_api(|api| api.credentials.password = Some(password))
    }

    pub fn set_parameter(&mut self, key: String, value: String) -> Result<(), ImportError> {
        if key.trim().is_empty() {
            return Err(ImportError::Validation("parameter name is required".to_string()));
        }
        self.edit_api(|api| {
            api.parameters.insert(key.trim().to_string(), value);
        })
    }

    pub fn remove_parameter(&mut self, key: &str) -> Result<(), ImportError> {
        self.edit_api(|api| {
            api.parameters.remove(key);
        })
    }

    /// Pull is possible with a URL and nothing in flight
    pub fn can_pull(&self) -> bool {
        !self.state.is_busy() && self.api_source().is_some_and(ApiSource::has_url)
    }

    /// Start pulling; returns a copy of the source for the task
    pub fn begin_pull(&mut self) -> Result<(Ticket, ApiSource), ImportError> {
        let Some(api) = self.api_source() else {
            return Err(ImportError::Validation("API import is not the active source".to_string()));
        };
        if !api.has_url() {
            return Err(ImportError::Validation("URL is required to pull data".to_string()));
        }
        if self.state.is_busy() {
            return Err(busy("pull data"));
        }

        let api = api.clone();
        self.generation += 1;
        self.data = None;
        self.entity_count = 0;
        self.last_error = None;
        self.state = SessionState::PullingApi;
        info!("Pulling data from {}", crate::api::logging::redact_url(&api.url));
        Ok((Ticket(self.generation), api))
    }

    /// Apply a pull result; returns false when the result was stale
    pub fn complete_pull(&mut self, ticket: Ticket, result: Result<Vec<Record>, ImportError>) -> bool {
        if !self.is_current(ticket, &SessionState::PullingApi) {
            debug!("Discarding stale pull result for ticket {:?}", ticket);
            return false;
        }

        match result {
            Ok(records) => {
                info!("Pulled {} record(s)", records.len());
                self.entity_count = records.len();
                self.data = Some(SourceData::Api(records));
                self.state = SessionState::ReadyToImport;
            }
            Err(e) => {
                self.fail(e);
            }
        }
        true
    }

    // Import

    /// Import is enabled iff nothing is in flight and the source is valid
    pub fn can_import(&self) -> bool {
        !self.state.is_busy()
            && self.mapping.is_some()
            && !self.mapping_deleted
            && self.has_valid_source_data()
    }

    pub fn begin_import(&mut self) -> Result<(Ticket, ImportJob), ImportError> {
        if self.state.is_busy() {
            return Err(busy("start an import"));
        }
        let Some(mapping) = self.mapping.clone() else {
            return Err(ImportError::Validation("no mapping selected".to_string()));
        };
        if self.mapping_deleted {
            return Err(ImportError::NotFound(format!("mapping {} was deleted", mapping.name)));
        }
        let records = self.import_records().ok_or_else(|| match &self.source {
            Some(ImportSource::File(_)) => {
                ImportError::Validation("load a file and select a sheet first".to_string())
            }
            Some(ImportSource::Api(_)) => ImportError::Validation("pull data first".to_string()),
            None => ImportError::Validation("no data source selected".to_string()),
        })?;

        self.generation += 1;
        self.last_error = None;
        self.state = SessionState::Importing { progress: 0 };
        info!("Importing {} record(s) with mapping {}", records.len(), mapping.name);
        Ok((Ticket(self.generation), ImportJob { mapping, records }))
    }

    /// Returns false when the update was stale
    pub fn report_progress(&mut self, ticket: Ticket, progress: u8) -> bool {
        if ticket.0 != self.generation || !self.is_creating() {
            return false;
        }
        self.state = SessionState::Importing {
            progress: progress.min(100),
        };
        true
    }

    pub fn complete_import(
        &mut self,
        ticket: Ticket,
        result: Result<ImportSummary, ImportError>,
    ) -> bool {
        if ticket.0 != self.generation || !self.is_creating() {
            debug!("Discarding stale import result for ticket {:?}", ticket);
            return false;
        }

        match result {
            Ok(summary) => {
                info!(
                    "Import finished: {} imported, {} updated, {} skipped, {} failed",
                    summary.imported, summary.updated, summary.skipped, summary.failed
                );
                self.state = SessionState::Completed(summary);
            }
            Err(e) => {
                self.fail(e);
            }
        }
        true
    }

    // Internals

    fn is_current(&self, ticket: Ticket, expected: &SessionState) -> bool {
        ticket.0 == self.generation && &self.state == expected
    }

    fn fail(&mut self, error: ImportError) -> ImportError {
        warn!("Import session failed: {}", error);
        self.last_error = Some(error.clone());
        self.state = SessionState::Failed;
        error
    }

    fn has_valid_source_data(&self) -> bool {
        self.import_records_len().is_some()
    }

    fn import_records_len(&self) -> Option<usize> {
        match (&self.source, &self.data) {
            (Some(ImportSource::File(file)), Some(SourceData::File(workbook))) => {
                let sheet = file.selected_sheet.as_deref()?;
                workbook.sheet(sheet).map(|s| s.row_count())
            }
            (Some(ImportSource::Api(_)), Some(SourceData::Api(records))) => Some(records.len()),
            _ => None,
        }
    }

    fn import_records(&self) -> Option<Vec<Record>> {
        match (&self.source, &self.data) {
            (Some(ImportSource::File(file)), Some(SourceData::File(workbook))) => {
                workbook.rows(file.selected_sheet.as_deref()?)
            }
            (Some(ImportSource::Api(_)), Some(SourceData::Api(records))) => Some(records.clone()),
            _ => None,
        }
    }

    fn edit_api(&mut self, edit: impl FnOnce(&mut ApiSource)) -> Result<(), ImportError> {
        if self.state.is_busy() {
            return Err(busy("edit the API settings"));
        }
        let Some(ImportSource::Api(api)) = &mut self.source else {
            return Err(ImportError::Validation("API import is not the active source".to_string()));
        };

        edit(api);

        // Pulled data no longer matches the settings
        if self.data.take().is_some() {
            self.entity_count = 0;
            self.state = SessionState::SelectingSource;
        }
        Ok(())
    }

    fn ensure_idle_or_settled(&self, action: &str) -> Result<(), ImportError> {
        if self.is_dialog_open() {
            return Err(ImportError::Validation(format!("close the import dialog to {}", action)));
        }
        Ok(())
    }
}

fn busy(action: &str) -> ImportError {
    ImportError::Validation(format!("cannot {} while an operation is in progress", action))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::fixtures::event_mapping;
    use crate::parser::Sheet;

    fn workbook(names: &[&str]) -> Workbook {
        Workbook {
            path: PathBuf::from("data.xlsx"),
            sheets: names
                .iter()
                .map(|name| Sheet {
                    name: name.to_string(),
                    headers: vec!["facility".into(), "age".into()],
                    rows: vec![vec!["DiszpKrYNg8".into(), "4".into()]],
                })
                .collect(),
        }
    }

    fn open_session(kind: SourceKind) -> ImportSession {
        let mut session = ImportSession::new();
        session.set_mapping(event_mapping("Morbidity")).unwrap();
        session.open(kind).unwrap();
        session
    }

    #[test]
    fn test_open_requires_mapping() {
        let mut session = ImportSession::new();
        assert!(matches!(session.open(SourceKind::File), Err(ImportError::Validation(_))));
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[test]
    fn test_unsupported_extension_fails_immediately() {
        let mut session = open_session(SourceKind::File);
        let result = session.begin_file_load(PathBuf::from("notes.txt"));

        assert!(matches!(result, Err(ImportError::Parse(_))));
        assert_eq!(session.state(), &SessionState::Failed);
        assert!(matches!(session.last_error(), Some(ImportError::Parse(_))));
    }

    #[test]
    fn test_busy_guard_rejects_second_operation() {
        let mut session = open_session(SourceKind::File);
        let _ticket = session.begin_file_load(PathBuf::from("data.xlsx")).unwrap();

        assert!(session.begin_file_load(PathBuf::from("other.xlsx")).is_err());
        assert!(session.begin_import().is_err());
        assert!(session.is_fetching());
        assert!(!session.is_creating());
    }

    #[test]
    fn test_stale_ticket_after_reload() {
        let mut session = open_session(SourceKind::File);
        let first = session.begin_file_load(PathBuf::from("a.xlsx")).unwrap();
        session.complete_file_load(first, Err(ImportError::Parse("bad".into())));
        let second = session.begin_file_load(PathBuf::from("b.xlsx")).unwrap();

        assert!(!session.complete_file_load(first, Ok(workbook(&["Old"]))));
        assert!(session.complete_file_load(second, Ok(workbook(&["New"]))));
        assert_eq!(session.file_source().unwrap().sheet_names, vec!["New".to_string()]);
    }

    #[test]
    fn test_select_unknown_sheet() {
        let mut session = open_session(SourceKind::File);
        let ticket = session.begin_file_load(PathBuf::from("data.xlsx")).unwrap();
        session.complete_file_load(ticket, Ok(workbook(&["Q1"])));

        assert!(session.select_sheet(Some("Q9".into())).is_err());
        session.select_sheet(Some("Q1".into())).unwrap();
        assert_eq!(session.entity_count(), 1);
        session.select_sheet(None).unwrap();
        assert!(!session.can_import());
    }

    #[test]
    fn test_progress_is_clamped_and_only_while_importing() {
        let mut session = open_session(SourceKind::Api);
        session.set_url("https://example.org/api".into()).unwrap();
        let (ticket, _) = session.begin_pull().unwrap();
        assert!(!session.report_progress(ticket, 10));
        session.complete_pull(ticket, Ok(vec![]));

        let (ticket, job) = session.begin_import().unwrap();
        assert!(job.records.is_empty());
        assert!(session.report_progress(ticket, 250));
        assert_eq!(session.progress(), Some(100));
    }

    #[test]
    fn test_editing_api_settings_invalidates_pulled_data() {
        let mut session = open_session(SourceKind::Api);
        session.set_url("https://example.org/api".into()).unwrap();
        let (ticket, _) = session.begin_pull().unwrap();
        session.complete_pull(ticket, Ok(vec![Record::new()]));
        assert!(session.can_import());

        session.set_parameter("page".into(), "2".into()).unwrap();
        assert!(!session.can_import());
        assert_eq!(session.entity_count(), 0);
        assert_eq!(session.state(), &SessionState::SelectingSource);
    }

    #[test]
    fn test_close_refused_while_importing() {
        let mut session = open_session(SourceKind::Api);
        session.set_url("https://example.org/api".into()).unwrap();
        let (ticket, _) = session.begin_pull().unwrap();
        session.complete_pull(ticket, Ok(vec![]));
        let (ticket, _) = session.begin_import().unwrap();

        assert!(session.close().is_err());
        assert!(session.switch_source(SourceKind::File).is_err());

        let summary = ImportSummary::new(crate::api::models::ProgramKind::Event, 0);
        assert!(session.complete_import(ticket, Ok(summary)));
        assert_eq!(session.close().unwrap(), true);
        assert!(session.source().is_none());
    }

    #[test]
    fn test_retry_keeps_source() {
        let mut session = open_session(SourceKind::Api);
        session.set_url("https://example.org/api".into()).unwrap();
        let (ticket, _) = session.begin_pull().unwrap();
        session.complete_pull(ticket, Err(ImportError::Network("down".into())));

        session.retry().unwrap();
        assert_eq!(session.state(), &SessionState::SelectingSource);
        assert_eq!(session.api_source().unwrap().url, "https://example.org/api");
        assert!(session.last_error().is_none());
        assert!(session.retry().is_err());
    }

    #[test]
    fn test_retry_after_failed_import_is_ready_again() {
        let mut session = open_session(SourceKind::Api);
        session.set_url("https://example.org/api".into()).unwrap();
        let (ticket, _) = session.begin_pull().unwrap();
        session.complete_pull(ticket, Ok(vec![Record::new()]));
        let (ticket, _) = session.begin_import().unwrap();
        session.complete_import(ticket, Err(ImportError::Network("reset".into())));

        session.retry().unwrap();
        assert_eq!(session.state(), &SessionState::ReadyToImport);
        assert!(session.can_import());
    }
}
