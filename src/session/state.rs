use crate::api::models::ImportSummary;

/// Where the import dialog currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No dialog open
    Idle,
    /// Dialog open, waiting for a file or a pull
    SelectingSource,
    FetchingSheet,
    PullingApi,
    ReadyToImport,
    Importing { progress: u8 },
    Completed(ImportSummary),
    /// Recoverable; the error is kept in `last_error`
    Failed,
}

impl SessionState {
    pub fn is_fetching(&self) -> bool {
        matches!(self, SessionState::FetchingSheet | SessionState::PullingApi)
    }

    pub fn is_creating(&self) -> bool {
        matches!(self, SessionState::Importing { .. })
    }

    pub fn is_busy(&self) -> bool {
        self.is_fetching() || self.is_creating()
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::SelectingSource => "selecting source",
            SessionState::FetchingSheet => "reading file",
            SessionState::PullingApi => "pulling data",
            SessionState::ReadyToImport => "ready to import",
            SessionState::Importing { .. } => "importing",
            SessionState::Completed(_) => "completed",
            SessionState::Failed => "failed",
        }
    }
}

/// Identifies the async operation a completion belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(pub(crate) u64);
