//! Progress display model

use crate::session::ImportSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Reading a file or pulling data; duration unknown
    Indeterminate,
    Percent(u8),
}

/// What the progress modal shows. Holds no state of its own: `open` comes
/// from the wizard, the value from the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressView {
    pub open: bool,
    pub progress: Progress,
}

impl ProgressView {
    /// None when nothing is in flight
    pub fn from_session(session: &ImportSession, hidden: bool) -> Option<Self> {
        let progress = if let Some(pct) = session.progress() {
            Progress::Percent(pct.min(100))
        } else if session.is_fetching() {
            Progress::Indeterminate
        } else {
            return None;
        };

        Some(Self {
            open: !hidden,
            progress,
        })
    }

    pub fn label(&self) -> String {
        match self.progress {
            Progress::Indeterminate => "Working...".to_string(),
            Progress::Percent(pct) => format!("Importing... {}%", pct),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_session_has_no_progress() {
        assert!(ProgressView::from_session(&ImportSession::new(), false).is_none());
    }

    #[test]
    fn test_labels() {
        let view = ProgressView {
            open: true,
            progress: Progress::Percent(42),
        };
        assert_eq!(view.label(), "Importing... 42%");
    }
}
