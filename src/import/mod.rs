//! Running an import against DHIS2
//!
//! [`run_import`] returns a stream: zero or more `Progress` events followed by
//! exactly one `Finished`. The wizard forwards each event as a message.

pub mod payload;

use futures::stream::{self, Stream};
use log::{info, warn};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crate::api::auth::Session;
use crate::api::models::{ImportPayload, ImportSummary};
use crate::api::{RemoteClient, with_timeout};
use crate::error::ImportError;
use crate::mapping::Mapping;
use crate::parser::Record;

pub use payload::{PreparedImport, prepare};

/// Progress reported once metadata is in and payloads are built
pub const METADATA_PROGRESS: u8 = 5;

/// Everything an import task needs, detached from the session
#[derive(Debug, Clone)]
pub struct ImportJob {
    pub mapping: Mapping,
    pub records: Vec<Record>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSettings {
    pub batch_size: usize,
    pub operation_timeout: Duration,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            batch_size: 50,
            operation_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportEvent {
    Progress(u8),
    Finished(Result<ImportSummary, ImportError>),
}

enum Step {
    Metadata,
    Batches(BatchState),
    Done,
}

struct BatchState {
    pending: VecDeque<ImportPayload>,
    total_batches: usize,
    accepted: usize,
    last_rejection: Option<ImportError>,
    summary: ImportSummary,
}

struct Runner {
    client: Arc<dyn RemoteClient>,
    session: Session,
    job: ImportJob,
    settings: ImportSettings,
}

/// Validate, build and submit the job batch by batch
pub fn run_import(
    client: Arc<dyn RemoteClient>,
    session: Session,
    job: ImportJob,
    settings: ImportSettings,
) -> impl Stream<Item = ImportEvent> + Send {
    let runner = Arc::new(Runner {
        client,
        session,
        job,
        settings,
    });

    stream::unfold(Step::Metadata, move |step| {
        let runner = runner.clone();
        async move {
            match step {
                Step::Metadata => Some(match runner.prepare().await {
                    Ok(state) => (ImportEvent::Progress(METADATA_PROGRESS), Step::Batches(state)),
                    Err(e) => (ImportEvent::Finished(Err(e)), Step::Done),
                }),
                Step::Batches(state) => Some(runner.next_batch(state).await),
                Step::Done => None,
            }
        }
    })
}

impl Runner {
    async fn prepare(&self) -> Result<BatchState, ImportError> {
        let program_id = &self.job.mapping.program.id;
        let schema = with_timeout(
            "fetching program metadata",
            self.settings.operation_timeout,
            self.client.fetch_metadata(&self.session, program_id),
        )
        .await?;

        let prepared = prepare(&self.job.mapping, &schema, &self.job.records, self.settings.batch_size)?;
        for issue in &prepared.issues {
            warn!("{}", issue);
        }
        info!(
            "Submitting {} {} in {} batch(es)",
            prepared.entity_count(),
            prepared.kind.unit_label(),
            prepared.batches.len()
        );

        let mut summary = ImportSummary::new(prepared.kind, prepared.total);
        summary.skipped = prepared.skipped;
        summary.conflicts = prepared.issues;

        Ok(BatchState {
            total_batches: prepared.batches.len(),
            pending: prepared.batches.into(),
            accepted: 0,
            last_rejection: None,
            summary,
        })
    }

    async fn next_batch(&self, mut state: BatchState) -> (ImportEvent, Step) {
        let Some(batch) = state.pending.pop_front() else {
            return (ImportEvent::Finished(finish(state)), Step::Done);
        };

        let result = with_timeout(
            "submitting import batch",
            self.settings.operation_timeout,
            self.client.submit_import(&self.session, &batch),
        )
        .await;

        match result {
            Ok(report) => {
                state.accepted += 1;
                state.summary.absorb(&report);
            }
            Err(e @ ImportError::Server { .. }) => {
                warn!("Batch of {} rejected: {}", batch.len(), e);
                state.summary.record_rejected(batch.len(), &e.to_string());
                state.last_rejection = Some(e);
            }
            Err(e) => return (ImportEvent::Finished(Err(e)), Step::Done),
        }

        let done = state.total_batches - state.pending.len();
        let progress = batch_progress(done, state.total_batches);
        (ImportEvent::Progress(progress), Step::Batches(state))
    }
}

fn finish(state: BatchState) -> Result<ImportSummary, ImportError> {
    match state.last_rejection {
        Some(error) if state.accepted == 0 => Err(error),
        _ => Ok(state.summary),
    }
}

/// Percentage after `done` of `total` batches, leaving room for the metadata step
pub fn batch_progress(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let span = (100 - METADATA_PROGRESS) as usize;
    (METADATA_PROGRESS as usize + span * done.min(total) / total) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_progress() {
        assert_eq!(batch_progress(0, 4), 5);
        assert_eq!(batch_progress(2, 4), 52);
        assert_eq!(batch_progress(4, 4), 100);
        assert_eq!(batch_progress(9, 4), 100);
        assert_eq!(batch_progress(0, 0), 100);
    }
}
