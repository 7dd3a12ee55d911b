//! DHIS2 Web API access
//!
//! [`RemoteClient`] is the seam the wizard and the import runner talk to;
//! [`Dhis2Client`] implements it over reqwest. Mappings are persisted through
//! [`Dhis2DataStore`].

pub mod auth;
pub mod client;
pub mod config;
pub mod datastore;
pub mod logging;
pub mod models;

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use crate::error::ImportError;
use crate::parser::Record;
use crate::session::ApiSource;

pub use auth::{BasicCredentials, CurrentUser, Session};
pub use client::Dhis2Client;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use datastore::Dhis2DataStore;
pub use logging::{ApiLogger, OperationContext};
pub use models::{ImportPayload, ImportReport, ImportSummary, ProgramKind, ProgramSchema};

/// Remote operations used by the import workflow
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Verify credentials against `GET /api/me`
    async fn authenticate(
        &self,
        base_url: &str,
        credentials: &BasicCredentials,
    ) -> Result<Session, ImportError>;

    async fn fetch_metadata(
        &self,
        session: &Session,
        program_id: &str,
    ) -> Result<ProgramSchema, ImportError>;

    /// Submit one batch; a partial import is still `Ok`
    async fn submit_import(
        &self,
        session: &Session,
        payload: &ImportPayload,
    ) -> Result<ImportReport, ImportError>;

    /// Pull records from an external REST API
    async fn pull_records(&self, source: &ApiSource) -> Result<Vec<Record>, ImportError>;
}

/// Bound a remote operation; expiry is reported as a network error
pub async fn with_timeout<T, F>(operation: &str, limit: Duration, future: F) -> Result<T, ImportError>
where
    F: Future<Output = Result<T, ImportError>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => {
            log::warn!("{} exceeded {:?}", operation, limit);
            Err(ImportError::timed_out(operation, limit))
        }
    }
}
