//! Observable list of saved mappings
//!
//! The store is the only writer of the list. Views subscribe through a
//! `watch` channel and are notified after every mutation.

use async_trait::async_trait;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;

use super::Mapping;
use super::template;
use crate::error::ImportError;

/// Remote persistence for mappings (the DHIS2 dataStore in production)
#[async_trait]
pub trait MappingBackend: Send + Sync {
    async fn list(&self) -> Result<Vec<Mapping>, ImportError>;
    async fn get(&self, id: &str) -> Result<Option<Mapping>, ImportError>;
    async fn save(&self, mapping: &Mapping) -> Result<(), ImportError>;
    /// Returns false when there was nothing to delete
    async fn delete(&self, id: &str) -> Result<bool, ImportError>;
}

/// Cheap to clone; clones share the same list and backend
#[derive(Clone)]
pub struct MappingStore {
    backend: Arc<dyn MappingBackend>,
    mappings: Arc<watch::Sender<Vec<Mapping>>>,
    program_filter: Option<String>,
}

impl MappingStore {
    pub fn new(backend: Arc<dyn MappingBackend>) -> Self {
        let (sender, _) = watch::channel(Vec::new());
        Self {
            backend,
            mappings: Arc::new(sender),
            program_filter: None,
        }
    }

    /// Only list mappings that import into this program
    pub fn with_program_filter(mut self, program_id: Option<String>) -> Self {
        self.program_filter = program_id;
        self
    }

    /// Receiver notified whenever the list changes
    pub fn subscribe(&self) -> watch::Receiver<Vec<Mapping>> {
        self.mappings.subscribe()
    }

    /// Snapshot of the current list
    pub fn mappings(&self) -> Vec<Mapping> {
        self.mappings.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.mappings.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.borrow().is_empty()
    }

    /// Fetch the list from the backend; on failure the list is left alone
    pub async fn refresh(&self) -> Result<Vec<Mapping>, ImportError> {
        let mut mappings = self.backend.list().await?;

        if let Some(program) = &self.program_filter {
            mappings.retain(|m| &m.program.id == program);
        }

        info!("Loaded {} mapping(s)", mappings.len());
        self.mappings.send_replace(mappings.clone());
        Ok(mappings)
    }

    /// Load a mapping as the active context
    pub async fn select(&self, id: &str) -> Result<Mapping, ImportError> {
        match self.backend.get(id).await? {
            Some(mapping) => {
                debug!("Selected mapping {} ({})", mapping.id, mapping.name);
                self.upsert_local(mapping.clone());
                Ok(mapping)
            }
            None => {
                warn!("Mapping {} no longer exists", id);
                self.remove_local(id);
                Err(ImportError::NotFound(format!("mapping '{}'", id)))
            }
        }
    }

    /// Delete remotely and locally; deleting a missing id is a no-op success
    pub async fn delete(&self, id: &str) -> Result<(), ImportError> {
        let existed = self.backend.delete(id).await?;
        if !existed {
            debug!("Mapping {} was already gone server-side", id);
        }
        self.remove_local(id);
        Ok(())
    }

    /// Persist a new or edited mapping
    pub async fn save(&self, mapping: Mapping) -> Result<Mapping, ImportError> {
        mapping.validate()?;
        self.backend.save(&mapping).await?;
        info!("Saved mapping {} ({})", mapping.id, mapping.name);
        self.upsert_local(mapping.clone());
        Ok(mapping)
    }

    /// Write a mapping's definition to a template file
    pub async fn export_template(&self, id: &str, path: &Path) -> Result<PathBuf, ImportError> {
        let mapping = match self.find_local(id) {
            Some(mapping) => mapping,
            None => self
                .backend
                .get(id)
                .await?
                .ok_or_else(|| ImportError::NotFound(format!("mapping '{}'", id)))?,
        };

        template::write_template(&mapping, path)?;
        info!("Exported mapping {} to {}", id, path.display());
        Ok(path.to_path_buf())
    }

    /// Read a template file and save it as a new mapping (fresh id)
    pub async fn import_template(&self, path: &Path) -> Result<Mapping, ImportError> {
        let mapping = template::read_template(path)?;
        self.save(mapping).await
    }

    fn find_local(&self, id: &str) -> Option<Mapping> {
        self.mappings.borrow().iter().find(|m| m.id == id).cloned()
    }

    fn upsert_local(&self, mapping: Mapping) {
        if let Some(program) = &self.program_filter {
            if &mapping.program.id != program {
                return;
            }
        }
        self.mappings.send_modify(|list| {
            match list.iter_mut().find(|m| m.id == mapping.id) {
                Some(existing) => *existing = mapping,
                None => list.push(mapping),
            }
        });
    }

    fn remove_local(&self, id: &str) {
        self.mappings.send_if_modified(|list| {
            let before = list.len();
            list.retain(|m| m.id != id);
            list.len() != before
        });
    }
}
