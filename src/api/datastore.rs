//! Mapping persistence in the DHIS2 dataStore
//!
//! Each mapping is stored as one key (its id) under a namespace. Listing
//! reads the namespace keys, then fetches every key in server order.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Method, StatusCode};
use serde_json::Value;

use super::auth::Session;
use super::client::{Dhis2Client, status_error};
use super::with_timeout;
use crate::error::ImportError;
use crate::mapping::{Mapping, MappingBackend};

pub const DEFAULT_NAMESPACE: &str = "import-wizard";

#[derive(Debug, Clone)]
pub struct Dhis2DataStore {
    client: Dhis2Client,
    session: Session,
    namespace: String,
}

impl Dhis2DataStore {
    pub fn new(client: Dhis2Client, session: Session, namespace: impl Into<String>) -> Self {
        Self {
            client,
            session,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn path(&self, key: Option<&str>) -> String {
        let namespace = urlencoding::encode(&self.namespace);
        match key {
            Some(key) => format!("dataStore/{}/{}", namespace, urlencoding::encode(key)),
            None => format!("dataStore/{}", namespace),
        }
    }

    async fn call(
        &self,
        method: Method,
        key: Option<&str>,
        body: Option<&Mapping>,
    ) -> Result<(StatusCode, Value), ImportError> {
        let path = self.path(key);
        let url = self.session.url(&path);
        let mut request = self.client.request(&self.session, method.clone(), &path);
        if let Some(mapping) = body {
            request = request.json(mapping);
        }

        let target = key.unwrap_or(&self.namespace).to_string();
        with_timeout(
            "dataStore request",
            self.client.config().operation_timeout,
            self.client
                .send_json("datastore", &target, method.as_str(), &url, request),
        )
        .await
    }

    async fn keys(&self) -> Result<Vec<String>, ImportError> {
        let (status, body) = self.call(Method::GET, None, None).await?;
        match status {
            s if s.is_success() => serde_json::from_value(body)
                .map_err(|e| ImportError::Parse(format!("unexpected dataStore key list: {}", e))),
            // Namespace is created on first save
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            s => Err(status_error(s, &body)),
        }
    }
}

#[async_trait]
impl MappingBackend for Dhis2DataStore {
    async fn list(&self) -> Result<Vec<Mapping>, ImportError> {
        let keys = self.keys().await?;
        debug!("dataStore namespace {} has {} key(s)", self.namespace, keys.len());

        let mut mappings = Vec::with_capacity(keys.len());
        for key in keys {
            match self.get(&key).await {
                Ok(Some(mapping)) => mappings.push(mapping),
                Ok(None) => debug!("Key {} vanished while listing", key),
                Err(ImportError::Parse(reason)) => {
                    warn!("Skipping unreadable mapping {}: {}", key, reason);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(mappings)
    }

    async fn get(&self, id: &str) -> Result<Option<Mapping>, ImportError> {
        let (status, body) = self.call(Method::GET, Some(id), None).await?;
        match status {
            s if s.is_success() => serde_json::from_value(body)
                .map(Some)
                .map_err(|e| ImportError::Parse(format!("mapping '{}' is malformed: {}", id, e))),
            StatusCode::NOT_FOUND => Ok(None),
            s => Err(status_error(s, &body)),
        }
    }

    async fn save(&self, mapping: &Mapping) -> Result<(), ImportError> {
        let (status, body) = self.call(Method::PUT, Some(&mapping.id), Some(mapping)).await?;
        if status.is_success() {
            return Ok(());
        }
        if status != StatusCode::NOT_FOUND {
            return Err(status_error(status, &body));
        }

        // PUT only updates existing keys
        let (status, body) = self.call(Method::POST, Some(&mapping.id), Some(mapping)).await?;
        if status.is_success() {
            Ok(())
        } else {
            Err(status_error(status, &body))
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, ImportError> {
        let (status, body) = self.call(Method::DELETE, Some(id), None).await?;
        match status {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => Err(status_error(s, &body)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::{BasicCredentials, CurrentUser};
    use crate::api::config::ClientConfig;

    #[test]
    fn test_keys_are_url_encoded() {
        let session = Session::new(
            "https://play.dhis2.org/dev/api/",
            BasicCredentials::new("admin", "district"),
            CurrentUser {
                id: "xE7jOejl9FI".to_string(),
                username: None,
                display_name: None,
            },
        );
        let client = Dhis2Client::new(ClientConfig::quiet()).unwrap();
        let store = Dhis2DataStore::new(client, session, "import wizard");

        assert_eq!(store.path(None), "dataStore/import%20wizard");
        assert_eq!(store.path(Some("a/b")), "dataStore/import%20wizard/a%2Fb");
    }
}
