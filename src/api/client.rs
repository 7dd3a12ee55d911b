use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::Value;

use super::auth::{BasicCredentials, CurrentUser, Session, normalize_base_url};
use super::config::ClientConfig;
use super::logging::ApiLogger;
use super::models::{ImportPayload, ImportReport, PROGRAM_FIELDS, ProgramSchema};
use super::{RemoteClient, with_timeout};
use crate::error::ImportError;
use crate::parser::{Record, records_from_json};
use crate::session::ApiSource;

/// DHIS2 Web API client with connection pooling
#[derive(Debug, Clone)]
pub struct Dhis2Client {
    http_client: reqwest::Client,
    config: ClientConfig,
    logger: ApiLogger,
}

impl Dhis2Client {
    pub fn new(config: ClientConfig) -> Result<Self, ImportError> {
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ImportError::Network(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self::with_custom_client(config, http_client))
    }

    pub fn with_custom_client(config: ClientConfig, http_client: reqwest::Client) -> Self {
        Self {
            logger: ApiLogger::new(config.request_logging),
            http_client,
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Authenticated request below the session's API root
    pub(crate) fn request(&self, session: &Session, method: Method, path: &str) -> RequestBuilder {
        let credentials = session.credentials();
        self.http_client
            .request(method, session.url(path))
            .basic_auth(&credentials.username, Some(&credentials.password))
            .header("Accept", "application/json")
    }

    /// Send, log and return status + parsed JSON body (Null when empty)
    pub(crate) async fn send_json(
        &self,
        operation: &str,
        target: &str,
        method: &str,
        url: &str,
        request: RequestBuilder,
    ) -> Result<(StatusCode, Value), ImportError> {
        let context = self.logger.start_operation(operation, target);
        self.logger.log_request(&context, method, url);

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let error = ImportError::from_reqwest(&e);
                self.logger.complete_operation(&context, Some(&error.to_string()));
                return Err(error);
            }
        };

        let status = response.status();
        self.logger.log_response(&context, status.as_u16());

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                let error = ImportError::from_reqwest(&e);
                self.logger.complete_operation(&context, Some(&error.to_string()));
                return Err(error);
            }
        };

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(value) => value,
                Err(_) if !status.is_success() => Value::String(text),
                Err(e) => {
                    let error = ImportError::Parse(format!("invalid JSON from {}: {}", target, e));
                    self.logger.complete_operation(&context, Some(&error.to_string()));
                    return Err(error);
                }
            }
        };

        let failure = (!status.is_success()).then(|| format!("HTTP {}", status.as_u16()));
        self.logger.complete_operation(&context, failure.as_deref());
        Ok((status, body))
    }
}

/// Error for a non-success response
pub(crate) fn status_error(status: StatusCode, body: &Value) -> ImportError {
    let text = match body {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    ImportError::from_status(status.as_u16(), &text)
}

#[async_trait]
impl RemoteClient for Dhis2Client {
    async fn authenticate(
        &self,
        base_url: &str,
        credentials: &BasicCredentials,
    ) -> Result<Session, ImportError> {
        let base_url = normalize_base_url(base_url);
        if base_url.is_empty() {
            return Err(ImportError::Validation("DHIS2 base URL is required".to_string()));
        }

        let url = format!("{}/me", base_url);
        let request = self
            .http_client
            .get(&url)
            .query(&[("fields", "id,username,displayName")])
            .basic_auth(&credentials.username, Some(&credentials.password))
            .header("Accept", "application/json");

        let (status, body) = with_timeout(
            "authenticating",
            self.config.operation_timeout,
            self.send_json("authenticate", &base_url, "GET", &url, request),
        )
        .await?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let user: CurrentUser = serde_json::from_value(body)
            .map_err(|e| ImportError::Parse(format!("unexpected /me response: {}", e)))?;
        log::info!("Authenticated against {} as {}", base_url, credentials.username);
        Ok(Session::new(&base_url, credentials.clone(), user))
    }

    async fn fetch_metadata(
        &self,
        session: &Session,
        program_id: &str,
    ) -> Result<ProgramSchema, ImportError> {
        let path = format!("programs/{}", urlencoding::encode(program_id));
        let url = session.url(&path);
        let request = self
            .request(session, Method::GET, &path)
            .query(&[("fields", PROGRAM_FIELDS)]);

        let (status, body) = self.send_json("metadata", program_id, "GET", &url, request).await?;
        match status {
            s if s.is_success() => ProgramSchema::from_json(body)
                .map_err(|e| ImportError::Parse(format!("unexpected program metadata: {}", e))),
            StatusCode::NOT_FOUND => Err(ImportError::NotFound(format!("program '{}'", program_id))),
            s => Err(status_error(s, &body)),
        }
    }

    async fn submit_import(
        &self,
        session: &Session,
        payload: &ImportPayload,
    ) -> Result<ImportReport, ImportError> {
        let endpoint = payload.endpoint();
        let url = session.url(endpoint);
        let request = self
            .request(session, Method::POST, endpoint)
            .query(&[("strategy", "CREATE_AND_UPDATE")])
            .json(&payload.body());

        let (status, body) = self.send_json("import", endpoint, "POST", &url, request).await?;

        // 409 with a summary means some rows were ignored
        if status.is_success() || status == StatusCode::CONFLICT {
            if let Some(report) = ImportReport::from_json(&body) {
                return Ok(report);
            }
        }
        if status.is_success() {
            return Err(ImportError::Parse(format!("{} returned no import summary", endpoint)));
        }
        Err(status_error(status, &body))
    }

    async fn pull_records(&self, source: &ApiSource) -> Result<Vec<Record>, ImportError> {
        let url = source.url.trim();
        if url.is_empty() {
            return Err(ImportError::Validation("URL is required to pull data".to_string()));
        }
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| ImportError::Validation(format!("invalid URL '{}': {}", url, e)))?;
        let host = parsed.host_str().unwrap_or_default().to_string();

        let mut request = self
            .http_client
            .get(parsed)
            .query(&source.parameters)
            .header("Accept", "application/json");
        if let Some((username, password)) = source.credentials.basic_auth() {
            request = request.basic_auth(username, password);
        }

        let (status, body) = self.send_json("pull", &host, "GET", url, request).await?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }
        records_from_json(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_error_classification() {
        let auth = status_error(StatusCode::UNAUTHORIZED, &Value::Null);
        assert!(matches!(auth, ImportError::Auth(_)));

        let server = status_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            &json!({ "message": "Program not accessible" }),
        );
        assert_eq!(
            server,
            ImportError::Server {
                status: 500,
                detail: "Program not accessible".to_string()
            }
        );
    }

    #[test]
    fn test_client_builds_with_defaults() {
        let client = Dhis2Client::new(ClientConfig::quiet()).unwrap();
        assert!(!client.config().request_logging);
    }
}
