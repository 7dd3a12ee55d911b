//! Structured request logging with correlation ids
//!
//! Every remote call gets an [`OperationContext`]; request, response and
//! completion events are emitted as single-line JSON so the log file can be
//! grepped by correlation id.

use log::{debug, error, info, warn};
use serde_json::json;
use std::time::{Duration, Instant};

/// Structured logger for DHIS2 and external API calls
#[derive(Debug, Clone)]
pub struct ApiLogger {
    enabled: bool,
}

/// Context for a single remote operation
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub correlation_id: String,
    /// authenticate, metadata, import, pull, datastore
    pub operation: String,
    /// Program id, dataStore key, URL host, ...
    pub target: String,
    pub start_time: Instant,
}

impl ApiLogger {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Start tracking a new operation
    pub fn start_operation(&self, operation: &str, target: &str) -> OperationContext {
        let context = OperationContext {
            correlation_id: uuid::Uuid::new_v4().to_string(),
            operation: operation.to_string(),
            target: target.to_string(),
            start_time: Instant::now(),
        };

        if self.enabled {
            let log_data = json!({
                "event": "operation_started",
                "correlation_id": context.correlation_id,
                "operation": context.operation,
                "target": context.target,
                "timestamp": chrono::Utc::now().to_rfc3339()
            });
            info!("API Operation Started: {}", log_data);
        }

        context
    }

    /// Log HTTP request details
    pub fn log_request(&self, context: &OperationContext, method: &str, url: &str) {
        if !self.enabled {
            return;
        }

        let log_data = json!({
            "event": "http_request",
            "correlation_id": context.correlation_id,
            "method": method,
            "url": redact_url(url),
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        debug!("HTTP Request: {}", log_data);
    }

    /// Log HTTP response details
    pub fn log_response(&self, context: &OperationContext, status_code: u16) {
        if !self.enabled {
            return;
        }

        let log_data = json!({
            "event": "http_response",
            "correlation_id": context.correlation_id,
            "status_code": status_code,
            "duration_ms": context.elapsed().as_millis(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        if status_code >= 400 {
            warn!("HTTP Response (Error): {}", log_data);
        } else {
            debug!("HTTP Response: {}", log_data);
        }
    }

    /// Complete an operation
    pub fn complete_operation(&self, context: &OperationContext, error_message: Option<&str>) {
        if !self.enabled {
            return;
        }

        let log_data = json!({
            "event": "operation_completed",
            "correlation_id": context.correlation_id,
            "operation": context.operation,
            "target": context.target,
            "duration_ms": context.elapsed().as_millis(),
            "success": error_message.is_none(),
            "error_message": error_message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        if error_message.is_none() {
            info!("API Operation Completed: {}", log_data);
        } else {
            error!("API Operation Failed: {}", log_data);
        }
    }
}

impl OperationContext {
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Strip user info and secret-looking query parameters from a URL
pub fn redact_url(url: &str) -> String {
    let Ok(mut parsed) = reqwest::Url::parse(url) else {
        return url.to_string();
    };

    if !parsed.username().is_empty() || parsed.password().is_some() {
        let _ = parsed.set_username("");
        let _ = parsed.set_password(None);
    }

    if parsed.query().is_some() {
        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(key, value)| {
                let lower = key.to_lowercase();
                if lower.contains("password") || lower.contains("token") || lower.contains("key") {
                    (key.into_owned(), "[REDACTED]".to_string())
                } else {
                    (key.into_owned(), value.into_owned())
                }
            })
            .collect();
        parsed.query_pairs_mut().clear().extend_pairs(pairs);
    }

    parsed.to_string()
}
