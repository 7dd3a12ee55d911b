//! HTTP client configuration with builder pattern
//!
//! Provides timeouts and request logging settings for the DHIS2 client
//! with sane defaults.

use std::time::Duration;

/// Configuration for the DHIS2 and external API clients
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Per-request timeout enforced by reqwest
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Upper bound for a whole logical operation (pull, one import batch, ...)
    pub operation_timeout: Duration,
    pub user_agent: String,
    pub request_logging: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            operation_timeout: Duration::from_secs(60),
            user_agent: format!("dhis2-import-wizard/{}", env!("CARGO_PKG_VERSION")),
            request_logging: true,
        }
    }
}

impl ClientConfig {
    /// Create a new builder for ClientConfig
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Short timeouts, no request logging (for tests)
    pub fn quiet() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            operation_timeout: Duration::from_secs(10),
            request_logging: false,
            ..Self::default()
        }
    }
}

/// Builder for ClientConfig
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.config.operation_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Enable/disable request logging
    pub fn request_logging(mut self, enabled: bool) -> Self {
        self.config.request_logging = enabled;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();

        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.operation_timeout, Duration::from_secs(60));
        assert!(config.request_logging);
        assert!(config.user_agent.starts_with("dhis2-import-wizard/"));
    }

    #[test]
    fn test_quiet_config() {
        let config = ClientConfig::quiet();

        assert!(!config.request_logging);
        assert!(config.operation_timeout < ClientConfig::default().operation_timeout);
    }

    #[test]
    fn test_builder_pattern() {
        let config = ClientConfig::builder()
            .request_timeout(Duration::from_secs(3))
            .operation_timeout(Duration::from_secs(9))
            .user_agent("tests")
            .request_logging(false)
            .build();

        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.operation_timeout, Duration::from_secs(9));
        assert_eq!(config.user_agent, "tests");
        assert!(!config.request_logging);
    }
}
