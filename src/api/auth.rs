use serde::Deserialize;
use std::fmt;

/// Username/password pair sent as HTTP Basic auth
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl BasicCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// The user returned by `GET /api/me`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// An authenticated connection to a DHIS2 instance
#[derive(Debug, Clone)]
pub struct Session {
    base_url: String,
    credentials: BasicCredentials,
    pub user: CurrentUser,
}

impl Session {
    pub fn new(base_url: &str, credentials: BasicCredentials, user: CurrentUser) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            credentials,
            user,
        }
    }

    /// API root, always without trailing slash (e.g. `https://host/dhis/api`)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &BasicCredentials {
        &self.credentials
    }

    /// Join a path below the API root
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn display_name(&self) -> &str {
        self.user
            .display_name
            .as_deref()
            .or(self.user.username.as_deref())
            .unwrap_or(&self.credentials.username)
    }
}

pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> CurrentUser {
        CurrentUser {
            id: "xE7jOejl9FI".to_string(),
            username: Some("admin".to_string()),
            display_name: None,
        }
    }

    #[test]
    fn test_url_joining() {
        let session = Session::new(
            "http://localhost:8989/dhis/api/",
            BasicCredentials::new("admin", "district"),
            user(),
        );

        assert_eq!(session.base_url(), "http://localhost:8989/dhis/api");
        assert_eq!(session.url("/me"), "http://localhost:8989/dhis/api/me");
        assert_eq!(session.url("dataStore/ns"), "http://localhost:8989/dhis/api/dataStore/ns");
        assert_eq!(session.display_name(), "admin");
    }

    #[test]
    fn test_debug_redacts_password() {
        let debug = format!("{:?}", BasicCredentials::new("admin", "district"));
        assert!(debug.contains("admin"));
        assert!(!debug.contains("district"));
    }
}
