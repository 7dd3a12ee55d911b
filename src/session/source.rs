use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Which dialog/mode a source belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    File,
    Api,
}

/// Uploaded spreadsheet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSource {
    pub path: Option<PathBuf>,
    pub sheet_names: Vec<String>,
    pub selected_sheet: Option<String>,
}

/// Optional Basic-auth credentials for the external API.
///
/// Lives only inside the active [`ApiSource`]; the contents are overwritten
/// when dropped.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    /// Basic auth pair; a username without password sends an empty one
    pub fn basic_auth(&self) -> Option<(&str, Option<&str>)> {
        let username = self.username.as_deref().filter(|u| !u.is_empty())?;
        Some((username, self.password.as_deref().filter(|p| !p.is_empty())))
    }

    fn wipe(&mut self) {
        for secret in [self.username.as_mut(), self.password.as_mut()].into_iter().flatten() {
            let len = secret.len();
            secret.replace_range(.., &"\0".repeat(len));
            secret.clear();
        }
        self.username = None;
        self.password = None;
    }
}

impl Drop for Credentials {
    fn drop(&mut self) {
        self.wipe();
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// External REST API to pull records from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiSource {
    pub url: String,
    pub credentials: Credentials,
    pub parameters: BTreeMap<String, String>,
}

impl ApiSource {
    pub fn has_url(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

/// The data source of the open dialog; exactly one is active
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSource {
    File(FileSource),
    Api(ApiSource),
}

impl ImportSource {
    pub fn empty(kind: SourceKind) -> Self {
        match kind {
            SourceKind::File => ImportSource::File(FileSource::default()),
            SourceKind::Api => ImportSource::Api(ApiSource::default()),
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            ImportSource::File(_) => SourceKind::File,
            ImportSource::Api(_) => SourceKind::Api,
        }
    }
}
