//! In-memory fakes shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use dhis2_import_wizard::api::models::{FieldDef, ProgramStage};
use dhis2_import_wizard::api::{
    BasicCredentials, CurrentUser, ImportPayload, ImportReport, ProgramKind, ProgramSchema,
    RemoteClient, Session,
};
use dhis2_import_wizard::error::ImportError;
use dhis2_import_wizard::import::ImportSettings;
use dhis2_import_wizard::mapping::{FieldBinding, MappedField, Mapping, MappingBackend, MappingStore, ProgramRef};
use dhis2_import_wizard::parser::{FileParser, Record, Sheet, Workbook};
use dhis2_import_wizard::session::ApiSource;
use dhis2_import_wizard::wizard::{Command, Msg, Wizard};

pub const PROGRAM: &str = "eBAyeGv0exc";
pub const AGE: &str = "qrur9Dvnyt5";

pub fn event_mapping(name: &str) -> Mapping {
    Mapping::new(
        name,
        format!("{} description", name),
        ProgramRef {
            id: PROGRAM.to_string(),
            name: "Inpatient morbidity".to_string(),
            kind: ProgramKind::Event,
            program_stage: None,
            tracked_entity_type: None,
        },
        vec![
            FieldBinding::new("facility", MappedField::OrgUnit),
            FieldBinding::new("date", MappedField::EventDate),
            FieldBinding::new("age", MappedField::DataElement(AGE.to_string())),
        ],
    )
}

pub fn event_schema() -> ProgramSchema {
    ProgramSchema {
        id: PROGRAM.to_string(),
        name: "Inpatient morbidity".to_string(),
        kind: ProgramKind::Event,
        tracked_entity_type: None,
        stages: vec![ProgramStage {
            id: "Zj7UnCAulEk".to_string(),
            name: "Single-Event".to_string(),
            data_elements: vec![FieldDef {
                id: AGE.to_string(),
                name: "Age in years".to_string(),
                value_type: "INTEGER".to_string(),
            }],
        }],
        attributes: vec![],
    }
}

pub fn records(count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| {
            [
                ("facility".to_string(), "DiszpKrYNg8".to_string()),
                ("date".to_string(), "2024-05-01".to_string()),
                ("age".to_string(), (i % 90).to_string()),
            ]
            .into_iter()
            .collect()
        })
        .collect()
}

pub fn workbook(path: &str, sheets: &[(&str, usize)]) -> Workbook {
    Workbook {
        path: PathBuf::from(path),
        sheets: sheets
            .iter()
            .map(|(name, rows)| Sheet {
                name: name.to_string(),
                headers: vec!["facility".into(), "date".into(), "age".into()],
                rows: (0..*rows)
                    .map(|i| vec!["DiszpKrYNg8".into(), "2024-05-01".into(), i.to_string()])
                    .collect(),
            })
            .collect(),
    }
}

pub fn auth_session() -> Session {
    Session::new(
        "https://dhis2.example.org/api",
        BasicCredentials::new("admin", "district"),
        CurrentUser {
            id: "xE7jOejl9FI".to_string(),
            username: Some("admin".to_string()),
            display_name: Some("John Traore".to_string()),
        },
    )
}

/// Scripted DHIS2 + external API
#[derive(Default)]
pub struct FakeRemote {
    pub pull_results: Mutex<VecDeque<Result<Vec<Record>, ImportError>>>,
    pub submit_results: Mutex<VecDeque<Result<ImportReport, ImportError>>>,
    pub submitted: Mutex<Vec<ImportPayload>>,
    pub pulled_from: Mutex<Vec<ApiSource>>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn queue_pull(&self, result: Result<Vec<Record>, ImportError>) {
        self.pull_results.lock().unwrap().push_back(result);
    }

    pub fn queue_submit(&self, result: Result<ImportReport, ImportError>) {
        self.submit_results.lock().unwrap().push_back(result);
    }

    pub fn submitted_entities(&self) -> usize {
        self.submitted.lock().unwrap().iter().map(ImportPayload::len).sum()
    }
}

#[async_trait]
impl RemoteClient for FakeRemote {
    async fn authenticate(&self, _base_url: &str, credentials: &BasicCredentials) -> Result<Session, ImportError> {
        if credentials.password == "district" {
            Ok(auth_session())
        } else {
            Err(ImportError::from_status(401, ""))
        }
    }

    async fn fetch_metadata(&self, _session: &Session, program_id: &str) -> Result<ProgramSchema, ImportError> {
        if program_id == PROGRAM {
            Ok(event_schema())
        } else {
            Err(ImportError::NotFound(format!("program '{}'", program_id)))
        }
    }

    async fn submit_import(&self, _session: &Session, payload: &ImportPayload) -> Result<ImportReport, ImportError> {
        self.submitted.lock().unwrap().push(payload.clone());
        let scripted = self.submit_results.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(ImportReport {
                imported: payload.len(),
                ..ImportReport::default()
            })
        })
    }

    async fn pull_records(&self, source: &ApiSource) -> Result<Vec<Record>, ImportError> {
        self.pulled_from.lock().unwrap().push(source.clone());
        let scripted = self.pull_results.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// dataStore stand-in
#[derive(Default)]
pub struct FakeBackend {
    pub mappings: Mutex<Vec<Mapping>>,
    pub fail_list: Mutex<bool>,
}

impl FakeBackend {
    pub fn with(mappings: Vec<Mapping>) -> Arc<Self> {
        Arc::new(Self {
            mappings: Mutex::new(mappings),
            fail_list: Mutex::new(false),
        })
    }

    pub fn ids(&self) -> Vec<String> {
        self.mappings.lock().unwrap().iter().map(|m| m.id.clone()).collect()
    }
}

#[async_trait]
impl MappingBackend for FakeBackend {
    async fn list(&self) -> Result<Vec<Mapping>, ImportError> {
        if *self.fail_list.lock().unwrap() {
            return Err(ImportError::Network("connection refused".to_string()));
        }
        Ok(self.mappings.lock().unwrap().clone())
    }

    async fn get(&self, id: &str) -> Result<Option<Mapping>, ImportError> {
        Ok(self.mappings.lock().unwrap().iter().find(|m| m.id == id).cloned())
    }

    async fn save(&self, mapping: &Mapping) -> Result<(), ImportError> {
        let mut mappings = self.mappings.lock().unwrap();
        match mappings.iter_mut().find(|m| m.id == mapping.id) {
            Some(existing) => *existing = mapping.clone(),
            None => mappings.push(mapping.clone()),
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, ImportError> {
        let mut mappings = self.mappings.lock().unwrap();
        let before = mappings.len();
        mappings.retain(|m| m.id != id);
        Ok(mappings.len() != before)
    }
}

/// Parser returning prepared workbooks by file name
#[derive(Default)]
pub struct FakeParser {
    pub workbooks: Mutex<HashMap<PathBuf, Workbook>>,
}

impl FakeParser {
    pub fn with(workbooks: Vec<Workbook>) -> Arc<Self> {
        Arc::new(Self {
            workbooks: Mutex::new(workbooks.into_iter().map(|w| (w.path.clone(), w)).collect()),
        })
    }
}

#[async_trait]
impl FileParser for FakeParser {
    async fn parse(&self, path: &Path) -> Result<Workbook, ImportError> {
        self.workbooks
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| ImportError::Parse(format!("cannot open '{}'", path.display())))
    }
}

pub struct Harness {
    pub wizard: Wizard,
    pub remote: Arc<FakeRemote>,
    pub backend: Arc<FakeBackend>,
}

pub fn harness(mappings: Vec<Mapping>, workbooks: Vec<Workbook>) -> Harness {
    let remote = FakeRemote::new();
    let backend = FakeBackend::with(mappings);
    let store = MappingStore::new(backend.clone());
    let settings = ImportSettings {
        batch_size: 10,
        ..ImportSettings::default()
    };
    let wizard = Wizard::new(remote.clone(), FakeParser::with(workbooks), store, auth_session(), settings);

    Harness { wizard, remote, backend }
}

/// Apply a message and every message its effects produce
pub async fn drive(wizard: &mut Wizard, msg: Msg) {
    let mut queue = VecDeque::from([msg]);
    while let Some(msg) = queue.pop_front() {
        let command = wizard.update(msg);
        queue.extend(command.resolve().await);
    }
}

/// Run a command produced earlier and feed its messages back
pub async fn finish(wizard: &mut Wizard, command: Command<Msg>) {
    for msg in command.resolve().await {
        drive(wizard, msg).await;
    }
}
