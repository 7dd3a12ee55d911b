//! Wizard controller
//!
//! Elm-style: [`Wizard::update`] applies a [`Msg`] to the session and the
//! mapping store and returns a [`Command`] describing async work. Results of
//! that work come back as further messages. [`Wizard::view`] derives the
//! screen model without side effects.

pub mod command;
pub mod progress;
pub mod resource;
pub mod view;

use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;

use crate::api::auth::Session;
use crate::api::models::ImportSummary;
use crate::api::{RemoteClient, with_timeout};
use crate::error::ImportError;
use crate::import::{ImportEvent, ImportSettings, run_import};
use crate::mapping::{Mapping, MappingStore};
use crate::parser::{FileParser, Record, Workbook};
use crate::session::{ImportSession, SourceKind, Ticket};

pub use command::Command;
pub use progress::{Progress, ProgressView};
pub use resource::Resource;
pub use view::WizardView;

#[derive(Debug, Clone)]
pub enum Msg {
    LoadMappings,
    MappingsLoaded(Result<Vec<Mapping>, ImportError>),
    SelectMapping(String),
    MappingSelected(Result<Mapping, ImportError>),
    DeleteMapping(String),
    MappingDeleted {
        id: String,
        result: Result<(), ImportError>,
    },
    ExportTemplate {
        id: String,
        path: PathBuf,
    },
    TemplateExported(Result<PathBuf, ImportError>),
    ImportTemplate(PathBuf),
    TemplateImported(Result<Mapping, ImportError>),

    OpenDialog(SourceKind),
    SwitchSource(SourceKind),
    CloseDialog,
    Retry,

    FileChosen(PathBuf),
    FileLoaded {
        ticket: Ticket,
        result: Result<Workbook, ImportError>,
    },
    SelectSheet(Option<String>),

    SetUrl(String),
    SetUsername(String),
    SetPassword(String),
    SetParameter {
        key: String,
        value: String,
    },
    RemoveParameter(String),
    Pull,
    Pulled {
        ticket: Ticket,
        result: Result<Vec<Record>, ImportError>,
    },

    Import,
    ImportProgress {
        ticket: Ticket,
        progress: u8,
    },
    ImportFinished {
        ticket: Ticket,
        result: Result<ImportSummary, ImportError>,
    },
    HideProgress,
    ShowProgress,

    DismissNotice,
    Quit,
}

pub struct Wizard {
    client: Arc<dyn RemoteClient>,
    parser: Arc<dyn FileParser>,
    store: MappingStore,
    auth: Session,
    session: ImportSession,
    settings: ImportSettings,
    list: Resource<usize, ImportError>,
    progress_hidden: bool,
    notice: Option<String>,
}

impl Wizard {
    pub fn new(
        client: Arc<dyn RemoteClient>,
        parser: Arc<dyn FileParser>,
        store: MappingStore,
        auth: Session,
        settings: ImportSettings,
    ) -> Self {
        Self {
            client,
            parser,
            store,
            auth,
            session: ImportSession::new(),
            settings,
            list: Resource::NotAsked,
            progress_hidden: false,
            notice: None,
        }
    }

    /// Initial command: load the mapping list
    pub fn init(&mut self) -> Command<Msg> {
        self.update(Msg::LoadMappings)
    }

    pub fn session(&self) -> &ImportSession {
        &self.session
    }

    pub fn store(&self) -> &MappingStore {
        &self.store
    }

    pub fn list_status(&self) -> &Resource<usize, ImportError> {
        &self.list
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn view(&self) -> WizardView {
        let mappings = self.store.mappings();
        WizardView::build(view::ViewInputs {
            user: self.auth.display_name(),
            mappings: &mappings,
            list_loading: self.list.is_loading(),
            list_error: self.list.error().map(|e| e.to_string()),
            session: &self.session,
            progress_hidden: self.progress_hidden,
            notice: self.notice.as_deref(),
        })
    }

    pub fn update(&mut self, msg: Msg) -> Command<Msg> {
        match msg {
            Msg::LoadMappings => {
                self.list = Resource::Loading;
                let store = self.store.clone();
                Command::perform(async move { store.refresh().await }, Msg::MappingsLoaded)
            }
            Msg::MappingsLoaded(result) => {
                if let Err(e) = &result {
                    warn!("Could not load mappings: {}", e);
                }
                self.list = Resource::from_result(result.map(|m| m.len()));
                Command::None
            }
            Msg::SelectMapping(id) => {
                if self.session.is_dialog_open() {
                    self.notify("Close the import dialog before choosing another mapping");
                    return Command::None;
                }
                let store = self.store.clone();
                Command::perform(async move { store.select(&id).await }, Msg::MappingSelected)
            }
            Msg::MappingSelected(result) => {
                match result.and_then(|mapping| self.session.set_mapping(mapping)) {
                    Ok(()) => self.notice = None,
                    Err(e) => self.notify(e),
                }
                Command::None
            }
            Msg::DeleteMapping(id) => {
                let store = self.store.clone();
                Command::perform(
                    async move {
                        let result = store.delete(&id).await;
                        (id, result)
                    },
                    |(id, result)| Msg::MappingDeleted { id, result },
                )
            }
            Msg::MappingDeleted { id, result } => {
                match result {
                    Ok(()) => {
                        self.session.forget_mapping(&id);
                        self.notify(format!("Deleted mapping {}", id));
                    }
                    Err(e) => self.notify(e),
                }
                Command::None
            }
            Msg::ExportTemplate { id, path } => {
                let store = self.store.clone();
                Command::perform(
                    async move { store.export_template(&id, &path).await },
                    Msg::TemplateExported,
                )
            }
            Msg::TemplateExported(result) => {
                match result {
                    Ok(path) => self.notify(format!("Template written to {}", path.display())),
                    Err(e) => self.notify(e),
                }
                Command::None
            }
            Msg::ImportTemplate(path) => {
                let store = self.store.clone();
                Command::perform(
                    async move { store.import_template(&path).await },
                    Msg::TemplateImported,
                )
            }
            Msg::TemplateImported(result) => {
                match result {
                    Ok(mapping) => self.notify(format!("Imported mapping {}", mapping.name)),
                    Err(e) => self.notify(e),
                }
                Command::None
            }

            Msg::OpenDialog(kind) => {
                if let Err(e) = self.session.open(kind) {
                    self.notify(e);
                } else {
                    self.notice = None;
                    self.progress_hidden = false;
                }
                Command::None
            }
            Msg::SwitchSource(kind) => {
                if let Err(e) = self.session.switch_source(kind) {
                    self.notify(e);
                }
                Command::None
            }
            Msg::CloseDialog => match self.session.close() {
                Ok(completed) => {
                    self.progress_hidden = false;
                    if completed {
                        self.update(Msg::LoadMappings)
                    } else {
                        Command::None
                    }
                }
                Err(e) => {
                    self.notify(e);
                    Command::None
                }
            },
            Msg::Retry => {
                if let Err(e) = self.session.retry() {
                    self.notify(e);
                }
                Command::None
            }

            Msg::FileChosen(path) => match self.session.begin_file_load(path.clone()) {
                Ok(ticket) => {
                    let parser = self.parser.clone();
                    Command::perform(
                        async move { parser.parse(&path).await },
                        move |result| Msg::FileLoaded { ticket, result },
                    )
                }
                Err(e) => {
                    self.report_rejected(e);
                    Command::None
                }
            },
            Msg::FileLoaded { ticket, result } => {
                self.session.complete_file_load(ticket, result);
                Command::None
            }
            Msg::SelectSheet(sheet) => {
                if let Err(e) = self.session.select_sheet(sheet) {
                    self.notify(e);
                }
                Command::None
            }

            Msg::SetUrl(url) => self.edit(|s| s.set_url(url)),
            Msg::SetUsername(username) => self.edit(|s| s.set_username(username)),
            Msg::SetPassword(password) => self.edit(|s| s.set_password(password)),
            Msg::SetParameter { key, value } => self.edit(|s| s.set_parameter(key, value)),
            Msg::RemoveParameter(key) => self.edit(|s| s.remove_parameter(&key)),
            Msg::Pull => match self.session.begin_pull() {
                Ok((ticket, source)) => {
                    let client = self.client.clone();
                    let limit = self.settings.operation_timeout;
                    Command::perform(
                        async move { with_timeout("pulling data", limit, client.pull_records(&source)).await },
                        move |result| Msg::Pulled { ticket, result },
                    )
                }
                Err(e) => {
                    self.notify(e);
                    Command::None
                }
            },
            Msg::Pulled { ticket, result } => {
                self.session.complete_pull(ticket, result);
                Command::None
            }

            Msg::Import => match self.session.begin_import() {
                Ok((ticket, job)) => {
                    self.progress_hidden = false;
                    self.notice = None;
                    let events = run_import(self.client.clone(), self.auth.clone(), job, self.settings);
                    Command::stream(events, move |event| match event {
                        ImportEvent::Progress(progress) => Msg::ImportProgress { ticket, progress },
                        ImportEvent::Finished(result) => Msg::ImportFinished { ticket, result },
                    })
                }
                Err(e) => {
                    self.notify(e);
                    Command::None
                }
            },
            Msg::ImportProgress { ticket, progress } => {
                self.session.report_progress(ticket, progress);
                Command::None
            }
            Msg::ImportFinished { ticket, result } => {
                if self.session.complete_import(ticket, result) {
                    self.progress_hidden = false;
                }
                Command::None
            }
            Msg::HideProgress => {
                // The import keeps running; only the modal goes away
                self.progress_hidden = true;
                Command::None
            }
            Msg::ShowProgress => {
                self.progress_hidden = false;
                Command::None
            }

            Msg::DismissNotice => {
                self.notice = None;
                Command::None
            }
            Msg::Quit => {
                if self.session.is_creating() {
                    self.notify("An import is still running");
                    Command::None
                } else {
                    info!("Leaving wizard");
                    Command::Quit
                }
            }
        }
    }

    fn edit(
        &mut self,
        apply: impl FnOnce(&mut ImportSession) -> Result<(), ImportError>,
    ) -> Command<Msg> {
        if let Err(e) = apply(&mut self.session) {
            self.notify(e);
        }
        Command::None
    }

    /// A begin_* refusal: failures already recorded by the session are not repeated
    fn report_rejected(&mut self, error: ImportError) {
        if self.session.last_error() != Some(&error) {
            self.notify(error);
        }
    }

    fn notify(&mut self, message: impl ToString) {
        let message = message.to_string();
        debug!("Notice: {}", message);
        self.notice = Some(message);
    }
}
