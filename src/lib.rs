//! Import spreadsheet and REST API data into DHIS2 through saved mappings.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod import;
pub mod mapping;
pub mod parser;
pub mod session;
pub mod tui;
pub mod ui;
pub mod wizard;

pub use error::ImportError;
