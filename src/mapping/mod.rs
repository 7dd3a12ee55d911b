//! Saved column → program field mappings

pub mod store;
pub mod template;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::api::models::ProgramKind;
use crate::error::ImportError;

pub use store::{MappingBackend, MappingStore};

/// DHIS2 uids: a letter followed by 10 alphanumerics
static UID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]{10}$").expect("valid uid regex"));

pub fn is_valid_uid(value: &str) -> bool {
    UID_PATTERN.is_match(value)
}

/// Program a mapping imports into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub kind: ProgramKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracked_entity_type: Option<String>,
}

/// Target of a column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "camelCase")]
pub enum MappedField {
    OrgUnit,
    EventDate,
    EnrollmentDate,
    DataElement(String),
    Attribute(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldBinding {
    pub column: String,
    pub field: MappedField,
}

impl FieldBinding {
    pub fn new(column: impl Into<String>, field: MappedField) -> Self {
        Self {
            column: column.into(),
            field,
        }
    }
}

/// A saved configuration binding external columns to a program's fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mapping {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub program: ProgramRef,
    #[serde(default)]
    pub bindings: Vec<FieldBinding>,
    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Mapping {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        program: ProgramRef,
        bindings: Vec<FieldBinding>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_mapping_id(),
            name: name.into(),
            description: description.into(),
            program,
            bindings,
            created: now,
            last_updated: now,
        }
    }

    /// Column bound to a field, if any
    pub fn column_for(&self, field: &MappedField) -> Option<&str> {
        self.bindings
            .iter()
            .find(|binding| &binding.field == field)
            .map(|binding| binding.column.as_str())
    }

    /// Structural checks that do not need program metadata
    pub fn validate(&self) -> Result<(), ImportError> {
        if self.name.trim().is_empty() {
            return Err(ImportError::Validation("mapping name is required".to_string()));
        }
        if !is_valid_uid(&self.program.id) {
            return Err(ImportError::Validation(format!(
                "'{}' is not a valid program id",
                self.program.id
            )));
        }
        if self.column_for(&MappedField::OrgUnit).is_none() {
            return Err(ImportError::Validation(
                "mapping has no organisation unit column".to_string(),
            ));
        }

        for binding in &self.bindings {
            if binding.column.trim().is_empty() {
                return Err(ImportError::Validation(format!(
                    "binding for {:?} has an empty column name",
                    binding.field
                )));
            }
            if let MappedField::DataElement(id) | MappedField::Attribute(id) = &binding.field {
                if !is_valid_uid(id) {
                    return Err(ImportError::Validation(format!(
                        "column '{}' targets malformed id '{}'",
                        binding.column, id
                    )));
                }
            }
            if matches!(binding.field, MappedField::Attribute(_) | MappedField::EnrollmentDate)
                && self.program.kind == ProgramKind::Event
            {
                return Err(ImportError::Validation(format!(
                    "column '{}' targets a tracker-only field in an event program",
                    binding.column
                )));
            }
        }

        Ok(())
    }
}

pub fn new_mapping_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn event_mapping(name: &str) -> Mapping {
        Mapping::new(
            name,
            format!("{} description", name),
            ProgramRef {
                id: "eBAyeGv0exc".to_string(),
                name: "Inpatient morbidity".to_string(),
                kind: ProgramKind::Event,
                program_stage: None,
                tracked_entity_type: None,
            },
            vec![
                FieldBinding::new("facility", MappedField::OrgUnit),
                FieldBinding::new("date", MappedField::EventDate),
                FieldBinding::new("age", MappedField::DataElement("qrur9Dvnyt5".to_string())),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::event_mapping;
    use super::*;

    #[test]
    fn test_uid_pattern() {
        assert!(is_valid_uid("eBAyeGv0exc"));
        assert!(!is_valid_uid("1BAyeGv0exc"));
        assert!(!is_valid_uid("short"));
        assert!(!is_valid_uid("eBAyeGv0exc1"));
    }

    #[test]
    fn test_valid_mapping() {
        let mapping = event_mapping("Morbidity");
        assert!(mapping.validate().is_ok());
        assert_eq!(mapping.column_for(&MappedField::OrgUnit), Some("facility"));
        assert_eq!(mapping.id.len(), 32);
    }

    #[test]
    fn test_validation_failures() {
        let mut unnamed = event_mapping(" ");
        unnamed.name = " ".to_string();
        assert!(matches!(unnamed.validate(), Err(ImportError::Validation(_))));

        let mut no_org_unit = event_mapping("x");
        no_org_unit.bindings.retain(|b| b.field != MappedField::OrgUnit);
        assert!(no_org_unit.validate().is_err());

        let mut bad_uid = event_mapping("x");
        bad_uid.bindings.push(FieldBinding::new("weight", MappedField::DataElement("bad".into())));
        assert!(bad_uid.validate().is_err());

        let mut tracker_field = event_mapping("x");
        tracker_field.bindings.push(FieldBinding::new("name", MappedField::Attribute("w75KJ2mc4zz".into())));
        assert!(tracker_field.validate().is_err());
    }

    #[test]
    fn test_serialized_shape() {
        let binding = FieldBinding::new("age", MappedField::DataElement("qrur9Dvnyt5".into()));
        let value = serde_json::to_value(&binding).unwrap();
        assert_eq!(value["field"]["type"], "dataElement");
        assert_eq!(value["field"]["id"], "qrur9Dvnyt5");

        let org_unit = serde_json::to_value(FieldBinding::new("facility", MappedField::OrgUnit)).unwrap();
        assert_eq!(org_unit["field"]["type"], "orgUnit");
    }
}
