//! Downloadable mapping templates
//!
//! A template is the mapping definition without its id, so importing it
//! creates a new mapping rather than overwriting the original.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::{FieldBinding, Mapping, ProgramRef};
use crate::error::ImportError;

pub const TEMPLATE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub program: ProgramRef,
    #[serde(default)]
    pub bindings: Vec<FieldBinding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateFile {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub mapping: MappingDefinition,
}

impl From<&Mapping> for MappingDefinition {
    fn from(mapping: &Mapping) -> Self {
        Self {
            name: mapping.name.clone(),
            description: mapping.description.clone(),
            program: mapping.program.clone(),
            bindings: mapping.bindings.clone(),
        }
    }
}

pub fn to_json(mapping: &Mapping) -> Result<String, ImportError> {
    let file = TemplateFile {
        version: TEMPLATE_VERSION,
        exported_at: Utc::now(),
        mapping: mapping.into(),
    };
    serde_json::to_string_pretty(&file)
        .map_err(|e| ImportError::Parse(format!("cannot serialize template: {}", e)))
}

/// Parse a template and turn it into a new, validated mapping
pub fn from_json(content: &str) -> Result<Mapping, ImportError> {
    let file: TemplateFile = serde_json::from_str(content)
        .map_err(|e| ImportError::Parse(format!("invalid template: {}", e)))?;

    if file.version > TEMPLATE_VERSION {
        return Err(ImportError::Parse(format!(
            "template version {} is newer than supported version {}",
            file.version, TEMPLATE_VERSION
        )));
    }

    let definition = file.mapping;
    let mapping = Mapping::new(
        definition.name,
        definition.description,
        definition.program,
        definition.bindings,
    );
    mapping.validate()?;
    Ok(mapping)
}

pub fn write_template(mapping: &Mapping, path: &Path) -> Result<(), ImportError> {
    let content = to_json(mapping)?;
    fs::write(path, content).map_err(|e| {
        ImportError::Validation(format!("cannot write template '{}': {}", path.display(), e))
    })
}

pub fn read_template(path: &Path) -> Result<Mapping, ImportError> {
    let content = fs::read_to_string(path).map_err(|e| {
        ImportError::Parse(format!("cannot read template '{}': {}", path.display(), e))
    })?;
    from_json(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::fixtures::event_mapping;

    #[test]
    fn test_export_then_import_is_equivalent() {
        let original = event_mapping("Morbidity");
        let restored = from_json(&to_json(&original).unwrap()).unwrap();

        assert_ne!(restored.id, original.id);
        assert_eq!(restored.name, original.name);
        assert_eq!(restored.description, original.description);
        assert_eq!(restored.program, original.program);
        assert_eq!(restored.bindings, original.bindings);
    }

    #[test]
    fn test_template_has_no_id() {
        let json = to_json(&event_mapping("Morbidity")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["version"], 1);
        assert!(value["mapping"].get("id").is_none());
    }

    #[test]
    fn test_rejects_garbage_and_future_versions() {
        assert!(matches!(from_json("{not json"), Err(ImportError::Parse(_))));

        let json = to_json(&event_mapping("Morbidity")).unwrap().replace("\"version\": 1", "\"version\": 99");
        assert!(matches!(from_json(&json), Err(ImportError::Parse(_))));
    }
}
