//! DHIS2 wire types: program metadata, import payloads and import reports

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// The two DHIS2 program kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgramKind {
    /// Event program (`WITHOUT_REGISTRATION`)
    Event,
    /// Tracker program (`WITH_REGISTRATION`)
    Tracker,
}

impl ProgramKind {
    pub fn from_program_type(program_type: &str) -> Self {
        match program_type {
            "WITH_REGISTRATION" => ProgramKind::Tracker,
            _ => ProgramKind::Event,
        }
    }

    /// What one imported unit is called in summaries
    pub fn unit_label(&self) -> &'static str {
        match self {
            ProgramKind::Event => "events",
            ProgramKind::Tracker => "tracked entities",
        }
    }
}

/// A data element or tracked entity attribute the program exposes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub id: String,
    pub name: String,
    pub value_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramStage {
    pub id: String,
    pub name: String,
    pub data_elements: Vec<FieldDef>,
}

/// Program metadata needed to validate a mapping and build payloads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSchema {
    pub id: String,
    pub name: String,
    pub kind: ProgramKind,
    pub tracked_entity_type: Option<String>,
    pub stages: Vec<ProgramStage>,
    pub attributes: Vec<FieldDef>,
}

/// Field list requested from `GET /api/programs/{id}`
pub const PROGRAM_FIELDS: &str = "id,name,programType,trackedEntityType[id],\
programStages[id,name,programStageDataElements[dataElement[id,name,valueType]]],\
programTrackedEntityAttributes[trackedEntityAttribute[id,name,valueType]]";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProgram {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    program_type: String,
    #[serde(default)]
    tracked_entity_type: Option<RawRef>,
    #[serde(default)]
    program_stages: Vec<RawStage>,
    #[serde(default)]
    program_tracked_entity_attributes: Vec<RawProgramAttribute>,
}

#[derive(Debug, Deserialize)]
struct RawRef {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStage {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    program_stage_data_elements: Vec<RawStageDataElement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStageDataElement {
    data_element: RawField,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProgramAttribute {
    tracked_entity_attribute: RawField,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawField {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    value_type: String,
}

impl From<RawField> for FieldDef {
    fn from(raw: RawField) -> Self {
        FieldDef {
            id: raw.id,
            name: raw.name,
            value_type: raw.value_type,
        }
    }
}

impl ProgramStage {
    pub fn has_data_element(&self, id: &str) -> bool {
        self.data_elements.iter().any(|de| de.id == id)
    }
}

impl ProgramSchema {
    /// Parse the JSON returned by the programs endpoint
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        let raw: RawProgram = serde_json::from_value(value)?;

        Ok(ProgramSchema {
            id: raw.id,
            name: raw.name,
            kind: ProgramKind::from_program_type(&raw.program_type),
            tracked_entity_type: raw.tracked_entity_type.map(|t| t.id),
            stages: raw
                .program_stages
                .into_iter()
                .map(|stage| ProgramStage {
                    id: stage.id,
                    name: stage.name,
                    data_elements: stage
                        .program_stage_data_elements
                        .into_iter()
                        .map(|psde| psde.data_element.into())
                        .collect(),
                })
                .collect(),
            attributes: raw
                .program_tracked_entity_attributes
                .into_iter()
                .map(|pta| pta.tracked_entity_attribute.into())
                .collect(),
        })
    }

    pub fn has_data_element(&self, id: &str) -> bool {
        self.stages
            .iter()
            .any(|stage| stage.has_data_element(id))
    }

    pub fn has_attribute(&self, id: &str) -> bool {
        self.attributes.iter().any(|attr| attr.id == id)
    }

    /// Stage used for events: the configured one, else the first stage
    pub fn event_stage(&self, preferred: Option<&str>) -> Option<&ProgramStage> {
        match preferred {
            Some(id) => self.stages.iter().find(|stage| stage.id == id),
            None => self.stages.first(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataValue {
    pub data_element: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub program: String,
    pub program_stage: String,
    pub org_unit: String,
    pub event_date: String,
    pub status: String,
    pub data_values: Vec<DataValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeValue {
    pub attribute: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentPayload {
    pub program: String,
    pub org_unit: String,
    pub enrollment_date: String,
    pub incident_date: String,
    pub events: Vec<EventPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedEntityPayload {
    pub tracked_entity_type: String,
    pub org_unit: String,
    pub attributes: Vec<AttributeValue>,
    pub enrollments: Vec<EnrollmentPayload>,
}

/// One batch submitted to the import endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportPayload {
    Events(Vec<EventPayload>),
    TrackedEntities(Vec<TrackedEntityPayload>),
}

impl ImportPayload {
    pub fn endpoint(&self) -> &'static str {
        match self {
            ImportPayload::Events(_) => "events",
            ImportPayload::TrackedEntities(_) => "trackedEntityInstances",
        }
    }

    pub fn body(&self) -> Value {
        match self {
            ImportPayload::Events(events) => json!({ "events": events }),
            ImportPayload::TrackedEntities(entities) => json!({ "trackedEntityInstances": entities }),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ImportPayload::Events(events) => events.len(),
            ImportPayload::TrackedEntities(entities) => entities.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Counts returned by DHIS2 for one import request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub updated: usize,
    pub ignored: usize,
    pub deleted: usize,
    pub conflicts: Vec<String>,
}

impl ImportReport {
    /// Read an import summary; newer servers wrap it in `response`.
    /// Returns None when the body carries no counts.
    pub fn from_json(value: &Value) -> Option<Self> {
        let root = value.get("response").unwrap_or(value);

        let count = |key: &str| root.get(key).and_then(|v| v.as_u64()).map(|v| v as usize);
        if count("imported").is_none() && count("updated").is_none() && count("ignored").is_none() {
            return None;
        }

        let mut conflicts = Vec::new();
        if let Some(summaries) = root.get("importSummaries").and_then(|s| s.as_array()) {
            for summary in summaries {
                if let Some(items) = summary.get("conflicts").and_then(|c| c.as_array()) {
                    for conflict in items {
                        let object = conflict.get("object").and_then(|o| o.as_str()).unwrap_or("");
                        let value = conflict.get("value").and_then(|v| v.as_str()).unwrap_or("");
                        conflicts.push(format!("{}: {}", object, value));
                    }
                }
                let is_error = summary.get("status").and_then(|s| s.as_str()) == Some("ERROR");
                if is_error {
                    if let Some(description) = summary.get("description").and_then(|d| d.as_str()) {
                        conflicts.push(description.to_string());
                    }
                }
            }
        }

        Some(ImportReport {
            imported: count("imported").unwrap_or(0),
            updated: count("updated").unwrap_or(0),
            ignored: count("ignored").unwrap_or(0),
            deleted: count("deleted").unwrap_or(0),
            conflicts,
        })
    }
}

/// Outcome of a whole import, across batches
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub kind: ProgramKind,
    pub total: usize,
    pub imported: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub conflicts: Vec<String>,
}

impl ImportSummary {
    pub fn new(kind: ProgramKind, total: usize) -> Self {
        Self {
            kind,
            total,
            imported: 0,
            updated: 0,
            skipped: 0,
            failed: 0,
            conflicts: Vec::new(),
        }
    }

    pub fn absorb(&mut self, report: &ImportReport) {
        self.imported += report.imported;
        self.updated += report.updated;
        self.failed += report.ignored;
        self.conflicts.extend(report.conflicts.iter().cloned());
    }

    /// A batch the server refused as a whole
    pub fn record_rejected(&mut self, batch_len: usize, reason: &str) {
        self.failed += batch_len;
        self.conflicts.push(reason.to_string());
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.skipped > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_schema_parsing() {
        let value = json!({
            "id": "eBAyeGv0exc",
            "name": "Inpatient morbidity",
            "programType": "WITHOUT_REGISTRATION",
            "programStages": [{
                "id": "Zj7UnCAulEk",
                "name": "Single-Event",
                "programStageDataElements": [
                    { "dataElement": { "id": "qrur9Dvnyt5", "name": "Age in years", "valueType": "INTEGER" } }
                ]
            }]
        });

        let schema = ProgramSchema::from_json(value).unwrap();
        assert_eq!(schema.kind, ProgramKind::Event);
        assert!(schema.has_data_element("qrur9Dvnyt5"));
        assert!(!schema.has_attribute("qrur9Dvnyt5"));
        assert_eq!(schema.event_stage(None).map(|s| s.id.as_str()), Some("Zj7UnCAulEk"));
        assert!(schema.event_stage(Some("missing")).is_none());
    }

    #[test]
    fn test_tracker_program_parsing() {
        let value = json!({
            "id": "IpHINAT79UW",
            "name": "Child Programme",
            "programType": "WITH_REGISTRATION",
            "trackedEntityType": { "id": "nEenWmSyUEp" },
            "programTrackedEntityAttributes": [
                { "trackedEntityAttribute": { "id": "w75KJ2mc4zz", "name": "First name", "valueType": "TEXT" } }
            ]
        });

        let schema = ProgramSchema::from_json(value).unwrap();
        assert_eq!(schema.kind, ProgramKind::Tracker);
        assert_eq!(schema.tracked_entity_type.as_deref(), Some("nEenWmSyUEp"));
        assert!(schema.has_attribute("w75KJ2mc4zz"));
    }

    #[test]
    fn test_import_report_wrapped_and_flat() {
        let wrapped = json!({
            "httpStatus": "Conflict",
            "response": {
                "imported": 3, "updated": 1, "ignored": 2, "deleted": 0,
                "importSummaries": [
                    { "status": "ERROR", "description": "Event date is required",
                      "conflicts": [{ "object": "qrur9Dvnyt5", "value": "value_not_integer" }] }
                ]
            }
        });
        let report = ImportReport::from_json(&wrapped).unwrap();
        assert_eq!(report.imported, 3);
        assert_eq!(report.ignored, 2);
        assert_eq!(report.conflicts, vec![
            "qrur9Dvnyt5: value_not_integer".to_string(),
            "Event date is required".to_string(),
        ]);

        let flat = json!({ "imported": 5, "updated": 0, "ignored": 0 });
        assert_eq!(ImportReport::from_json(&flat).unwrap().imported, 5);

        assert!(ImportReport::from_json(&json!({ "message": "nope" })).is_none());
    }

    #[test]
    fn test_payload_body_shape() {
        let payload = ImportPayload::Events(vec![]);
        assert_eq!(payload.endpoint(), "events");
        assert_eq!(payload.body(), json!({ "events": [] }));
        assert!(payload.is_empty());
    }

    #[test]
    fn test_summary_accumulation() {
        let mut summary = ImportSummary::new(ProgramKind::Event, 10);
        summary.absorb(&ImportReport { imported: 4, updated: 1, ignored: 1, deleted: 0, conflicts: vec!["x".into()] });
        summary.record_rejected(4, "batch rejected");

        assert_eq!(summary.imported, 4);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.failed, 5);
        assert_eq!(summary.conflicts.len(), 2);
        assert!(summary.has_failures());
    }
}
