//! Records → DHIS2 payloads
//!
//! Bindings are checked against the program metadata once, then each record
//! becomes one event (event programs) or one tracked entity with a single
//! enrollment (tracker programs).

use chrono::Utc;
use log::debug;

use crate::api::models::{
    AttributeValue, DataValue, EnrollmentPayload, EventPayload, ImportPayload, ProgramKind,
    ProgramSchema, ProgramStage, TrackedEntityPayload,
};
use crate::error::ImportError;
use crate::mapping::{MappedField, Mapping};
use crate::parser::Record;

/// Payloads ready to submit, plus what was left out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedImport {
    pub kind: ProgramKind,
    pub total: usize,
    pub batches: Vec<ImportPayload>,
    pub skipped: usize,
    pub issues: Vec<String>,
}

impl PreparedImport {
    pub fn entity_count(&self) -> usize {
        self.batches.iter().map(ImportPayload::len).sum()
    }
}

pub fn prepare(
    mapping: &Mapping,
    schema: &ProgramSchema,
    records: &[Record],
    batch_size: usize,
) -> Result<PreparedImport, ImportError> {
    check_bindings(mapping, schema)?;

    let org_unit_column = mapping
        .column_for(&MappedField::OrgUnit)
        .ok_or_else(|| ImportError::Validation("mapping has no organisation unit column".to_string()))?;
    let today = Utc::now().format("%Y-%m-%d").to_string();

    let mut skipped = 0;
    let mut issues = Vec::new();
    let mut accepted = Vec::new();

    for (idx, record) in records.iter().enumerate() {
        match value(record, org_unit_column) {
            Some(org_unit) => accepted.push((org_unit.to_string(), record)),
            None => {
                skipped += 1;
                issues.push(format!("row {}: no organisation unit in column '{}'", idx + 1, org_unit_column));
            }
        }
    }

    let batch_size = batch_size.max(1);
    let batches = match schema.kind {
        ProgramKind::Event => {
            let stage = stage_for(mapping, schema)?;
            let events: Vec<EventPayload> = accepted
                .iter()
                .map(|(org_unit, record)| build_event(mapping, stage, org_unit, record, &today))
                .collect();
            chunk(events, batch_size, ImportPayload::Events)
        }
        ProgramKind::Tracker => {
            let entity_type = schema
                .tracked_entity_type
                .clone()
                .or_else(|| mapping.program.tracked_entity_type.clone())
                .ok_or_else(|| {
                    ImportError::Validation(format!("program {} has no tracked entity type", schema.id))
                })?;
            let stage = if has_data_elements(mapping) {
                Some(stage_for(mapping, schema)?)
            } else {
                None
            };
            let entities: Vec<TrackedEntityPayload> = accepted
                .iter()
                .map(|(org_unit, record)| {
                    build_tracked_entity(mapping, &entity_type, stage, org_unit, record, &today)
                })
                .collect();
            chunk(entities, batch_size, ImportPayload::TrackedEntities)
        }
    };

    debug!(
        "Prepared {} batch(es) for {} record(s), {} skipped",
        batches.len(),
        records.len(),
        skipped
    );

    Ok(PreparedImport {
        kind: schema.kind,
        total: records.len(),
        batches,
        skipped,
        issues,
    })
}

fn check_bindings(mapping: &Mapping, schema: &ProgramSchema) -> Result<(), ImportError> {
    if mapping.program.id != schema.id {
        return Err(ImportError::Validation(format!(
            "mapping targets program {} but metadata is for {}",
            mapping.program.id, schema.id
        )));
    }
    if mapping.program.kind != schema.kind {
        return Err(ImportError::Validation(format!(
            "mapping was made for an {:?} program but {} is now {:?}",
            mapping.program.kind, schema.name, schema.kind
        )));
    }

    // Events carry data values for one stage only
    let stage = if has_data_elements(mapping) {
        Some(stage_for(mapping, schema)?)
    } else {
        None
    };

    for binding in &mapping.bindings {
        match &binding.field {
            MappedField::DataElement(id) if !schema.has_data_element(id) => {
                return Err(ImportError::Validation(format!(
                    "column '{}' targets data element {} which is not in program {}",
                    binding.column, id, schema.name
                )));
            }
            MappedField::DataElement(id) => {
                if let Some(stage) = stage.filter(|stage| !stage.has_data_element(id)) {
                    return Err(ImportError::Validation(format!(
                        "column '{}' targets data element {} which is not in stage {}",
                        binding.column, id, stage.name
                    )));
                }
            }
            MappedField::Attribute(id) if !schema.has_attribute(id) => {
                return Err(ImportError::Validation(format!(
                    "column '{}' targets attribute {} which is not in program {}",
                    binding.column, id, schema.name
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

fn stage_for<'a>(mapping: &Mapping, schema: &'a ProgramSchema) -> Result<&'a ProgramStage, ImportError> {
    let preferred = mapping.program.program_stage.as_deref();
    schema.event_stage(preferred).ok_or_else(|| match preferred {
        Some(id) => ImportError::Validation(format!("program stage {} does not exist", id)),
        None => ImportError::Validation(format!("program {} has no stages", schema.name)),
    })
}

fn has_data_elements(mapping: &Mapping) -> bool {
    mapping
        .bindings
        .iter()
        .any(|b| matches!(b.field, MappedField::DataElement(_)))
}

fn value<'r>(record: &'r Record, column: &str) -> Option<&'r str> {
    record
        .get(column)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn data_values(mapping: &Mapping, stage: &ProgramStage, record: &Record) -> Vec<DataValue> {
    mapping
        .bindings
        .iter()
        .filter_map(|binding| match &binding.field {
            MappedField::DataElement(id) if stage.has_data_element(id) => {
                value(record, &binding.column).map(|v| DataValue {
                    data_element: id.clone(),
                    value: v.to_string(),
                })
            }
            _ => None,
        })
        .collect()
}

fn build_event(
    mapping: &Mapping,
    stage: &ProgramStage,
    org_unit: &str,
    record: &Record,
    today: &str,
) -> EventPayload {
    let event_date = mapping
        .column_for(&MappedField::EventDate)
        .and_then(|column| value(record, column))
        .unwrap_or(today);

    EventPayload {
        program: mapping.program.id.clone(),
        program_stage: stage.id.clone(),
        org_unit: org_unit.to_string(),
        event_date: event_date.to_string(),
        status: "COMPLETED".to_string(),
        data_values: data_values(mapping, stage, record),
    }
}

fn build_tracked_entity(
    mapping: &Mapping,
    entity_type: &str,
    stage: Option<&ProgramStage>,
    org_unit: &str,
    record: &Record,
    today: &str,
) -> TrackedEntityPayload {
    let attributes = mapping
        .bindings
        .iter()
        .filter_map(|binding| match &binding.field {
            MappedField::Attribute(id) => value(record, &binding.column).map(|v| AttributeValue {
                attribute: id.clone(),
                value: v.to_string(),
            }),
            _ => None,
        })
        .collect();

    let enrollment_date = mapping
        .column_for(&MappedField::EnrollmentDate)
        .and_then(|column| value(record, column))
        .unwrap_or(today);

    let events = stage
        .map(|stage| build_event(mapping, stage, org_unit, record, enrollment_date))
        .filter(|event| !event.data_values.is_empty())
        .into_iter()
        .collect();

    TrackedEntityPayload {
        tracked_entity_type: entity_type.to_string(),
        org_unit: org_unit.to_string(),
        attributes,
        enrollments: vec![EnrollmentPayload {
            program: mapping.program.id.clone(),
            org_unit: org_unit.to_string(),
            enrollment_date: enrollment_date.to_string(),
            incident_date: enrollment_date.to_string(),
            events,
        }],
    }
}

/// Split into batches; nothing to send still yields one empty batch
fn chunk<T: Clone>(items: Vec<T>, size: usize, wrap: fn(Vec<T>) -> ImportPayload) -> Vec<ImportPayload> {
    if items.is_empty() {
        return vec![wrap(Vec::new())];
    }
    items.chunks(size).map(|c| wrap(c.to_vec())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::FieldDef;
    use crate::mapping::fixtures::event_mapping;
    use crate::mapping::{FieldBinding, ProgramRef};

    fn event_schema() -> ProgramSchema {
        ProgramSchema {
            id: "eBAyeGv0exc".to_string(),
            name: "Inpatient morbidity".to_string(),
            kind: ProgramKind::Event,
            tracked_entity_type: None,
            stages: vec![ProgramStage {
                id: "Zj7UnCAulEk".to_string(),
                name: "Single-Event".to_string(),
                data_elements: vec![FieldDef {
                    id: "qrur9Dvnyt5".to_string(),
                    name: "Age in years".to_string(),
                    value_type: "INTEGER".to_string(),
                }],
            }],
            attributes: vec![],
        }
    }

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_events_in_batches() {
        let records: Vec<Record> = (0..5)
            .map(|i| record(&[("facility", "DiszpKrYNg8"), ("date", "2024-01-02"), ("age", &i.to_string())]))
            .collect();

        let prepared = prepare(&event_mapping("m"), &event_schema(), &records, 2).unwrap();
        assert_eq!(prepared.batches.len(), 3);
        assert_eq!(prepared.entity_count(), 5);
        assert_eq!(prepared.skipped, 0);

        let ImportPayload::Events(events) = &prepared.batches[0] else {
            panic!("expected events");
        };
        assert_eq!(events[0].program_stage, "Zj7UnCAulEk");
        assert_eq!(events[0].event_date, "2024-01-02");
        assert_eq!(events[1].data_values[0].value, "1");
    }

    #[test]
    fn test_rows_without_org_unit_are_skipped() {
        let records = vec![
            record(&[("facility", ""), ("age", "3")]),
            record(&[("facility", "DiszpKrYNg8"), ("age", "")]),
        ];

        let prepared = prepare(&event_mapping("m"), &event_schema(), &records, 50).unwrap();
        assert_eq!(prepared.skipped, 1);
        assert_eq!(prepared.issues.len(), 1);

        let ImportPayload::Events(events) = &prepared.batches[0] else {
            panic!("expected events");
        };
        assert_eq!(events.len(), 1);
        assert!(events[0].data_values.is_empty());
        assert_eq!(events[0].event_date.len(), 10);
    }

    #[test]
    fn test_empty_import_is_one_empty_batch() {
        let prepared = prepare(&event_mapping("m"), &event_schema(), &[], 50).unwrap();
        assert_eq!(prepared.batches, vec![ImportPayload::Events(vec![])]);
        assert_eq!(prepared.total, 0);
    }

    #[test]
    fn test_unknown_data_element_is_rejected() {
        let mut mapping = event_mapping("m");
        mapping
            .bindings
            .push(FieldBinding::new("weight", MappedField::DataElement("vV9UWAZohSf".into())));

        let err = prepare(&mapping, &event_schema(), &[], 50).unwrap_err();
        assert!(matches!(err, ImportError::Validation(_)));
    }

    #[test]
    fn test_data_element_from_another_stage_is_rejected() {
        let mut schema = event_schema();
        schema.stages.push(ProgramStage {
            id: "pSllsjpfLH2".to_string(),
            name: "Follow-up".to_string(),
            data_elements: vec![FieldDef {
                id: "vV9UWAZohSf".to_string(),
                name: "Weight in kg".to_string(),
                value_type: "NUMBER".to_string(),
            }],
        });
        let mut mapping = event_mapping("m");
        mapping
            .bindings
            .push(FieldBinding::new("weight", MappedField::DataElement("vV9UWAZohSf".into())));
        let records = vec![record(&[("facility", "DiszpKrYNg8"), ("age", "3"), ("weight", "12")])];

        let err = prepare(&mapping, &schema, &records, 50).unwrap_err();
        assert!(matches!(&err, ImportError::Validation(msg) if msg.contains("Single-Event")));

        // Pointing the mapping at the stage that owns the element makes the age binding the odd one out
        mapping.program.program_stage = Some("pSllsjpfLH2".to_string());
        assert!(matches!(prepare(&mapping, &schema, &records, 50), Err(ImportError::Validation(_))));
    }

    #[test]
    fn test_tracked_entities_with_enrollment() {
        let mut schema = event_schema();
        schema.id = "IpHINAT79UW".to_string();
        schema.kind = ProgramKind::Tracker;
        schema.tracked_entity_type = Some("nEenWmSyUEp".to_string());
        schema.attributes = vec![FieldDef {
            id: "w75KJ2mc4zz".to_string(),
            name: "First name".to_string(),
            value_type: "TEXT".to_string(),
        }];

        let mapping = Mapping::new(
            "Child",
            "",
            ProgramRef {
                id: "IpHINAT79UW".to_string(),
                name: "Child Programme".to_string(),
                kind: ProgramKind::Tracker,
                program_stage: None,
                tracked_entity_type: None,
            },
            vec![
                FieldBinding::new("facility", MappedField::OrgUnit),
                FieldBinding::new("enrolled", MappedField::EnrollmentDate),
                FieldBinding::new("first", MappedField::Attribute("w75KJ2mc4zz".into())),
                FieldBinding::new("age", MappedField::DataElement("qrur9Dvnyt5".into())),
            ],
        );
        let records = vec![record(&[
            ("facility", "DiszpKrYNg8"),
            ("enrolled", "2024-03-01"),
            ("first", "Ama"),
            ("age", "2"),
        ])];

        let prepared = prepare(&mapping, &schema, &records, 50).unwrap();
        assert_eq!(prepared.kind, ProgramKind::Tracker);

        let ImportPayload::TrackedEntities(entities) = &prepared.batches[0] else {
            panic!("expected tracked entities");
        };
        let entity = &entities[0];
        assert_eq!(entity.tracked_entity_type, "nEenWmSyUEp");
        assert_eq!(entity.attributes[0].value, "Ama");
        assert_eq!(entity.enrollments[0].enrollment_date, "2024-03-01");
        assert_eq!(entity.enrollments[0].events[0].event_date, "2024-03-01");
    }
}
