mod common;

use common::{FakeBackend, event_mapping};
use dhis2_import_wizard::error::ImportError;
use dhis2_import_wizard::mapping::{MappedField, MappingStore};

#[tokio::test]
async fn test_refresh_notifies_subscribers() {
    let backend = FakeBackend::with(vec![event_mapping("A"), event_mapping("B")]);
    let store = MappingStore::new(backend);
    let mut rx = store.subscribe();

    store.refresh().await.unwrap();

    assert!(rx.has_changed().unwrap());
    let names: Vec<String> = rx.borrow_and_update().iter().map(|m| m.name.clone()).collect();
    assert_eq!(names, vec!["A".to_string(), "B".to_string()]);
}

#[tokio::test]
async fn test_delete_missing_mapping_succeeds() {
    let backend = FakeBackend::with(vec![event_mapping("A")]);
    let store = MappingStore::new(backend.clone());
    store.refresh().await.unwrap();

    store.delete("does-not-exist").await.unwrap();
    assert_eq!(store.len(), 1);

    let id = store.mappings()[0].id.clone();
    store.delete(&id).await.unwrap();
    store.delete(&id).await.unwrap();
    assert!(store.is_empty());
    assert!(backend.ids().is_empty());
}

#[tokio::test]
async fn test_select_vanished_mapping_drops_local_copy() {
    let backend = FakeBackend::with(vec![event_mapping("A")]);
    let store = MappingStore::new(backend.clone());
    store.refresh().await.unwrap();
    let id = store.mappings()[0].id.clone();

    backend.mappings.lock().unwrap().clear();

    let err = store.select(&id).await.unwrap_err();
    assert!(matches!(err, ImportError::NotFound(_)));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_failed_refresh_keeps_list() {
    let backend = FakeBackend::with(vec![event_mapping("A")]);
    let store = MappingStore::new(backend.clone());
    store.refresh().await.unwrap();

    *backend.fail_list.lock().unwrap() = true;
    assert!(matches!(store.refresh().await, Err(ImportError::Network(_))));
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_program_filter() {
    let mut other = event_mapping("Other");
    other.program.id = "IpHINAT79UW".to_string();
    let backend = FakeBackend::with(vec![event_mapping("A"), other]);

    let store = MappingStore::new(backend).with_program_filter(Some("IpHINAT79UW".to_string()));
    let listed = store.refresh().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Other");
}

#[tokio::test]
async fn test_template_roundtrip_through_file() {
    let backend = FakeBackend::with(vec![event_mapping("Morbidity")]);
    let store = MappingStore::new(backend.clone());
    store.refresh().await.unwrap();
    let original = store.mappings()[0].clone();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("morbidity.json");
    store.export_template(&original.id, &path).await.unwrap();

    let imported = store.import_template(&path).await.unwrap();
    assert_ne!(imported.id, original.id);
    assert_eq!(imported.name, original.name);
    assert_eq!(imported.description, original.description);
    assert_eq!(imported.program, original.program);
    assert_eq!(imported.bindings, original.bindings);
    assert_eq!(store.len(), 2);
    assert_eq!(backend.ids().len(), 2);
}

#[tokio::test]
async fn test_invalid_template_is_rejected() {
    let store = MappingStore::new(FakeBackend::with(vec![]));
    let mut mapping = event_mapping("No org unit");
    mapping.bindings.retain(|b| b.field != MappedField::OrgUnit);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, dhis2_import_wizard::mapping::template::to_json(&mapping).unwrap()).unwrap();

    assert!(matches!(store.import_template(&path).await, Err(ImportError::Validation(_))));
    assert!(store.is_empty());

    let missing = dir.path().join("missing.json");
    assert!(matches!(store.import_template(&missing).await, Err(ImportError::Parse(_))));
}
