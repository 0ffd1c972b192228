use grid_core::test_fixtures::{emission_record, sample_document};
use grid_core::StateDocument;
use grid_store::{StateStore, StoreError};
use tempfile::TempDir;

fn temp_store() -> (TempDir, StateStore) {
    let dir = TempDir::new().unwrap();
    let store = StateStore::new(dir.path().join("state.json"));
    (dir, store)
}

#[test]
fn load_of_missing_file_is_an_error() {
    let (_dir, store) = temp_store();
    let err = store.load().unwrap_err();
    assert!(matches!(err, StoreError::Missing { .. }));
    assert!(err.to_string().contains("state.json"));
}

#[test]
fn load_or_default_starts_empty() {
    let (_dir, store) = temp_store();
    assert!(store.load_or_default().unwrap().is_empty());
}

#[test]
fn malformed_file_is_an_error_even_for_writers() {
    let (_dir, store) = temp_store();
    std::fs::write(store.path(), "{ not json").unwrap();
    assert!(matches!(store.load(), Err(StoreError::Parse { .. })));
    assert!(matches!(
        store.load_or_default(),
        Err(StoreError::Parse { .. })
    ));
}

#[test]
fn save_then_load_returns_same_document() {
    let (_dir, store) = temp_store();
    let document = sample_document();
    store.save(&document).unwrap();
    assert_eq!(store.load().unwrap(), document);
}

#[test]
fn update_creates_file_and_persists_mutation() {
    let (_dir, store) = temp_store();
    let count = store
        .update(|doc| {
            doc.merge_record("2025", "Kolar", emission_record(1.0, 2.0, 3.0));
            doc.year("2025").map_or(0, grid_core::YearTable::len)
        })
        .unwrap();
    assert_eq!(count, 1);
    let reloaded = store.load().unwrap();
    assert!(reloaded.district("2025", "Kolar").unwrap().has_emissions());
}

#[test]
fn update_keeps_unrelated_records() {
    let (_dir, store) = temp_store();
    store.save(&sample_document()).unwrap();
    store
        .update(|doc| doc.merge_record("2025", "Hosakote", emission_record(1.0, 1.0, 1.0)))
        .unwrap();
    let reloaded = store.load().unwrap();
    assert_eq!(
        reloaded.district("2025", "Kolar"),
        sample_document().district("2025", "Kolar")
    );
    assert_eq!(
        reloaded.year("2025").unwrap().timestamp(),
        sample_document().year("2025").unwrap().timestamp()
    );
}

#[test]
fn restore_puts_back_exact_bytes() {
    let (_dir, store) = temp_store();
    store.save(&sample_document()).unwrap();
    let before = std::fs::read(store.path()).unwrap();
    let snapshot = store.snapshot().unwrap();
    assert!(snapshot.existed());

    std::fs::write(store.path(), "{\"2025\": {}}").unwrap();
    store.restore(&snapshot).unwrap();
    assert_eq!(std::fs::read(store.path()).unwrap(), before);
}

#[test]
fn restore_of_absent_snapshot_removes_file() {
    let (_dir, store) = temp_store();
    let snapshot = store.snapshot().unwrap();
    assert!(!snapshot.existed());
    store.save(&StateDocument::default()).unwrap();
    store.restore(&snapshot).unwrap();
    assert!(!store.exists());
    store.restore(&snapshot).unwrap();
}

#[test]
fn untouched_file_survives_an_update_byte_for_byte() {
    let (_dir, store) = temp_store();
    let text = r#"{
    "meta": 1,
    "2025": {
        "timestamp": "t",
        "Kolar": {
            "temperature": 27.1,
            "total_emission": 5.0
        }
    }
}"#;
    std::fs::write(store.path(), text).unwrap();
    store.update(|_| ()).unwrap();
    assert_eq!(std::fs::read_to_string(store.path()).unwrap(), text);
}
