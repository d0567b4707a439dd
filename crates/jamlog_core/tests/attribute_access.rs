use jamlog_core::{
    AttributeKind, AttributeValue, PersistenceController, StoreConfig, StoreError, UpdateOutcome,
};
use uuid::Uuid;

fn memory_store() -> PersistenceController {
    PersistenceController::open(StoreConfig::in_memory()).unwrap()
}

fn create_post(store: &mut PersistenceController, body: &str) -> Uuid {
    let id = Uuid::new_v4();
    store
        .create_record("Post", id, &[("body", AttributeValue::Text(body.to_string()))])
        .unwrap();
    id
}

#[test]
fn update_then_fetch_reads_new_value_and_unset_attribute_is_absent() {
    let mut store = memory_store();
    let id = create_post(&mut store, "draft");

    store.update_attribute("Post", "body", "final", id);

    let body: Option<String> = store.fetch_attribute("Post", "body", id);
    assert_eq!(body.as_deref(), Some("final"));
    let image_url: Option<String> = store.fetch_attribute("Post", "imageURL", id);
    assert_eq!(image_url, None);
    assert_eq!(
        store
            .try_fetch_attribute::<String>("Post", "imageURL", id)
            .unwrap(),
        None
    );
}

#[test]
fn fetch_returns_created_value_with_its_type() {
    let mut store = memory_store();
    let id = Uuid::new_v4();
    store
        .create_record(
            "Post",
            id,
            &[
                ("body", AttributeValue::Text("hello".to_string())),
                ("isFavorite", AttributeValue::Bool(true)),
            ],
        )
        .unwrap();

    assert_eq!(
        store.fetch_attribute::<String>("Post", "body", id).as_deref(),
        Some("hello")
    );
    assert_eq!(store.fetch_attribute::<bool>("Post", "isFavorite", id), Some(true));
    assert_eq!(store.fetch_attribute::<Uuid>("Post", "id", id), Some(id));
    assert!(store.fetch_attribute::<i64>("Post", "createdAt", id).unwrap() > 0);
}

#[test]
fn fetch_on_missing_record_returns_none() {
    let store = memory_store();
    let missing = Uuid::new_v4();

    assert_eq!(store.fetch_attribute::<String>("Post", "body", missing), None);
    assert_eq!(
        store
            .try_fetch_attribute::<String>("Post", "body", missing)
            .unwrap(),
        None
    );
}

#[test]
fn update_on_missing_record_is_a_silent_no_op() {
    let mut store = memory_store();
    let missing = Uuid::new_v4();

    store.update_attribute("Post", "body", "ghost", missing);
    assert!(!store.record_exists("Post", missing).unwrap());

    let outcome = store
        .try_update_attribute("Post", "body", "ghost", missing)
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::NotFound);
    assert!(store.pending_changes(None).unwrap().is_empty());
}

#[test]
fn fetch_with_wrong_type_is_absent_but_explicit_call_reports_mismatch() {
    let mut store = memory_store();
    let id = create_post(&mut store, "draft");

    assert_eq!(store.fetch_attribute::<i64>("Post", "body", id), None);
    let err = store
        .try_fetch_attribute::<i64>("Post", "body", id)
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::TypeMismatch {
            found: AttributeKind::Text,
            ..
        }
    ));
}

#[test]
fn update_with_wrong_kind_is_rejected_and_leaves_value_alone() {
    let mut store = memory_store();
    let id = create_post(&mut store, "draft");

    let err = store
        .try_update_attribute("Post", "body", 42_i64, id)
        .unwrap_err();
    assert!(matches!(err, StoreError::TypeMismatch { .. }));

    store.update_attribute("Post", "body", 42_i64, id);
    assert_eq!(
        store.fetch_attribute::<String>("Post", "body", id).as_deref(),
        Some("draft")
    );
}

#[test]
fn unknown_names_are_reported_by_explicit_calls() {
    let mut store = memory_store();
    let id = create_post(&mut store, "draft");

    assert!(matches!(
        store.try_fetch_attribute::<String>("Song", "title", id),
        Err(StoreError::UnknownEntity(name)) if name == "Song"
    ));
    assert!(matches!(
        store.try_update_attribute("Post", "caption", "x", id),
        Err(StoreError::UnknownAttribute { attribute, .. }) if attribute == "caption"
    ));
    assert!(matches!(
        store.try_fetch_attribute::<String>("", "", id),
        Err(StoreError::UnknownEntity(_))
    ));
    assert_eq!(store.fetch_attribute::<String>("Post", "caption", id), None);
}

#[test]
fn read_only_attributes_cannot_be_written() {
    let mut store = memory_store();
    let id = create_post(&mut store, "draft");

    for attribute in ["id", "createdAt", "updatedAt"] {
        let value = if attribute == "id" {
            AttributeValue::Uuid(Uuid::new_v4())
        } else {
            AttributeValue::Integer(1)
        };
        let err = store
            .try_update_attribute("Post", attribute, value, id)
            .unwrap_err();
        assert!(matches!(err, StoreError::ReadOnlyAttribute { .. }));
    }
    assert_eq!(store.fetch_attribute::<Uuid>("Post", "id", id), Some(id));
}

#[test]
fn update_refreshes_updated_at() {
    let mut store = memory_store();
    let id = create_post(&mut store, "draft");

    store
        .try_update_attribute("Post", "isFavorite", true, id)
        .unwrap();

    let created: i64 = store.fetch_attribute("Post", "createdAt", id).unwrap();
    let updated: i64 = store.fetch_attribute("Post", "updatedAt", id).unwrap();
    assert!(updated >= created);
}

#[test]
fn create_record_rejects_duplicate_id() {
    let mut store = memory_store();
    let id = create_post(&mut store, "draft");

    let err = store
        .create_record("Post", id, &[("body", AttributeValue::Text("again".into()))])
        .unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists { id: existing, .. } if existing == id));
    assert_eq!(
        store.fetch_attribute::<String>("Post", "body", id).as_deref(),
        Some("draft")
    );
}

#[test]
fn in_memory_stores_do_not_share_state() {
    let mut first = memory_store();
    let id = create_post(&mut first, "only here");

    let second = memory_store();
    assert!(!second.record_exists("Post", id).unwrap());
    assert_eq!(second.fetch_attribute::<String>("Post", "body", id), None);
}

#[test]
fn durable_store_keeps_writes_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jamlog.sqlite3");
    let id = {
        let mut store = PersistenceController::open(StoreConfig::file(&path)).unwrap();
        let id = create_post(&mut store, "draft");
        store.update_attribute("Post", "imageURL", "file:///cover.png", id);
        id
    };

    let reopened = PersistenceController::open(StoreConfig::file(&path)).unwrap();
    assert_eq!(
        reopened
            .fetch_attribute::<String>("Post", "imageURL", id)
            .as_deref(),
        Some("file:///cover.png")
    );
}

#[test]
fn create_record_rejects_attribute_given_twice() {
    let mut store = memory_store();
    let id = Uuid::new_v4();

    let err = store
        .create_record(
            "Post",
            id,
            &[
                ("body", AttributeValue::Text("a".into())),
                ("body", AttributeValue::Text("b".into())),
            ],
        )
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::DuplicateAttribute { ref attribute, .. } if attribute == "body"
    ));
    assert!(!store.record_exists("Post", id).unwrap());
    assert!(store.pending_changes(None).unwrap().is_empty());
}

#[test]
fn timestamps_have_millisecond_precision() {
    let mut store = memory_store();
    let before_ms = epoch_ms();
    let id = create_post(&mut store, "draft");
    let after_ms = epoch_ms();

    let created: i64 = store.fetch_attribute("Post", "createdAt", id).unwrap();
    assert!(
        created >= before_ms - 1 && created <= after_ms + 1,
        "createdAt {created} outside [{before_ms}, {after_ms}]"
    );
}

fn epoch_ms() -> i64 {
    let elapsed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap();
    i64::try_from(elapsed.as_millis()).unwrap()
}
