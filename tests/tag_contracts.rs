//! Mutation contracts of the file entry tag store

use novuspack_entry::{ErrorKind, FileEntry, Tag, TagValue, TagValueType};
use serde_json::json;

fn tagged() -> FileEntry {
    let mut entry = FileEntry::new(8).with_path("/data.csv");
    entry
        .add_tags(vec![
            Tag::new("author", "Jane"),
            Tag::new("rows", 1200i64),
            Tag::new("public", false),
        ])
        .unwrap();
    entry
}

#[test]
fn test_add_existing_key_fails() {
    let mut entry = tagged();
    let err = entry.add_tag("author", "Bob").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(entry.tag_as::<String>("author").unwrap().value, "Jane");
}

#[test]
fn test_set_missing_key_fails() {
    let mut entry = tagged();
    let err = entry.set_tag("title", "x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(!entry.has_tag("title"));
}

#[test]
fn test_add_many_with_internal_duplicate_leaves_state() {
    let mut entry = tagged();
    let before = entry.optional_data.clone();
    let err = entry
        .add_tags(vec![Tag::new("lang", "en"), Tag::new("lang", "fr")])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(entry.optional_data, before);
    assert!(!entry.has_tag("lang"));
}

#[test]
fn test_set_many_requires_every_key() {
    let mut entry = tagged();
    let err = entry
        .set_tags(vec![Tag::new("rows", 5i64), Tag::new("columns", 3i64)])
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(entry.tag_as::<i64>("rows").unwrap().value, 1200);

    entry
        .set_tags(vec![Tag::new("rows", 5i64), Tag::new("public", true)])
        .unwrap();
    assert!(entry.tag_as::<bool>("public").unwrap().value);
}

#[test]
fn test_remove_missing_fails() {
    let mut entry = tagged();
    assert!(entry.remove_tag("ghost").unwrap_err().is_validation());
    entry.remove_tag("public").unwrap();
    assert_eq!(entry.tags().unwrap().len(), 2);
}

#[test]
fn test_typed_lookup_reports_mismatch() {
    let mut entry = tagged();
    let err = entry.tag_as::<bool>("rows").unwrap_err();
    assert!(err.is_validation());
    assert_eq!(err.message(), "tag value type mismatch");
    assert_eq!(err.context().value, "integer");

    let missing = entry.tag_as::<bool>("nope").unwrap_err();
    assert_eq!(missing.message(), "tag does not exist");
}

#[test]
fn test_typed_value_kinds() {
    let mut entry = FileEntry::new(1);
    entry
        .add_tags(vec![
            Tag::with_type("home", TagValueType::Url, json!("https://example.org")).unwrap(),
            Tag::with_type("keywords", TagValueType::StringList, json!(["a", "b"])).unwrap(),
            Tag::with_type("extra", TagValueType::Json, json!({"n": 1})).unwrap(),
            Tag::new("released", TagValue::Timestamp("2024-01-02T03:04:05Z".into())),
        ])
        .unwrap();

    assert_eq!(entry.tag("home").unwrap().value_type(), TagValueType::Url);
    assert_eq!(entry.tag_as::<Vec<String>>("keywords").unwrap().value, vec!["a", "b"]);
    assert_eq!(entry.tag_as::<serde_json::Value>("extra").unwrap().value, json!({"n": 1}));
    assert!(entry.tag("released").unwrap().value.as_timestamp().is_some());
    assert_eq!(entry.tags_by_type::<String>().unwrap().len(), 2);
}

#[test]
fn test_has_helpers_never_fail() {
    let entry = FileEntry::new(1);
    assert!(!entry.has_tags());
    assert!(!entry.has_tag("x"));
    assert!(tagged().has_tags());
}

#[test]
fn test_invalid_tags_rejected() {
    let mut entry = FileEntry::new(1);
    assert!(entry.add_tag("", "x").unwrap_err().is_validation());
    assert!(entry.add_tag("ratio", f64::INFINITY).unwrap_err().is_validation());
    assert!(!entry.has_tags());
}
