//! Tag slot corruption handling
//!
//! Broken tag elements are dropped and reported once; a broken tag array
//! removes the slot.

use novuspack_entry::{ErrorKind, FileEntry, OptionalDataEntry, TagValue, TAGS_DATA_TYPE};
use std::io::Cursor;

fn entry_with_slot(json: &str) -> FileEntry {
    let mut entry = FileEntry::new(3).with_path("/notes.txt");
    entry.add_optional_data(OptionalDataEntry::new(0x02, vec![0x01]));
    entry.add_optional_data(OptionalDataEntry::new(TAGS_DATA_TYPE, json.as_bytes().to_vec()));
    entry
}

#[test]
fn test_one_valid_one_invalid_element() {
    let mut entry = entry_with_slot(
        r#"[{"Key":"title","ValueType":0,"Value":"Notes"},{"Key":"size","ValueType":1,"Value":"big"}]"#,
    );
    let read = entry.read_tags();
    assert_eq!(read.tags.len(), 1);
    assert_eq!(read.tags.get("title").unwrap().value, TagValue::from("Notes"));

    let err = read.corruption.expect("corruption reported");
    assert_eq!(err.kind(), ErrorKind::Corruption);
    assert_eq!(err.context().field, "corrupted_tags");
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_malformed_array_removes_slot() {
    let mut entry = entry_with_slot(r#"[{"Key":"title","ValueType":0,"Value":"Notes"}"#);
    let read = entry.read_tags();
    assert!(read.tags.is_empty());
    assert_eq!(read.corruption.unwrap().kind(), ErrorKind::Corruption);

    assert_eq!(entry.optional_data.len(), 1);
    assert_eq!(entry.optional_data[0].data_type, 0x02);
    assert_eq!(entry.header.optional_data_len as usize, entry.optional_data_size());
}

#[test]
fn test_corruption_is_reported_once() {
    let mut entry = entry_with_slot(
        r#"[{"Key":"a","ValueType":3,"Value":true},{"Key":"b","ValueType":200,"Value":1},{"Nope":1}]"#,
    );
    let first = entry.read_tags();
    assert_eq!(first.corruption.unwrap().context().value, "2");

    let second = entry.read_tags();
    assert!(second.is_clean());
    assert_eq!(second.tags.len(), 1);
}

#[test]
fn test_decode_heals_tags() {
    let mut entry = entry_with_slot(
        r#"[{"Key":"keep","ValueType":0,"Value":"x"},{"Key":"drop","ValueType":2,"Value":"NaN"}]"#,
    );
    let bytes = entry.to_metadata_bytes().unwrap();

    let mut healed = FileEntry::from_bytes(&bytes).unwrap();
    assert!(healed.read_tags().is_clean());
    assert_eq!(healed.tags().unwrap().len(), 1);

    let mut raw = FileEntry::decode(&mut Cursor::new(&bytes)).unwrap();
    assert!(!raw.read_tags().is_clean());
}

#[test]
fn test_duplicate_keys_last_wins() {
    let mut entry = entry_with_slot(
        r#"[{"Key":"k","ValueType":0,"Value":"first"},{"Key":"k","ValueType":0,"Value":"second"}]"#,
    );
    let read = entry.read_tags();
    assert!(read.is_clean());
    assert_eq!(read.tags.get("k").unwrap().value, TagValue::from("second"));
}
