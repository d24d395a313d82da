#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use novuspack_entry::{FileEntry, OptionalDataEntry, TAGS_DATA_TYPE};

#[derive(Debug, Arbitrary)]
struct Input {
    slot: Vec<u8>,
    key: String,
    value: i64,
}

fuzz_target!(|input: Input| {
    if input.slot.len() > 4096 {
        return;
    }
    let mut entry = FileEntry::new(1).with_path("f");
    entry.add_optional_data(OptionalDataEntry::new(TAGS_DATA_TYPE, input.slot));

    let first = entry.read_tags();
    let second = entry.read_tags();
    // Recovery heals the slot on the first read.
    assert!(second.corruption.is_none());
    assert_eq!(first.tags, second.tags);

    let _ = entry.add_tag(input.key.as_str(), input.value);
    assert!(entry.read_tags().corruption.is_none());
});
