#![no_main]
use libfuzzer_sys::fuzz_target;
use novuspack_entry::{DecodeOptions, FileEntry};
use std::io::Cursor;

// Arbitrary bytes must decode or fail cleanly; anything that decodes must
// encode again.
fuzz_target!(|data: &[u8]| {
    let strict = data.first().map_or(false, |b| b & 1 == 1);
    let options = DecodeOptions {
        strict_optional_eof: strict,
    };

    let Ok(mut entry) = FileEntry::decode_with(&mut Cursor::new(data), &options) else {
        return;
    };
    let _ = entry.validate();
    let _ = entry.read_tags();
    if let Ok(bytes) = entry.to_metadata_bytes() {
        let again = FileEntry::decode(&mut Cursor::new(&bytes)).expect("re-encoded entry decodes");
        assert_eq!(again.paths.len(), entry.paths.len());
    }
});
