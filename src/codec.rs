//! Shared primitives for the entry wire formats
//!
//! All integers are little-endian. Reads distinguish a short read (the
//! input ended early, reported as corruption) from a failing reader
//! (reported as I/O).

use crate::error::{EntryError, FieldContext, Result};
use std::io::{self, Read, Write};

/// Fill `buf` completely from `reader`.
pub fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8], field: &str) -> Result<()> {
    let wanted = buf.len();
    let filled = fill(reader, buf, field)?;
    if filled != wanted {
        return Err(short_read(field, filled, wanted));
    }
    Ok(())
}

/// Read as many bytes as possible into `buf`, stopping at end of input.
///
/// Returns the number of bytes read.
pub(crate) fn fill<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8], field: &str) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(EntryError::io(
                    e,
                    format!("failed to read {}", field),
                    FieldContext::new(field, filled, format!("{} bytes", buf.len())),
                ))
            }
        }
    }
    Ok(filled)
}

pub(crate) fn short_read(field: &str, got: usize, wanted: usize) -> EntryError {
    EntryError::corruption(
        format!("unexpected end of input while reading {}", field),
        FieldContext::new(field, got, format!("{} bytes", wanted)),
    )
}

/// Read exactly `length` bytes.
///
/// A zero length returns an empty buffer without touching the reader.
pub fn read_length_prefixed<R: Read + ?Sized>(
    reader: &mut R,
    length: usize,
    field: &str,
) -> Result<Vec<u8>> {
    if length == 0 {
        return Ok(Vec::new());
    }
    let mut data = vec![0u8; length];
    read_full(reader, &mut data, field)?;
    Ok(data)
}

/// Write `data`, which must be exactly `length` bytes long.
pub fn write_length_prefixed<W: Write + ?Sized>(
    writer: &mut W,
    data: &[u8],
    length: usize,
    field: &str,
) -> Result<()> {
    if data.len() != length {
        return Err(EntryError::validation(
            format!("{} length mismatch", field),
            FieldContext::new(field, data.len(), format!("{} bytes", length)),
        ));
    }
    write_bytes(writer, data, field)
}

/// Write every byte of `data`, reporting a writer that stops accepting
/// bytes as an incomplete write.
pub fn write_bytes<W: Write + ?Sized>(writer: &mut W, data: &[u8], field: &str) -> Result<()> {
    let mut written = 0;
    while written < data.len() {
        match writer.write(&data[written..]) {
            Ok(0) => {
                return Err(EntryError::corruption(
                    format!("incomplete write of {}", field),
                    FieldContext::new(field, written, format!("{} bytes", data.len())),
                ))
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(EntryError::io(
                    e,
                    format!("failed to write {}", field),
                    FieldContext::new(field, written, format!("{} bytes", data.len())),
                ))
            }
        }
    }
    Ok(())
}

/// Check that `data` is non-empty and agrees with its declared length.
pub fn validate_len(data: &[u8], declared: usize, field: &str) -> Result<()> {
    if data.is_empty() {
        return Err(EntryError::validation(
            format!("{} cannot be empty", field),
            FieldContext::new(field, 0, "non-empty data"),
        ));
    }
    if data.len() != declared {
        return Err(EntryError::validation(
            format!("{} length mismatch", field),
            FieldContext::new(field, declared, format!("{} (actual data length)", data.len())),
        ));
    }
    Ok(())
}

/// Discard `count` bytes from `reader`.
///
/// Fails as corruption when the input ends before the target is reached.
pub fn skip<R: Read + ?Sized>(reader: &mut R, count: u64, field: &str) -> Result<()> {
    let skipped = io::copy(&mut Read::take(&mut *reader, count), &mut io::sink()).map_err(|e| {
        EntryError::io(
            e,
            format!("failed to skip to {}", field),
            FieldContext::new(field, count, "skip successful"),
        )
    })?;
    if skipped != count {
        return Err(EntryError::corruption(
            format!("offset {} is beyond the end of input", field),
            FieldContext::new(field, skipped, format!("{} bytes to skip", count)),
        ));
    }
    Ok(())
}

pub fn read_u8<R: Read + ?Sized>(reader: &mut R, field: &str) -> Result<u8> {
    let mut buf = [0u8; 1];
    read_full(reader, &mut buf, field)?;
    Ok(buf[0])
}

pub fn read_u16<R: Read + ?Sized>(reader: &mut R, field: &str) -> Result<u16> {
    let mut buf = [0u8; 2];
    read_full(reader, &mut buf, field)?;
    Ok(u16::from_le_bytes(buf))
}

pub fn read_u32<R: Read + ?Sized>(reader: &mut R, field: &str) -> Result<u32> {
    let mut buf = [0u8; 4];
    read_full(reader, &mut buf, field)?;
    Ok(u32::from_le_bytes(buf))
}

/// Cursor over a fixed-size buffer with little-endian accessors.
///
/// Callers size the buffer for the fields they pull; reads past the end
/// yield zero.
pub(crate) struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        FieldReader { buf, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        if let Some(src) = self.buf.get(self.pos..self.pos + N) {
            out.copy_from_slice(src);
        }
        self.pos += N;
        out
    }

    pub(crate) fn u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    pub(crate) fn u16(&mut self) -> u16 {
        u16::from_le_bytes(self.take())
    }

    pub(crate) fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    pub(crate) fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Cursor;

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
        }
    }

    struct StubbornWriter;

    impl Write for StubbornWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_read_length_prefixed_exact() {
        let mut cursor = Cursor::new(b"hello world".to_vec());
        let data = read_length_prefixed(&mut cursor, 5, "path").unwrap();
        assert_eq!(data, b"hello");
    }

    #[test]
    fn test_read_length_prefixed_zero_length() {
        let mut reader = FailingReader;
        let data = read_length_prefixed(&mut reader, 0, "path").unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_short_read_is_corruption() {
        let mut cursor = Cursor::new(b"abc".to_vec());
        let err = read_length_prefixed(&mut cursor, 10, "path").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corruption);
        assert_eq!(err.context().value, "3");
    }

    #[test]
    fn test_reader_failure_is_io() {
        let err = read_length_prefixed(&mut FailingReader, 4, "hash").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_write_length_mismatch_is_validation() {
        let mut out = Vec::new();
        let err = write_length_prefixed(&mut out, b"abc", 4, "data").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(out.is_empty());
    }

    #[test]
    fn test_incomplete_write_is_reported() {
        let err = write_length_prefixed(&mut StubbornWriter, b"abc", 3, "data").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corruption);
        assert!(err.message().contains("incomplete write"));
    }

    #[test]
    fn test_validate_len() {
        assert!(validate_len(b"abc", 3, "data").is_ok());
        assert!(validate_len(b"", 0, "data").unwrap_err().is_validation());
        let err = validate_len(b"abc", 4, "data").unwrap_err();
        assert!(err.message().contains("length mismatch"));
    }

    #[test]
    fn test_skip_past_end_fails() {
        let mut cursor = Cursor::new(vec![0u8; 4]);
        assert!(skip(&mut cursor, 4, "gap").is_ok());
        let mut cursor = Cursor::new(vec![0u8; 4]);
        let err = skip(&mut cursor, 5, "gap").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corruption);
    }

    #[test]
    fn test_field_reader_little_endian() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0x0102u16.to_le_bytes());
        bytes.extend_from_slice(&0x0a0b0c0du32.to_le_bytes());
        bytes.push(7);
        let mut reader = FieldReader::new(&bytes);
        assert_eq!(reader.u16(), 0x0102);
        assert_eq!(reader.u32(), 0x0a0b0c0d);
        assert_eq!(reader.u8(), 7);
        assert_eq!(reader.u64(), 0);
    }
}
