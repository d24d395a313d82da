//! Content staging for a file entry
//!
//! Content can live in memory, in a region of a source file, or in a temp
//! file owned by the entry. Temp files are never removed implicitly; call
//! [`FileEntry::cleanup_temp_file`].

use super::FileEntry;
use crate::codec;
use crate::config::StagingConfig;
use crate::error::{EntryError, FieldContext, Result};
use crate::processing::StageStatus;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Cooperative cancellation flag shared between a caller and staging calls
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn check(&self, operation: &str) -> Result<()> {
        if self.is_cancelled() {
            return Err(EntryError::cancelled(operation));
        }
        Ok(())
    }
}

/// Region of an open file holding this entry's content
#[derive(Debug)]
pub struct SourceFile {
    pub file: File,
    pub offset: u64,
    pub size: u64,
}

impl FileEntry {
    /// Replace the in-memory content
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.stage_status = if data.is_empty() {
            StageStatus::Idle
        } else {
            StageStatus::Ready
        };
        self.data = if data.is_empty() { None } else { Some(data) };
    }

    pub fn is_data_loaded(&self) -> bool {
        self.data.is_some()
    }

    /// In-memory content, loading it from the source file first if needed
    pub fn data(&mut self) -> Result<&[u8]> {
        if self.data.is_none() {
            if self.source.is_none() {
                return Err(data_not_available());
            }
            self.load_data(&CancelToken::default())?;
        }
        self.data.as_deref().ok_or_else(data_not_available)
    }

    /// Copy of the in-memory content
    pub fn content_bytes(&self) -> Result<Vec<u8>> {
        self.data.clone().ok_or_else(data_not_available)
    }

    /// Read the source-file region into memory. No-op when already loaded.
    pub fn load_data(&mut self, cancel: &CancelToken) -> Result<()> {
        if self.data.is_some() {
            return Ok(());
        }
        cancel.check("load_data")?;
        let source = self.source.as_mut().ok_or_else(|| {
            EntryError::validation(
                "no source file available for loading data",
                FieldContext::new("source_file", "none", "source file available"),
            )
        })?;

        self.stage_status = StageStatus::Loading;
        let loaded = read_region(source);
        match loaded {
            Ok(data) => {
                self.data = Some(data);
                self.stage_status = StageStatus::Ready;
                Ok(())
            }
            Err(e) => {
                self.stage_status = StageStatus::Failed;
                Err(e)
            }
        }
    }

    /// Drop the in-memory content
    pub fn unload_data(&mut self) {
        self.data = None;
        self.stage_status = StageStatus::Idle;
    }

    pub fn set_source(&mut self, file: File, offset: u64, size: u64) {
        self.source = Some(SourceFile { file, offset, size });
    }

    pub fn source(&self) -> Option<&SourceFile> {
        self.source.as_ref()
    }

    pub fn take_source(&mut self) -> Option<SourceFile> {
        self.source.take()
    }

    pub fn set_temp_path(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.temp_path = if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        };
    }

    pub fn temp_path(&self) -> Option<&Path> {
        self.temp_path.as_deref()
    }

    /// Create an empty temp file owned by this entry and return its path.
    pub fn create_temp_file(&mut self, config: &StagingConfig, cancel: &CancelToken) -> Result<PathBuf> {
        cancel.check("create_temp_file")?;
        let dir = config.temp_dir();
        let path = tempfile::Builder::new()
            .prefix(&config.temp_prefix)
            .tempfile_in(&dir)
            .map_err(|e| {
                EntryError::io(
                    e,
                    "failed to create temporary file",
                    FieldContext::new("temp_dir", dir.display(), "writable directory"),
                )
            })?
            .into_temp_path()
            .keep()
            .map_err(|e| {
                EntryError::io(
                    e.error,
                    "failed to keep temporary file",
                    FieldContext::new("temp_file", "unnamed", "persisted temp file"),
                )
            })?;
        debug!(file_id = self.file_id(), path = %path.display(), "created temp file");
        self.temp_path = Some(path.clone());
        Ok(path)
    }

    /// Copy the source-file region into the temp file, creating it if needed.
    pub fn stream_to_temp_file(&mut self, config: &StagingConfig, cancel: &CancelToken) -> Result<()> {
        cancel.check("stream_to_temp_file")?;
        if self.source.is_none() {
            return Err(EntryError::validation(
                "no source file available for streaming",
                FieldContext::new("source_file", "none", "source file available"),
            ));
        }
        let temp_path = self.ensure_temp_file(config, cancel)?;
        let mut out = open_for_write(&temp_path)?;

        self.stage_status = StageStatus::Streaming;
        let result = match self.source.as_mut() {
            Some(source) => copy_region(source, &mut out, config.copy_buffer_size, &temp_path),
            None => Err(data_not_available()),
        };
        self.stage_status = match result {
            Ok(_) => StageStatus::Ready,
            Err(_) => StageStatus::Failed,
        };
        result.map(|_| ())
    }

    /// Write `data` to the temp file, replacing what it held.
    pub fn write_to_temp_file(&mut self, data: &[u8], config: &StagingConfig, cancel: &CancelToken) -> Result<()> {
        cancel.check("write_to_temp_file")?;
        let temp_path = self.ensure_temp_file(config, cancel)?;
        let mut out = open_for_write(&temp_path)?;

        self.stage_status = StageStatus::Writing;
        let result = out.write_all(data).map_err(|e| {
            EntryError::io(
                e,
                "failed to write data to temporary file",
                FieldContext::new("temp_file", temp_path.display(), "write successful"),
            )
        });
        self.stage_status = if result.is_ok() {
            StageStatus::Ready
        } else {
            StageStatus::Failed
        };
        result
    }

    /// Read up to `size` bytes at `offset` from the temp file.
    ///
    /// Fewer bytes are returned when the file ends first.
    pub fn read_from_temp_file(&self, offset: u64, size: usize, cancel: &CancelToken) -> Result<Vec<u8>> {
        cancel.check("read_from_temp_file")?;
        let path = self.temp_path.as_deref().ok_or_else(|| {
            EntryError::validation(
                "no temporary file available",
                FieldContext::new("temp_path", "none", "temp file path set"),
            )
        })?;
        let mut file = File::open(path).map_err(|e| {
            EntryError::io(
                e,
                "failed to open temporary file for reading",
                FieldContext::new("temp_path", path.display(), "file opened successfully"),
            )
        })?;
        file.seek(SeekFrom::Start(offset)).map_err(|e| {
            EntryError::io(e, "failed to seek in temporary file", FieldContext::new("offset", offset, "seek successful"))
        })?;
        let mut data = vec![0u8; size];
        let n = codec::fill(&mut file, &mut data, "temp_file")?;
        data.truncate(n);
        Ok(data)
    }

    /// Remove the temp file. Succeeds when there is none or it is already gone.
    pub fn cleanup_temp_file(&mut self, cancel: &CancelToken) -> Result<()> {
        cancel.check("cleanup_temp_file")?;
        let Some(path) = self.temp_path.take() else {
            return Ok(());
        };
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                let err = EntryError::io(
                    e,
                    "failed to remove temporary file",
                    FieldContext::new("temp_path", path.display(), "file removed successfully"),
                );
                self.temp_path = Some(path);
                return Err(err);
            }
        }
        debug!(file_id = self.file_id(), path = %path.display(), "removed temp file");
        Ok(())
    }

    /// Write the content bytes from the first available source: memory,
    /// source file, then temp file.
    pub fn write_content<W: Write + ?Sized>(&mut self, writer: &mut W) -> Result<u64> {
        if let Some(data) = &self.data {
            codec::write_bytes(writer, data, "data")?;
            return Ok(data.len() as u64);
        }

        if let Some(source) = self.source.as_mut() {
            if source.size > 0 {
                seek_source(source)?;
                let copied = io::copy(&mut Read::take(&mut source.file, source.size), writer).map_err(|e| {
                    EntryError::io(
                        e,
                        "failed to copy data from source file",
                        FieldContext::new("source_size", source.size, "copy successful"),
                    )
                })?;
                if copied != source.size {
                    return Err(EntryError::corruption(
                        "source file ended before the recorded size",
                        FieldContext::new("source_size", copied, format!("{} bytes", source.size)),
                    ));
                }
                return Ok(copied);
            }
        }

        if let Some(path) = self.temp_path.as_deref() {
            let mut file = File::open(path).map_err(|e| {
                EntryError::io(
                    e,
                    "failed to open temporary file for reading",
                    FieldContext::new("temp_path", path.display(), "file opened successfully"),
                )
            })?;
            return io::copy(&mut file, writer).map_err(|e| {
                EntryError::io(
                    e,
                    "failed to copy data from temporary file",
                    FieldContext::new("temp_path", path.display(), "copy successful"),
                )
            });
        }

        Err(data_not_available())
    }

    fn ensure_temp_file(&mut self, config: &StagingConfig, cancel: &CancelToken) -> Result<PathBuf> {
        match &self.temp_path {
            Some(path) => Ok(path.clone()),
            None => self.create_temp_file(config, cancel),
        }
    }
}

fn data_not_available() -> EntryError {
    EntryError::validation(
        "file entry data not available",
        FieldContext::new("data", "none", "data loaded, source file, or temp file available"),
    )
}

fn open_for_write(path: &Path) -> Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| {
            EntryError::io(
                e,
                "failed to open temporary file for writing",
                FieldContext::new("temp_path", path.display(), "file opened successfully"),
            )
        })
}

fn seek_source(source: &mut SourceFile) -> Result<()> {
    source.file.seek(SeekFrom::Start(source.offset)).map_err(|e| {
        EntryError::io(
            e,
            "failed to seek to source offset",
            FieldContext::new("source_offset", source.offset, "seek successful"),
        )
    })?;
    Ok(())
}

fn read_region(source: &mut SourceFile) -> Result<Vec<u8>> {
    seek_source(source)?;
    let size = usize::try_from(source.size).map_err(|_| {
        EntryError::validation(
            "source region does not fit in memory",
            FieldContext::new("source_size", source.size, "addressable size"),
        )
    })?;
    let mut data = vec![0u8; size];
    let n = codec::fill(&mut source.file, &mut data, "source_file")?;
    if n != size {
        return Err(EntryError::corruption(
            "incomplete data read",
            FieldContext::new("data", n, format!("{} bytes", size)),
        ));
    }
    Ok(data)
}

fn copy_region(source: &mut SourceFile, out: &mut File, buffer_size: usize, temp_path: &Path) -> Result<u64> {
    seek_source(source)?;
    let mut remaining = source.size;
    let mut buf = vec![0u8; buffer_size.max(1)];
    while remaining > 0 {
        let want = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        let n = codec::fill(&mut source.file, &mut buf[..want], "source_file")?;
        if n == 0 {
            return Err(EntryError::corruption(
                "source file ended before the recorded size",
                FieldContext::new("source_size", source.size - remaining, format!("{} bytes", source.size)),
            ));
        }
        out.write_all(&buf[..n]).map_err(|e| {
            EntryError::io(
                e,
                "failed to copy data to temporary file",
                FieldContext::new("temp_file", temp_path.display(), "copy successful"),
            )
        })?;
        remaining -= n as u64;
    }
    Ok(source.size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn staging_in(dir: &TempDir) -> StagingConfig {
        StagingConfig {
            temp_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        }
    }

    fn source_with(bytes: &[u8]) -> File {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    #[test]
    fn test_set_and_unload_data() {
        let mut entry = FileEntry::new(1);
        entry.set_data(b"abc".to_vec());
        assert!(entry.is_data_loaded());
        assert_eq!(entry.data().unwrap(), b"abc");
        assert_eq!(entry.stage_status(), StageStatus::Ready);

        entry.unload_data();
        assert!(!entry.is_data_loaded());
        assert!(entry.data().unwrap_err().is_validation());
    }

    #[test]
    fn test_load_from_source_region() {
        let mut entry = FileEntry::new(1);
        entry.set_source(source_with(b"0123456789"), 3, 4);
        entry.load_data(&CancelToken::new()).unwrap();
        assert_eq!(entry.content_bytes().unwrap(), b"3456");
    }

    #[test]
    fn test_data_loads_lazily() {
        let mut entry = FileEntry::new(1);
        entry.set_source(source_with(b"lazy bytes"), 5, 5);
        assert_eq!(entry.data().unwrap(), b"bytes");
    }

    #[test]
    fn test_load_short_source_is_corruption() {
        let mut entry = FileEntry::new(1);
        entry.set_source(source_with(b"tiny"), 2, 10);
        let err = entry.load_data(&CancelToken::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corruption);
        assert_eq!(entry.stage_status(), StageStatus::Failed);
    }

    #[test]
    fn test_load_without_source() {
        let mut entry = FileEntry::new(1);
        assert!(entry.load_data(&CancelToken::new()).unwrap_err().is_validation());
    }

    #[test]
    fn test_cancelled_before_io() {
        let dir = TempDir::new().unwrap();
        let mut entry = FileEntry::new(1);
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = entry.create_temp_file(&staging_in(&dir), &cancel).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Context);
        assert!(entry.temp_path().is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_temp_file_lifecycle() {
        let dir = TempDir::new().unwrap();
        let config = staging_in(&dir);
        let cancel = CancelToken::new();
        let mut entry = FileEntry::new(1);

        entry.write_to_temp_file(b"staged content", &config, &cancel).unwrap();
        let path = entry.temp_path().unwrap().to_path_buf();
        assert!(path.starts_with(dir.path()));
        assert!(path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap()
            .starts_with("novuspack-fileentry-"));

        assert_eq!(entry.read_from_temp_file(7, 7, &cancel).unwrap(), b"content");
        assert_eq!(entry.read_from_temp_file(7, 100, &cancel).unwrap(), b"content");

        entry.cleanup_temp_file(&cancel).unwrap();
        assert!(!path.exists());
        assert!(entry.temp_path().is_none());
        entry.cleanup_temp_file(&cancel).unwrap();
    }

    #[test]
    fn test_cleanup_missing_file_is_ok() {
        let dir = TempDir::new().unwrap();
        let mut entry = FileEntry::new(1);
        entry.set_temp_path(dir.path().join("never-created"));
        entry.cleanup_temp_file(&CancelToken::new()).unwrap();
        assert!(entry.temp_path().is_none());
    }

    #[test]
    fn test_stream_to_temp_file() {
        let dir = TempDir::new().unwrap();
        let config = StagingConfig {
            copy_buffer_size: 3,
            ..staging_in(&dir)
        };
        let cancel = CancelToken::new();
        let mut entry = FileEntry::new(1);
        entry.set_source(source_with(b"header|streamed body|trailer"), 7, 13);

        entry.stream_to_temp_file(&config, &cancel).unwrap();
        let staged = std::fs::read(entry.temp_path().unwrap()).unwrap();
        assert_eq!(staged, b"streamed body");
        entry.cleanup_temp_file(&cancel).unwrap();
    }

    #[test]
    fn test_stream_requires_source() {
        let dir = TempDir::new().unwrap();
        let mut entry = FileEntry::new(1);
        let err = entry
            .stream_to_temp_file(&staging_in(&dir), &CancelToken::new())
            .unwrap_err();
        assert!(err.is_validation());
        assert!(entry.temp_path().is_none());
    }

    #[test]
    fn test_write_content_priority() {
        let dir = TempDir::new().unwrap();
        let config = staging_in(&dir);
        let cancel = CancelToken::new();

        let mut entry = FileEntry::new(1);
        entry.write_to_temp_file(b"from temp", &config, &cancel).unwrap();
        entry.set_source(source_with(b"xxfrom sourcexx"), 2, 11);
        entry.set_data(b"from memory".to_vec());

        let mut out = Vec::new();
        entry.write_content(&mut out).unwrap();
        assert_eq!(out, b"from memory");

        entry.unload_data();
        out.clear();
        entry.write_content(&mut out).unwrap();
        assert_eq!(out, b"from source");

        entry.take_source();
        out.clear();
        assert_eq!(entry.write_content(&mut out).unwrap(), 9);
        assert_eq!(out, b"from temp");

        entry.cleanup_temp_file(&cancel).unwrap();
        let err = entry.write_content(&mut Vec::new()).unwrap_err();
        assert!(err.is_validation());
        assert!(err.message().contains("not available"));
    }
}
