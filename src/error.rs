//! Error types for entry codecs, tag handling and path metadata
//!
//! Every error carries an [`ErrorKind`] and a [`FieldContext`] naming the
//! offending field, the value that was found and what was expected.

use std::fmt;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller-supplied data or state violates an invariant
    Validation,
    /// The underlying reader/writer/seeker failed
    Io,
    /// Bytes were present but structurally broken
    Corruption,
    /// A cancellation signal was observed
    Context,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Io => "io",
            ErrorKind::Corruption => "corruption",
            ErrorKind::Context => "context",
        };
        f.write_str(name)
    }
}

/// Field, offending value and expected condition attached to an error
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldContext {
    pub field: String,
    pub value: String,
    pub expected: String,
}

impl FieldContext {
    pub fn new(
        field: impl Into<String>,
        value: impl fmt::Display,
        expected: impl Into<String>,
    ) -> Self {
        FieldContext {
            field: field.into(),
            value: value.to_string(),
            expected: expected.into(),
        }
    }
}

impl fmt::Display for FieldContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field={} value={} expected={}",
            self.field, self.value, self.expected
        )
    }
}

/// Error returned by every fallible operation in this crate
#[derive(Error, Debug)]
#[error("{kind} error: {message} ({context})")]
pub struct EntryError {
    kind: ErrorKind,
    message: String,
    context: FieldContext,
    #[source]
    source: Option<BoxError>,
}

impl EntryError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, context: FieldContext) -> Self {
        EntryError {
            kind,
            message: message.into(),
            context,
            source: None,
        }
    }

    pub fn validation(message: impl Into<String>, context: FieldContext) -> Self {
        Self::new(ErrorKind::Validation, message, context)
    }

    pub fn corruption(message: impl Into<String>, context: FieldContext) -> Self {
        Self::new(ErrorKind::Corruption, message, context)
    }

    /// Wrap an I/O failure
    pub fn io(err: std::io::Error, message: impl Into<String>, context: FieldContext) -> Self {
        Self::new(ErrorKind::Io, message, context).with_source(err)
    }

    /// Cancellation observed before `operation` could start
    pub fn cancelled(operation: &str) -> Self {
        Self::new(
            ErrorKind::Context,
            "operation cancelled",
            FieldContext::new("context", operation, "context not cancelled"),
        )
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Annotate this error with an outer message and context.
    ///
    /// The kind of the inner error is kept; the inner error becomes the source.
    pub fn wrap(self, message: impl Into<String>, context: FieldContext) -> Self {
        EntryError {
            kind: self.kind,
            message: message.into(),
            context,
            source: Some(Box::new(self)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &FieldContext {
        &self.context
    }

    pub fn is_validation(&self) -> bool {
        self.kind == ErrorKind::Validation
    }

    pub fn is_corruption(&self) -> bool {
        self.kind == ErrorKind::Corruption
    }
}

pub type Result<T> = std::result::Result<T, EntryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_display_includes_context() {
        let err = EntryError::validation(
            "file ID cannot be zero",
            FieldContext::new("file_id", 0, "non-zero value"),
        );
        let text = err.to_string();
        assert!(text.contains("validation"));
        assert!(text.contains("file_id"));
        assert!(text.contains("non-zero value"));
    }

    #[test]
    fn test_wrap_keeps_kind_and_chains_source() {
        let inner = EntryError::corruption("short read", FieldContext::new("path", 3, "10 bytes"));
        let outer = inner.wrap("failed to read path 0", FieldContext::new("paths", 0, "1 path"));

        assert_eq!(outer.kind(), ErrorKind::Corruption);
        assert_eq!(outer.context().field, "paths");
        let source = outer.source().map(|s| s.to_string()).unwrap_or_default();
        assert!(source.contains("short read"));
    }

    #[test]
    fn test_io_error_has_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = EntryError::io(io, "write failed", FieldContext::new("data", 4, "written"));
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_cancelled_is_context_kind() {
        let err = EntryError::cancelled("load_data");
        assert_eq!(err.kind(), ErrorKind::Context);
        assert_eq!(err.context().value, "load_data");
    }
}
