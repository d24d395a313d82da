//! How far staged content has been processed
//!
//! Compression and encryption are applied by outer layers. The entry only
//! records which steps already ran so a commit step can tell what is left.

use crate::error::{EntryError, FieldContext, Result};

/// Compression type ids stored in the file entry header
pub mod compression {
    pub const NONE: u8 = 0;
    pub const ZSTD: u8 = 1;
    pub const LZ4: u8 = 2;
    pub const LZMA: u8 = 3;
}

/// Encryption type ids stored in the file entry header
pub mod encryption {
    pub const NONE: u8 = 0;
    pub const AES256_GCM: u8 = 1;
    pub const QUANTUM_SAFE: u8 = 2;
}

/// Processing applied to the staged bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ProcessingState {
    #[default]
    Raw = 0,
    Compressed = 1,
    Encrypted = 2,
    CompressedAndEncrypted = 3,
}

impl ProcessingState {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ProcessingState::Raw),
            1 => Some(ProcessingState::Compressed),
            2 => Some(ProcessingState::Encrypted),
            3 => Some(ProcessingState::CompressedAndEncrypted),
            _ => None,
        }
    }

    pub fn is_compressed(self) -> bool {
        matches!(
            self,
            ProcessingState::Compressed | ProcessingState::CompressedAndEncrypted
        )
    }

    pub fn is_encrypted(self) -> bool {
        matches!(
            self,
            ProcessingState::Encrypted | ProcessingState::CompressedAndEncrypted
        )
    }

    /// State after compression ran.
    ///
    /// Compressing already-encrypted bytes is rejected, as is compressing twice.
    pub fn compressed(self) -> Result<Self> {
        match self {
            ProcessingState::Raw => Ok(ProcessingState::Compressed),
            other => Err(invalid_transition(other, "compress")),
        }
    }

    /// State after encryption ran
    pub fn encrypted(self) -> Result<Self> {
        match self {
            ProcessingState::Raw => Ok(ProcessingState::Encrypted),
            ProcessingState::Compressed => Ok(ProcessingState::CompressedAndEncrypted),
            other => Err(invalid_transition(other, "encrypt")),
        }
    }

    /// Work still required to reach the configured compression/encryption
    pub fn pending(self, compression_type: u8, encryption_type: u8) -> PendingWork {
        PendingWork {
            compress: compression_type != compression::NONE && !self.is_compressed(),
            encrypt: encryption_type != encryption::NONE && !self.is_encrypted(),
        }
    }
}

fn invalid_transition(from: ProcessingState, step: &str) -> EntryError {
    EntryError::validation(
        format!("cannot {} content in state {:?}", step, from),
        FieldContext::new("processing_state", format!("{:?}", from), format!("state that allows {}", step)),
    )
}

/// Steps a commit still has to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PendingWork {
    pub compress: bool,
    pub encrypt: bool,
}

impl PendingWork {
    pub fn is_done(&self) -> bool {
        !self.compress && !self.encrypt
    }
}

/// Activity of the most recent content staging operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StageStatus {
    #[default]
    Idle,
    Loading,
    Streaming,
    Writing,
    Ready,
    Failed,
}
