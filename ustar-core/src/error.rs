//! Error types for ustar operations.
//!
//! Every failure of the codec is local and surfaced directly to the caller of
//! `append`, `load` or `stream`. Nothing is retried and nothing is swallowed.

use std::io;
use thiserror::Error;

/// Legacy numeric code for over-long names.
///
/// Only exposed through [`UstarError::legacy_code`] for callers that need to
/// interoperate with that error code.
pub const LEGACY_NAME_TOO_LONG_CODE: u16 = 431;

/// The main error type for ustar operations.
#[derive(Debug, Error)]
pub enum UstarError {
    /// I/O error from underlying reader/writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Path cannot be split into a 100-byte name and a 155-byte prefix.
    #[error("Name too long for USTAR header ({len} bytes): {path}")]
    NameTooLong {
        /// The offending path.
        path: String,
        /// Its length in bytes.
        len: usize,
    },

    /// Header checksum mismatch.
    #[error(
        "Corrupt archive at offset {offset}: header checksum {expected:#o}, computed {computed:#o}"
    )]
    CorruptArchive {
        /// Byte offset of the header block in the archive.
        offset: u64,
        /// Checksum stored in the header (0 if the field was unreadable).
        expected: u32,
        /// Checksum computed over the header block.
        computed: u32,
    },

    /// Magic field is not USTAR.
    #[error("Unsupported format: magic {magic:02x?} is not ustar")]
    UnsupportedFormat {
        /// The six magic bytes found.
        magic: Vec<u8>,
    },

    /// Input ended inside a header or an entry body.
    #[error("Truncated archive at offset {offset}: expected {expected} bytes, {available} available")]
    TruncatedArchive {
        /// Byte offset of the incomplete record.
        offset: u64,
        /// Number of bytes the record needs.
        expected: u64,
        /// Number of bytes that were available.
        available: u64,
    },

    /// Invalid arguments or entry data.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Description of the problem.
        message: String,
    },

    /// A header field that passed the checksum could not be parsed.
    #[error("Invalid header: {message}")]
    InvalidHeader {
        /// Description of the header error.
        message: String,
    },

    /// Path traversal attack detected (e.g., "../" in an entry path).
    #[error("Path traversal detected in entry: {path}")]
    PathTraversal {
        /// The suspicious path.
        path: String,
    },
}

/// Result type alias for ustar operations.
pub type Result<T> = std::result::Result<T, UstarError>;

impl UstarError {
    /// Create a name too long error.
    pub fn name_too_long(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::NameTooLong {
            len: path.len(),
            path,
        }
    }

    /// Create a corrupt archive error.
    pub fn corrupt(offset: u64, expected: u32, computed: u32) -> Self {
        Self::CorruptArchive {
            offset,
            expected,
            computed,
        }
    }

    /// Create an unsupported format error.
    pub fn unsupported_format(magic: impl Into<Vec<u8>>) -> Self {
        Self::UnsupportedFormat {
            magic: magic.into(),
        }
    }

    /// Create a truncated archive error.
    pub fn truncated(offset: u64, expected: u64, available: u64) -> Self {
        Self::TruncatedArchive {
            offset,
            expected,
            available,
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }

    /// Create a path traversal error.
    pub fn path_traversal(path: impl Into<String>) -> Self {
        Self::PathTraversal { path: path.into() }
    }

    /// Legacy numeric code, only defined for [`UstarError::NameTooLong`].
    pub fn legacy_code(&self) -> Option<u16> {
        match self {
            Self::NameTooLong { .. } => Some(LEGACY_NAME_TOO_LONG_CODE),
            _ => None,
        }
    }
}

impl From<UstarError> for io::Error {
    fn from(err: UstarError) -> Self {
        let kind = match &err {
            UstarError::Io(e) => e.kind(),
            UstarError::TruncatedArchive { .. } => io::ErrorKind::UnexpectedEof,
            UstarError::InvalidInput { .. } | UstarError::NameTooLong { .. } => {
                io::ErrorKind::InvalidInput
            }
            _ => io::ErrorKind::InvalidData,
        };
        match err {
            UstarError::Io(e) => e,
            other => io::Error::new(kind, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = UstarError::name_too_long("a".repeat(120));
        assert!(err.to_string().contains("120 bytes"));

        let err = UstarError::corrupt(512, 0o1234, 0o1235);
        assert!(err.to_string().contains("offset 512"));

        let err = UstarError::unsupported_format(b"gnutar".to_vec());
        assert!(err.to_string().contains("Unsupported format"));
    }

    #[test]
    fn test_legacy_code() {
        assert_eq!(UstarError::name_too_long("x").legacy_code(), Some(431));
        assert_eq!(UstarError::invalid_input("x").legacy_code(), None);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: UstarError = io_err.into();
        assert!(matches!(err, UstarError::Io(_)));
    }

    #[test]
    fn test_into_io_error_kind() {
        let err: io::Error = UstarError::truncated(0, 512, 100).into();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

        let err: io::Error = UstarError::corrupt(0, 1, 2).into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let err: io::Error = UstarError::Io(io::Error::other("boom")).into();
        assert_eq!(err.kind(), io::ErrorKind::Other);
    }
}
