//! Entry data sources.
//!
//! An entry body is a finite, single-pass byte sequence. [`EntryData`] covers
//! the shapes callers hand to `append`; [`EntryData::into_reader`] turns any
//! of them into the boxed reader the archive keeps until it is streamed out.

use crate::error::{Result, UstarError};
use std::fs::{self, File};
use std::io::{self, Cursor, Read};
use std::path::PathBuf;

/// Boxed single-pass body reader.
pub type BodyReader = Box<dyn Read + Send>;

/// Data supplied for an appended entry.
pub enum EntryData {
    /// In-memory bytes (also used for text).
    Bytes(Vec<u8>),
    /// A file whose length is taken from its metadata.
    File(File),
    /// A file on disk, opened only when its body is first read.
    Path(PathBuf),
    /// An arbitrary stream; its size must be given in the entry metadata.
    Stream(BodyReader),
}

impl EntryData {
    /// Wrap an arbitrary reader.
    pub fn stream(reader: impl Read + Send + 'static) -> Self {
        Self::Stream(Box::new(reader))
    }

    /// Reference a file by path without opening it.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// An empty body.
    pub fn empty() -> Self {
        Self::Bytes(Vec::new())
    }

    /// Length of the data when it is knowable without reading it.
    pub fn known_len(&self) -> Result<Option<u64>> {
        match self {
            Self::Bytes(bytes) => Ok(Some(bytes.len() as u64)),
            Self::File(file) => Ok(Some(file.metadata()?.len())),
            Self::Path(path) => Ok(Some(fs::metadata(path)?.len())),
            Self::Stream(_) => Ok(None),
        }
    }

    /// Resolve the body size against the size declared in metadata.
    pub fn resolve_size(&self, declared: Option<u64>) -> Result<u64> {
        match (self.known_len()?, declared) {
            (Some(known), Some(declared)) if known != declared => {
                Err(UstarError::invalid_input(format!(
                    "declared size {} does not match data length {}",
                    declared, known
                )))
            }
            (Some(known), _) => Ok(known),
            (None, Some(declared)) => Ok(declared),
            (None, None) => Err(UstarError::invalid_input(
                "stream data requires an explicit size",
            )),
        }
    }

    /// Convert into a boxed reader, consuming the source.
    pub fn into_reader(self) -> BodyReader {
        match self {
            Self::Bytes(bytes) => Box::new(Cursor::new(bytes)),
            Self::File(file) => Box::new(file),
            Self::Path(path) => Box::new(LazyFile { path, file: None }),
            Self::Stream(reader) => reader,
        }
    }
}

/// Opens its file on the first read and closes it when dropped.
struct LazyFile {
    path: PathBuf,
    file: Option<File>,
}

impl Read for LazyFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.file.is_none() {
            self.file = Some(File::open(&self.path)?);
        }
        match &mut self.file {
            Some(file) => file.read(buf),
            None => Ok(0),
        }
    }
}

impl std::fmt::Debug for EntryData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::File(file) => f.debug_tuple("File").field(file).finish(),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Vec<u8>> for EntryData {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for EntryData {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for EntryData {
    fn from(bytes: &[u8; N]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<&str> for EntryData {
    fn from(text: &str) -> Self {
        Self::Bytes(text.as_bytes().to_vec())
    }
}

impl From<String> for EntryData {
    fn from(text: String) -> Self {
        Self::Bytes(text.into_bytes())
    }
}

impl From<PathBuf> for EntryData {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<File> for EntryData {
    fn from(file: File) -> Self {
        Self::File(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_bytes_size() {
        let data = EntryData::from("hello");
        assert_eq!(data.resolve_size(None).unwrap(), 5);
        assert_eq!(data.resolve_size(Some(5)).unwrap(), 5);
        assert!(data.resolve_size(Some(6)).is_err());
    }

    #[test]
    fn test_stream_needs_size() {
        let data = EntryData::stream(Cursor::new(vec![1, 2, 3]));
        assert!(matches!(
            data.resolve_size(None),
            Err(UstarError::InvalidInput { .. })
        ));
        assert_eq!(data.resolve_size(Some(3)).unwrap(), 3);
    }

    #[test]
    fn test_file_size_from_metadata() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(b"blob contents").unwrap();
        let data = EntryData::from(file);
        assert_eq!(data.known_len().unwrap(), Some(13));
    }

    #[test]
    fn test_path_size_from_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sized.txt");
        fs::write(&path, b"twelve bytes").unwrap();
        let data = EntryData::path(&path);
        assert_eq!(data.resolve_size(None).unwrap(), 12);
        assert!(data.resolve_size(Some(3)).is_err());
    }

    #[test]
    fn test_path_opened_on_first_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("later.txt");
        fs::write(&path, b"first").unwrap();

        let mut reader = EntryData::path(&path).into_reader();
        // replaced with a new file before the first read
        fs::remove_file(&path).unwrap();
        fs::write(&path, b"second").unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"second");

        let mut missing = EntryData::path(dir.path().join("gone.txt")).into_reader();
        let err = missing.read(&mut [0u8; 4]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_into_reader() {
        let mut reader = EntryData::from(vec![7u8; 4]).into_reader();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, vec![7u8; 4]);
    }
}
