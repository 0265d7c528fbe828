//! TAR (Tape Archive) format support.
//!
//! Only the POSIX USTAR header layout is written and accepted. A
//! [`Tarball`] is an ordered list of entries: build one with
//! [`Tarball::append`] and turn it into bytes with [`Tarball::stream`], or
//! parse existing bytes with [`Tarball::load`].
//!
//! ```rust
//! use std::io::Read;
//! use ustar_archive::tar::{LoadOptions, StreamOptions, Tarball};
//!
//! let mut tarball = Tarball::new();
//! tarball.add_file("notes/today.txt", "remember the milk").unwrap();
//!
//! let mut bytes = Vec::new();
//! tarball
//!     .stream(StreamOptions::default())
//!     .read_to_end(&mut bytes)
//!     .unwrap();
//!
//! let loaded = Tarball::load(&bytes[..], LoadOptions::default()).unwrap();
//! assert_eq!(loaded.len(), 2); // "notes" is synthesized
//! ```

pub mod decoder;
pub mod extract;
pub mod header;
mod stream;

#[cfg(feature = "async-io")]
mod async_io;

use crate::gzip;
use flate2::read::GzEncoder;
use header::{BLOCK_SIZE, TarHeader};
use std::collections::HashSet;
use std::io::{self, Cursor, Read, Write};
use std::time::SystemTime;
use ustar_core::data::{BodyReader, EntryData};
use ustar_core::entry::{self, DEFAULT_DIR_MODE, EntryInfo, EntryKind, TarEntryInfo};
use ustar_core::error::{Result, UstarError};

pub use decoder::TarDecoder;
pub use extract::{UnpackOptions, unpack, walk};
pub use header::checksum;
pub use stream::{END_MARKER_LEN, TarStream};

/// Default read size used by [`Tarball::load`].
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

enum Body {
    /// Copied out of a loaded archive.
    Loaded(Vec<u8>),
    /// Supplied to `append`, read once when streamed.
    Pending(BodyReader),
}

/// A single archive entry: resolved metadata, its encoded header and body.
pub struct TarEntry {
    info: TarEntryInfo,
    header: [u8; BLOCK_SIZE],
    body: Body,
}

impl TarEntry {
    pub(crate) fn loaded(info: TarEntryInfo, header: [u8; BLOCK_SIZE], data: Vec<u8>) -> Self {
        Self {
            info,
            header,
            body: Body::Loaded(data),
        }
    }

    /// Entry metadata.
    pub fn info(&self) -> &TarEntryInfo {
        &self.info
    }

    /// The 512 header bytes this entry is written with.
    pub fn header_bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.header
    }

    /// Body bytes, if the entry came from a loaded archive.
    ///
    /// Entries built with `append` return `None`: their body is only read
    /// once, when the archive is streamed or [`TarEntry::into_reader`] is
    /// called.
    pub fn data(&self) -> Option<&[u8]> {
        match &self.body {
            Body::Loaded(data) => Some(data),
            Body::Pending(_) => None,
        }
    }

    /// Hand out the body as a reader.
    pub fn into_reader(self) -> BodyReader {
        self.into_parts().2
    }

    /// Read the whole body into memory.
    ///
    /// Fails with [`UstarError::InvalidInput`] if the body does not have
    /// exactly the declared size.
    pub fn into_data(self) -> Result<Vec<u8>> {
        match self.body {
            Body::Loaded(data) => Ok(data),
            Body::Pending(reader) => {
                let size = self.info.size;
                let mut data = Vec::new();
                reader.take(size.saturating_add(1)).read_to_end(&mut data)?;
                if data.len() as u64 != size {
                    return Err(UstarError::invalid_input(format!(
                        "data for {} has {} bytes, declared {}",
                        self.info.relative_path,
                        data.len(),
                        size
                    )));
                }
                Ok(data)
            }
        }
    }

    /// Split into metadata, header block and body reader.
    pub fn into_parts(self) -> (TarEntryInfo, [u8; BLOCK_SIZE], BodyReader) {
        let body: BodyReader = match self.body {
            Body::Loaded(data) => Box::new(Cursor::new(data)),
            Body::Pending(reader) => reader,
        };
        (self.info, self.header, body)
    }
}

impl std::fmt::Debug for TarEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let body = match &self.body {
            Body::Loaded(data) => format!("Loaded({} bytes)", data.len()),
            Body::Pending(_) => "Pending".to_string(),
        };
        f.debug_struct("TarEntry")
            .field("info", &self.info)
            .field("body", &body)
            .finish()
    }
}

/// Options for [`Tarball::stream`].
#[derive(Debug, Clone, Copy)]
pub struct StreamOptions {
    /// Gzip-compress the archive bytes.
    pub gzip: bool,
    /// Gzip compression level (0-9).
    pub level: u32,
    /// Write two zero blocks after the last entry.
    pub end_marker: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            gzip: false,
            level: gzip::DEFAULT_LEVEL,
            end_marker: false,
        }
    }
}

impl StreamOptions {
    /// Plain, uncompressed output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gzip output at the default level.
    pub fn gzip() -> Self {
        Self::default().with_gzip(true)
    }

    /// Enable or disable gzip.
    pub fn with_gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }

    /// Set the gzip compression level.
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level.min(9);
        self
    }

    /// Enable or disable the end-of-archive marker.
    pub fn with_end_marker(mut self, end_marker: bool) -> Self {
        self.end_marker = end_marker;
        self
    }
}

/// Options for [`Tarball::load`] and [`walk`].
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    /// Input is gzip-compressed.
    pub gzip: bool,
    /// Read size used to feed the decoder.
    pub chunk_size: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            gzip: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl LoadOptions {
    /// Plain input, default chunk size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gzip input, default chunk size.
    pub fn gzip() -> Self {
        Self::default().with_gzip(true)
    }

    /// Enable or disable gzip.
    pub fn with_gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }

    /// Set the read size (at least one byte).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

/// Byte stream returned by [`Tarball::stream`].
pub enum ArchiveStream {
    /// Uncompressed archive.
    Plain(TarStream),
    /// Gzip-compressed archive.
    Gzip(GzEncoder<TarStream>),
}

impl Read for ArchiveStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Plain(stream) => stream.read(buf),
            Self::Gzip(encoder) => encoder.read(buf),
        }
    }
}

impl std::fmt::Debug for ArchiveStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain(stream) => f.debug_tuple("Plain").field(stream).finish(),
            Self::Gzip(encoder) => f.debug_tuple("Gzip").field(encoder.get_ref()).finish(),
        }
    }
}

/// An in-memory USTAR archive.
#[derive(Debug, Default)]
pub struct Tarball {
    entries: Vec<TarEntry>,
    directories: HashSet<String>,
}

impl Tarball {
    /// Create an empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, synthesized directories included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the archive has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in archive order.
    pub fn entries(&self) -> std::slice::Iter<'_, TarEntry> {
        self.entries.iter()
    }

    /// Take the entries out of the archive.
    pub fn into_entries(self) -> Vec<TarEntry> {
        self.entries
    }

    /// Whether an entry with this path exists.
    pub fn contains(&self, path: &str) -> bool {
        let path = path.trim_end_matches('/');
        self.directories.contains(path) || self.entries.iter().any(|e| e.info.relative_path == path)
    }

    /// Append an entry, synthesizing any missing parent directories first.
    ///
    /// `data` may only be `None` for directories. Every header is encoded
    /// before anything is recorded, so on error the archive is unchanged.
    pub fn append(&mut self, data: Option<EntryData>, info: EntryInfo) -> Result<()> {
        let (size, body) = match data {
            None if info.kind.is_dir() => {
                if info.size.is_some_and(|size| size > 0) {
                    return Err(UstarError::invalid_input(format!(
                        "directory {} cannot have a size",
                        info.relative_path
                    )));
                }
                (0, None)
            }
            None => {
                return Err(UstarError::invalid_input(format!(
                    "{} entry {} requires data",
                    info.kind, info.relative_path
                )));
            }
            Some(data) => {
                let size = data.resolve_size(info.size)?;
                if info.kind.is_dir() && size > 0 {
                    return Err(UstarError::invalid_input(format!(
                        "directory {} cannot have data",
                        info.relative_path
                    )));
                }
                (size, Some(data))
            }
        };

        let resolved = info.resolve(size, SystemTime::now())?;
        let header = TarHeader::encode(&resolved)?;

        let mut parents = Vec::new();
        for dir in entry::ancestors(&resolved.relative_path) {
            if self.directories.contains(dir) {
                continue;
            }
            let parent = TarEntryInfo {
                name: entry::basename(dir).to_string(),
                kind: EntryKind::Directory,
                relative_path: dir.to_string(),
                size: 0,
                mtime: resolved.mtime,
                mode: DEFAULT_DIR_MODE,
                uid: resolved.uid,
                gid: resolved.gid,
                owner: resolved.owner.clone(),
                group: resolved.group.clone(),
                linkname: String::new(),
                dev_major: 0,
                dev_minor: 0,
            };
            let block = TarHeader::encode(&parent)?;
            parents.push(TarEntry::loaded(parent, block, Vec::new()));
        }

        for parent in parents {
            log::debug!("synthesized directory {}", parent.info.relative_path);
            self.push(parent);
        }

        log::debug!(
            "appended {} {} ({} bytes)",
            resolved.kind,
            resolved.relative_path,
            resolved.size
        );
        let body = match body {
            None => Body::Loaded(Vec::new()),
            Some(EntryData::Bytes(bytes)) => Body::Loaded(bytes),
            Some(other) => Body::Pending(other.into_reader()),
        };
        self.push(TarEntry {
            info: resolved,
            header,
            body,
        });
        Ok(())
    }

    /// Append a regular file with default metadata.
    pub fn add_file(&mut self, path: &str, data: impl Into<EntryData>) -> Result<()> {
        self.append(Some(data.into()), EntryInfo::file(path))
    }

    /// Append a directory with default metadata.
    pub fn add_directory(&mut self, path: &str) -> Result<()> {
        self.append(None, EntryInfo::directory(path))
    }

    /// Turn the archive into a readable byte stream.
    pub fn stream(self, options: StreamOptions) -> ArchiveStream {
        let stream = TarStream::new(self.entries, options.end_marker);
        if options.gzip {
            ArchiveStream::Gzip(gzip::encoder(stream, options.level))
        } else {
            ArchiveStream::Plain(stream)
        }
    }

    /// Stream the archive into `writer`, returning the number of bytes
    /// written.
    pub fn write_to<W: Write>(self, writer: &mut W, options: StreamOptions) -> Result<u64> {
        let mut stream = self.stream(options);
        Ok(io::copy(&mut stream, writer)?)
    }

    /// Parse a complete archive.
    pub fn load<R: Read>(reader: R, options: LoadOptions) -> Result<Self> {
        if options.gzip {
            Self::load_plain(gzip::decoder(reader), options.chunk_size)
        } else {
            Self::load_plain(reader, options.chunk_size)
        }
    }

    fn load_plain<R: Read>(mut reader: R, chunk_size: usize) -> Result<Self> {
        let mut decoder = TarDecoder::new();
        let mut tarball = Self::new();
        let mut chunk = vec![0u8; chunk_size.max(1)];

        loop {
            let n = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            for entry in decoder.feed(&chunk[..n])? {
                tarball.push(entry);
            }
        }

        decoder.finish()?;
        log::debug!("loaded {} entries", tarball.len());
        Ok(tarball)
    }

    pub(crate) fn push(&mut self, entry: TarEntry) {
        if entry.info.is_dir() {
            self.directories.insert(entry.info.relative_path.clone());
        }
        self.entries.push(entry);
    }
}
