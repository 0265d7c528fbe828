//! Lazy archive byte stream.

use super::TarEntry;
use super::header::{BLOCK_SIZE, padding_len};
use std::io::{self, Read};
use ustar_core::data::BodyReader;
use ustar_core::error::UstarError;

/// Size of the end-of-archive marker (two zero blocks).
pub const END_MARKER_LEN: usize = BLOCK_SIZE * 2;

enum State {
    /// Pull the next entry.
    Next,
    /// Emitting a header block.
    Header {
        block: [u8; BLOCK_SIZE],
        pos: usize,
        body: BodyReader,
        size: u64,
        path: String,
    },
    /// Copying an entry body.
    Body {
        reader: BodyReader,
        remaining: u64,
        size: u64,
        path: String,
    },
    /// Emitting zero bytes (padding or end marker).
    Zeros { remaining: usize, last: bool },
    Done,
}

/// Uncompressed archive stream: each entry's header, body and padding in
/// order, produced as the caller reads.
pub struct TarStream {
    entries: std::vec::IntoIter<TarEntry>,
    state: State,
    end_marker: bool,
    emitted: u64,
}

impl TarStream {
    pub(crate) fn new(entries: Vec<TarEntry>, end_marker: bool) -> Self {
        Self {
            entries: entries.into_iter(),
            state: State::Next,
            end_marker,
            emitted: 0,
        }
    }

    /// Bytes produced so far.
    pub fn bytes_emitted(&self) -> u64 {
        self.emitted
    }

    fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match &mut self.state {
                State::Next => match self.entries.next() {
                    Some(entry) => {
                        let (info, block, body) = entry.into_parts();
                        log::debug!(
                            "streaming {} {} ({} bytes)",
                            info.kind,
                            info.relative_path,
                            info.size
                        );
                        self.state = State::Header {
                            block,
                            pos: 0,
                            body,
                            size: info.size,
                            path: info.relative_path,
                        };
                    }
                    None => {
                        let remaining = if self.end_marker { END_MARKER_LEN } else { 0 };
                        self.state = State::Zeros {
                            remaining,
                            last: true,
                        };
                    }
                },
                State::Header { block, pos, .. } if *pos < BLOCK_SIZE => {
                    let n = (BLOCK_SIZE - *pos).min(buf.len());
                    buf[..n].copy_from_slice(&block[*pos..*pos + n]);
                    *pos += n;
                    return Ok(n);
                }
                State::Header { .. } => {
                    if let State::Header {
                        body, size, path, ..
                    } = std::mem::replace(&mut self.state, State::Done)
                    {
                        self.state = State::Body {
                            reader: body,
                            remaining: size,
                            size,
                            path,
                        };
                    }
                }
                State::Body {
                    reader,
                    remaining,
                    size,
                    path,
                } => {
                    if *remaining == 0 {
                        let mut extra = [0u8; 1];
                        if reader.read(&mut extra)? != 0 {
                            return Err(UstarError::invalid_input(format!(
                                "data for {} is longer than its declared size {}",
                                path, size
                            ))
                            .into());
                        }
                        self.state = State::Zeros {
                            remaining: padding_len(*size),
                            last: false,
                        };
                        continue;
                    }

                    let limit = (*remaining).min(buf.len() as u64) as usize;
                    let n = reader.read(&mut buf[..limit])?;
                    if n == 0 {
                        return Err(UstarError::invalid_input(format!(
                            "data for {} ended after {} of {} bytes",
                            path,
                            *size - *remaining,
                            size
                        ))
                        .into());
                    }
                    *remaining -= n as u64;
                    return Ok(n);
                }
                State::Zeros { remaining, last } => {
                    if *remaining == 0 {
                        self.state = if *last { State::Done } else { State::Next };
                        continue;
                    }
                    let n = (*remaining).min(buf.len());
                    buf[..n].fill(0);
                    *remaining -= n;
                    return Ok(n);
                }
                State::Done => return Ok(0),
            }
        }
    }
}

impl Read for TarStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let n = self.fill(buf)?;
        self.emitted += n as u64;
        Ok(n)
    }
}

impl std::fmt::Debug for TarStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TarStream")
            .field("remaining_entries", &self.entries.len())
            .field("end_marker", &self.end_marker)
            .field("emitted", &self.emitted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::tar::{StreamOptions, Tarball};
    use std::io::{Cursor, Read};
    use ustar_core::{EntryData, EntryInfo};

    #[test]
    fn test_small_reads() {
        let mut tarball = Tarball::new();
        tarball.add_file("a.txt", "abc").unwrap();

        let mut stream = tarball.stream(StreamOptions::default());
        let mut out = Vec::new();
        let mut buf = [0u8; 7];
        loop {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out.len(), 1024);
        assert_eq!(&out[512..515], b"abc");
        assert!(out[515..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_short_stream_body_fails() {
        let mut tarball = Tarball::new();
        tarball
            .append(
                Some(EntryData::stream(Cursor::new(vec![1u8; 10]))),
                EntryInfo::file("short.bin").with_size(20),
            )
            .unwrap();

        let mut out = Vec::new();
        let err = tarball
            .stream(StreamOptions::default())
            .read_to_end(&mut out)
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_long_stream_body_fails() {
        let mut tarball = Tarball::new();
        tarball
            .append(
                Some(EntryData::stream(Cursor::new(vec![1u8; 30]))),
                EntryInfo::file("long.bin").with_size(20),
            )
            .unwrap();

        let mut out = Vec::new();
        assert!(
            tarball
                .stream(StreamOptions::default())
                .read_to_end(&mut out)
                .is_err()
        );
    }

    #[test]
    fn test_end_marker() {
        let mut tarball = Tarball::new();
        tarball.add_file("a.txt", "abc").unwrap();

        let mut out = Vec::new();
        tarball
            .stream(StreamOptions::default().with_end_marker(true))
            .read_to_end(&mut out)
            .unwrap();
        assert_eq!(out.len(), 2048);
        assert!(out[1024..].iter().all(|&b| b == 0));
    }
}
