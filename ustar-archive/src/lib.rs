//! # ustar archive
//!
//! USTAR tar archive support:
//!
//! - **TAR**: header codec, in-memory [`Tarball`] assembly and parsing, an
//!   incremental [`TarDecoder`], and streaming extraction
//! - **GZIP**: optional compression wrapped around the archive stream
//!
//! ## Example
//!
//! ```rust
//! use ustar_archive::{LoadOptions, StreamOptions, Tarball};
//! use ustar_core::EntryInfo;
//!
//! let mut tarball = Tarball::new();
//! tarball
//!     .append(Some("hello".into()), EntryInfo::file("hello.txt").with_mode(0o644))
//!     .unwrap();
//!
//! let mut archive = Vec::new();
//! tarball.write_to(&mut archive, StreamOptions::gzip()).unwrap();
//!
//! let loaded = Tarball::load(&archive[..], LoadOptions::gzip()).unwrap();
//! let entry = loaded.entries().next().unwrap();
//! assert_eq!(entry.info().mode, 0o644);
//! assert_eq!(entry.data(), Some(&b"hello"[..]));
//! ```
//!
//! ## Feature Flags
//!
//! - `async-io`: `Tarball::load_async` over `tokio::io::AsyncRead`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod gzip;
pub mod tar;

// Re-exports
pub use tar::header::TarHeader;
pub use tar::{
    ArchiveStream, LoadOptions, StreamOptions, TarDecoder, TarEntry, TarStream, Tarball,
    UnpackOptions, unpack, walk,
};
