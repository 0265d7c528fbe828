//! # ustar core
//!
//! Core components shared by the ustar crates:
//!
//! - [`error`]: the error taxonomy of the codec
//! - [`entry`]: entry kinds, caller metadata and resolved metadata
//! - [`data`]: entry data sources
//!
//! ## Example
//!
//! ```rust
//! use ustar_core::{EntryInfo, EntryKind};
//! use std::time::UNIX_EPOCH;
//!
//! let info = EntryInfo::file("docs/readme.txt")
//!     .with_mode(0o644)
//!     .resolve(12, UNIX_EPOCH)
//!     .unwrap();
//! assert_eq!(info.name, "readme.txt");
//! assert_eq!(info.kind, EntryKind::File);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod data;
pub mod entry;
pub mod error;

// Re-exports for convenience
pub use data::{BodyReader, EntryData};
pub use entry::{EntryInfo, EntryKind, TarEntryInfo};
pub use error::{Result, UstarError};
