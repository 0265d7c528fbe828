//! GZIP pass-through (RFC 1952).
//!
//! The archive codec never looks inside gzip: compressed output is the plain
//! archive stream wrapped in an encoder, and compressed input is unwrapped
//! before it reaches the decoder.
//!
//! ## Example
//!
//! ```rust
//! use ustar_archive::gzip;
//!
//! let data = b"Hello, World!";
//! let compressed = gzip::compress(data, 6).unwrap();
//! assert!(gzip::is_gzip(&compressed));
//!
//! let decompressed = gzip::decompress(&compressed[..]).unwrap();
//! assert_eq!(decompressed, data);
//! ```

use flate2::Compression;
use flate2::read::{GzEncoder, MultiGzDecoder};
use std::io::Read;
use ustar_core::error::Result;

/// Compression level used when none is given.
pub const DEFAULT_LEVEL: u32 = 6;

/// GZIP magic bytes.
pub const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Wrap a reader so that reading yields its gzip-compressed bytes.
pub fn encoder<R: Read>(reader: R, level: u32) -> GzEncoder<R> {
    GzEncoder::new(reader, Compression::new(level.min(9)))
}

/// Wrap a gzip reader so that reading yields the decompressed bytes.
///
/// Concatenated gzip members are decoded as one stream.
pub fn decoder<R: Read>(reader: R) -> MultiGzDecoder<R> {
    MultiGzDecoder::new(reader)
}

/// Compress a buffer.
pub fn compress(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    encoder(data, level).read_to_end(&mut out)?;
    Ok(out)
}

/// Decompress everything from a reader.
pub fn decompress<R: Read>(reader: R) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    decoder(reader).read_to_end(&mut out)?;
    Ok(out)
}

/// Check for the gzip magic bytes.
pub fn is_gzip(data: &[u8]) -> bool {
    data.starts_with(&GZIP_MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let data = b"ustar ustar ustar ustar".repeat(40);
        let compressed = compress(&data, DEFAULT_LEVEL).unwrap();
        assert!(is_gzip(&compressed));
        assert!(compressed.len() < data.len());
        assert_eq!(decompress(&compressed[..]).unwrap(), data);
    }

    #[test]
    fn test_multi_member() {
        let mut joined = compress(b"first,", 1).unwrap();
        joined.extend(compress(b"second", 9).unwrap());
        assert_eq!(decompress(&joined[..]).unwrap(), b"first,second");
    }

    #[test]
    fn test_not_gzip() {
        assert!(!is_gzip(b"ustar"));
        assert!(decompress(&b"definitely not gzip"[..]).is_err());
    }
}
