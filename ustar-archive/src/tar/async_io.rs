//! Async archive loading.
//!
//! Only available with the `async-io` feature:
//!
//! ```toml
//! [dependencies]
//! ustar-archive = { version = "0.1", features = ["async-io"] }
//! ```

use super::{LoadOptions, TarDecoder, Tarball};
use async_compression::tokio::bufread::GzipDecoder;
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use ustar_core::error::Result;

impl Tarball {
    /// Parse a complete archive from an async reader.
    ///
    /// Behaves like [`Tarball::load`]; gzip input is decoded with
    /// async-compression.
    pub async fn load_async<R>(reader: R, options: LoadOptions) -> Result<Self>
    where
        R: AsyncRead + Unpin,
    {
        let mut reader: Pin<Box<dyn AsyncRead + '_>> = if options.gzip {
            let mut decoder = GzipDecoder::new(BufReader::new(reader));
            decoder.multiple_members(true);
            Box::pin(decoder)
        } else {
            Box::pin(reader)
        };

        let mut decoder = TarDecoder::new();
        let mut tarball = Self::new();
        let mut chunk = vec![0u8; options.chunk_size.max(1)];

        loop {
            let n = reader.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            for entry in decoder.feed(&chunk[..n])? {
                tarball.push(entry);
            }
        }

        decoder.finish()?;
        log::debug!("loaded {} entries", tarball.len());
        Ok(tarball)
    }
}
