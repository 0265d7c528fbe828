//! Push-based incremental archive decoder.
//!
//! [`TarDecoder`] accepts input in arbitrary chunks and emits every entry
//! whose header and body are complete. Both the blocking and the async
//! loaders drive it, so chunking never changes the result.

use super::TarEntry;
use super::header::{BLOCK_SIZE, TarHeader, is_zero_block, padding_len};
use ustar_core::error::{Result, UstarError};

/// A decoded header waiting for its body.
#[derive(Debug)]
struct Pending {
    header: TarHeader,
    block: [u8; BLOCK_SIZE],
    offset: u64,
    size: usize,
}

/// Incremental USTAR decoder.
#[derive(Debug, Default)]
pub struct TarDecoder {
    /// Accumulated, not yet consumed input.
    buffer: Vec<u8>,
    /// Archive offset of `buffer[0]`.
    offset: u64,
    /// Header whose body has not fully arrived.
    pending: Option<Pending>,
    /// Padding bytes still to be skipped from future input.
    skip: usize,
    /// Number of entries emitted so far.
    emitted: usize,
}

impl TarDecoder {
    /// Create a new decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries emitted so far.
    pub fn entries_emitted(&self) -> usize {
        self.emitted
    }

    /// Total input bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.offset
    }

    /// Feed a chunk of input and collect every entry it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<TarEntry>> {
        self.buffer.extend_from_slice(chunk);
        let mut entries = Vec::new();
        let mut pos = 0usize;

        loop {
            let available = self.buffer.len() - pos;

            if self.skip > 0 {
                let n = self.skip.min(available);
                pos += n;
                self.skip -= n;
                if self.skip > 0 {
                    break;
                }
                continue;
            }

            match self.pending.take() {
                None => {
                    if available < BLOCK_SIZE {
                        break;
                    }
                    let mut block = [0u8; BLOCK_SIZE];
                    block.copy_from_slice(&self.buffer[pos..pos + BLOCK_SIZE]);
                    let offset = self.offset + pos as u64;
                    pos += BLOCK_SIZE;

                    if is_zero_block(&block) {
                        log::trace!("zero block at offset {}", offset);
                        continue;
                    }

                    let header = TarHeader::decode_at(&block, offset)?;
                    let size = usize::try_from(header.size).map_err(|_| {
                        UstarError::invalid_header(format!(
                            "entry size {} exceeds addressable memory",
                            header.size
                        ))
                    })?;
                    log::trace!(
                        "header at offset {}: {} ({} bytes)",
                        offset,
                        header.relative_path(),
                        size
                    );
                    self.pending = Some(Pending {
                        header,
                        block,
                        offset,
                        size,
                    });
                }
                Some(pending) => {
                    if available < pending.size {
                        self.pending = Some(pending);
                        break;
                    }
                    let data = self.buffer[pos..pos + pending.size].to_vec();
                    pos += pending.size;
                    self.skip = padding_len(pending.header.size);

                    let info = pending.header.to_info();
                    log::debug!(
                        "decoded {} {} ({} bytes) at offset {}",
                        info.kind,
                        info.relative_path,
                        info.size,
                        pending.offset
                    );
                    entries.push(TarEntry::loaded(info, pending.block, data));
                    self.emitted += 1;
                }
            }
        }

        self.buffer.drain(..pos);
        self.offset += pos as u64;
        Ok(entries)
    }

    /// Signal end of input.
    ///
    /// Fails with [`UstarError::TruncatedArchive`] if a header is still
    /// waiting for its body or non-zero bytes are left over. Trailing zero
    /// bytes and a missing final padding are tolerated.
    pub fn finish(self) -> Result<()> {
        if let Some(pending) = self.pending {
            return Err(UstarError::truncated(
                pending.offset,
                (BLOCK_SIZE + pending.size) as u64,
                (BLOCK_SIZE + self.buffer.len()) as u64,
            ));
        }
        if !is_zero_block(&self.buffer) {
            return Err(UstarError::truncated(
                self.offset,
                BLOCK_SIZE as u64,
                self.buffer.len() as u64,
            ));
        }
        if self.skip > 0 {
            log::debug!("archive ends {} bytes short of its final padding", self.skip);
        }
        Ok(())
    }
}
