//! Streaming extraction.
//!
//! [`walk`] visits an archive header by header and hands each body out as a
//! bounded reader, so entries are never buffered whole. [`unpack`] builds on
//! it to materialize an archive under a destination directory.

use super::LoadOptions;
use super::header::{BLOCK_SIZE, TarHeader, is_zero_block, padding_len};
use crate::gzip;
use filetime::FileTime;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path};
use ustar_core::entry::{EntryKind, TarEntryInfo};
use ustar_core::error::{Result, UstarError};

/// Options for [`unpack`].
#[derive(Debug, Clone, Copy)]
pub struct UnpackOptions {
    /// Input is gzip-compressed.
    pub gzip: bool,
    /// Restore permission bits (unix only).
    pub preserve_permissions: bool,
    /// Restore modification times.
    pub preserve_mtime: bool,
}

impl Default for UnpackOptions {
    fn default() -> Self {
        Self {
            gzip: false,
            preserve_permissions: true,
            preserve_mtime: true,
        }
    }
}

impl UnpackOptions {
    /// Enable or disable gzip.
    pub fn with_gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }

    /// Enable or disable permission restoring.
    pub fn with_permissions(mut self, preserve: bool) -> Self {
        self.preserve_permissions = preserve;
        self
    }

    /// Enable or disable mtime restoring.
    pub fn with_mtime(mut self, preserve: bool) -> Self {
        self.preserve_mtime = preserve;
        self
    }
}

/// Visit every entry of an archive in order.
///
/// The callback receives the entry metadata and a reader limited to the
/// entry body; whatever it leaves unread is skipped. Returns the number of
/// entries visited.
pub fn walk<R, F>(reader: R, options: &LoadOptions, f: F) -> Result<usize>
where
    R: Read,
    F: FnMut(&TarEntryInfo, &mut dyn Read) -> Result<()>,
{
    if options.gzip {
        walk_plain(gzip::decoder(reader), f)
    } else {
        walk_plain(reader, f)
    }
}

fn walk_plain<R, F>(mut reader: R, mut f: F) -> Result<usize>
where
    R: Read,
    F: FnMut(&TarEntryInfo, &mut dyn Read) -> Result<()>,
{
    let mut block = [0u8; BLOCK_SIZE];
    let mut offset = 0u64;
    let mut visited = 0usize;

    loop {
        let n = read_full(&mut reader, &mut block)?;
        if n == 0 {
            break;
        }
        if n < BLOCK_SIZE {
            if is_zero_block(&block[..n]) {
                break;
            }
            return Err(UstarError::truncated(offset, BLOCK_SIZE as u64, n as u64));
        }

        let header_offset = offset;
        offset += BLOCK_SIZE as u64;
        if is_zero_block(&block) {
            continue;
        }

        let info = TarHeader::decode_at(&block, header_offset)?.to_info();
        log::trace!("walking {} at offset {}", info.relative_path, header_offset);

        let mut body = (&mut reader).take(info.size);
        f(&info, &mut body)?;
        io::copy(&mut body, &mut io::sink())?;

        let missing = body.limit();
        if missing > 0 {
            return Err(UstarError::truncated(
                header_offset,
                BLOCK_SIZE as u64 + info.size,
                BLOCK_SIZE as u64 + info.size - missing,
            ));
        }
        offset += info.size;

        let pad = padding_len(info.size);
        let skipped = read_full(&mut reader, &mut block[..pad])?;
        offset += skipped as u64;
        visited += 1;

        if skipped < pad {
            log::debug!("archive ends {} bytes short of its final padding", pad - skipped);
            break;
        }
    }

    Ok(visited)
}

/// Read until `buf` is full or the input ends; returns the bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Extract an archive under `dest`.
///
/// Directories and regular files are created, symlinks too on unix; hard
/// links, devices and fifos are skipped with a warning. Returns the
/// metadata of every materialized entry.
pub fn unpack<R: Read>(
    reader: R,
    dest: &Path,
    options: &UnpackOptions,
) -> Result<Vec<TarEntryInfo>> {
    fs::create_dir_all(dest)?;

    let mut extracted = Vec::new();
    let mut directories = Vec::new();
    let load = LoadOptions::default().with_gzip(options.gzip);

    walk(reader, &load, |info, body| {
        info.validate_path()?;
        check_ancestors(dest, &info.relative_path)?;
        let target = dest.join(&info.relative_path);

        match info.kind {
            EntryKind::Directory => {
                fs::create_dir_all(&target)?;
                directories.push(info.clone());
            }
            EntryKind::File | EntryKind::ContiguousFile => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                remove_symlink(&target)?;
                let mut file = File::create(&target)?;
                io::copy(body, &mut file)?;
                drop(file);
                apply_metadata(&target, info, options)?;
            }
            EntryKind::Symlink => {
                if !create_symlink(&target, &info.linkname)? {
                    return Ok(());
                }
            }
            other => {
                log::warn!("skipping {} entry {}", other, info.relative_path);
                return Ok(());
            }
        }

        log::debug!("extracted {}", info.relative_path);
        extracted.push(info.clone());
        Ok(())
    })?;

    // Directory times would be clobbered by writing their children.
    for info in directories.iter().rev() {
        apply_metadata(&dest.join(&info.relative_path), info, options)?;
    }

    Ok(extracted)
}

/// Refuse to write through a symlink that an earlier entry planted.
fn check_ancestors(dest: &Path, relative: &str) -> Result<()> {
    let mut current = dest.to_path_buf();
    let components: Vec<_> = Path::new(relative).components().collect();
    let parents = components.len().saturating_sub(1);

    for component in &components[..parents] {
        if let Component::Normal(part) = component {
            current.push(part);
            if fs::symlink_metadata(&current).is_ok_and(|m| m.file_type().is_symlink()) {
                return Err(UstarError::path_traversal(relative));
            }
        }
    }
    Ok(())
}

fn remove_symlink(path: &Path) -> Result<()> {
    if fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink()) {
        fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(unix)]
fn create_symlink(target: &Path, linkname: &str) -> Result<bool> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    remove_symlink(target)?;
    std::os::unix::fs::symlink(linkname, target)?;
    Ok(true)
}

#[cfg(not(unix))]
fn create_symlink(target: &Path, _linkname: &str) -> Result<bool> {
    log::warn!("symlinks unsupported here, skipping {}", target.display());
    Ok(false)
}

fn apply_metadata(path: &Path, info: &TarEntryInfo, options: &UnpackOptions) -> Result<()> {
    #[cfg(unix)]
    if options.preserve_permissions {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(info.mode & 0o7777))?;
    }

    if options.preserve_mtime {
        filetime::set_file_mtime(path, FileTime::from_system_time(info.mtime))?;
    }
    Ok(())
}
