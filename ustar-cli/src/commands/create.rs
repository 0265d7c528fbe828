//! Create command implementation.

use crate::utils::is_gzip_name;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use ustar_archive::{StreamOptions, Tarball};
use ustar_core::{EntryData, EntryInfo};

pub fn cmd_create(
    archive: &Path,
    paths: &[PathBuf],
    gzip: bool,
    end_marker: bool,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let gzip = gzip || is_gzip_name(archive);
    let mut tarball = Tarball::new();

    for path in paths {
        let base = path.parent().unwrap_or(Path::new(""));
        add_path(&mut tarball, path, base, verbose)?;
    }

    let count = tarball.len();
    let options = StreamOptions::default()
        .with_gzip(gzip)
        .with_end_marker(end_marker);

    let mut writer = BufWriter::new(File::create(archive)?);
    let written = tarball.write_to(&mut writer, options)?;
    writer.flush()?;

    println!(
        "Created {} ({} entries, {} bytes{})",
        archive.display(),
        count,
        written,
        if gzip { ", gzip" } else { "" }
    );
    Ok(())
}

/// Archive name of `path` relative to `base`: normal components only,
/// joined with forward slashes.
fn archive_name(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn add_path(
    tarball: &mut Tarball,
    path: &Path,
    base: &Path,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let meta = fs::symlink_metadata(path)?;
    let name = archive_name(path, base);
    let info = with_fs_metadata(EntryInfo::file(&name), &meta);

    if meta.file_type().is_symlink() {
        let target = fs::read_link(path)?;
        let info = EntryInfo {
            kind: ustar_core::EntryKind::Symlink,
            linkname: Some(target.to_string_lossy().into_owned()),
            ..info
        };
        tarball.append(Some(EntryData::empty()), info)?;
        if verbose {
            println!("  Added: {} -> {}", name, target.display());
        }
    } else if meta.is_dir() {
        let info = EntryInfo {
            kind: ustar_core::EntryKind::Directory,
            ..info
        };
        if !name.is_empty() && !tarball.contains(&name) {
            tarball.append(None, info)?;
            if verbose {
                println!("  Added: {}/", name);
            }
        }

        let mut children: Vec<_> = fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<_, _>>()?;
        children.sort();
        for child in children {
            add_path(tarball, &child, base, verbose)?;
        }
    } else if meta.is_file() {
        // opened when its body is streamed, so only one file is open at a time
        tarball.append(Some(EntryData::path(path)), info)?;
        if verbose {
            println!("  Added: {} ({} bytes)", name, meta.len());
        }
    } else {
        log::warn!("skipping special file {}", path.display());
    }
    Ok(())
}

#[cfg(unix)]
fn with_fs_metadata(info: EntryInfo, meta: &fs::Metadata) -> EntryInfo {
    use std::os::unix::fs::MetadataExt;
    let info = info
        .with_mode(meta.mode() & 0o7777)
        .with_ids(meta.uid(), meta.gid());
    match meta.modified() {
        Ok(mtime) => info.with_mtime(mtime),
        Err(_) => info,
    }
}

#[cfg(not(unix))]
fn with_fs_metadata(info: EntryInfo, meta: &fs::Metadata) -> EntryInfo {
    let info = if meta.permissions().readonly() {
        info.with_mode(if meta.is_dir() { 0o555 } else { 0o444 })
    } else {
        info
    };
    match meta.modified() {
        Ok(mtime) => info.with_mtime(mtime),
        Err(_) => info,
    }
}
