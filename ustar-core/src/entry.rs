//! Archive entry metadata.
//!
//! [`EntryInfo`] is what callers hand to `append`; every field except the
//! kind and the path is optional. [`TarEntryInfo`] is the resolved form that
//! the archive stores and exposes, with all defaults applied.

use crate::error::{Result, UstarError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Default mode for file-like entries.
pub const DEFAULT_FILE_MODE: u32 = 0o666;

/// Default mode for directories.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// Entry kind, one per USTAR typeflag digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EntryKind {
    /// Regular file (`'0'`).
    #[default]
    File,
    /// Hard link (`'1'`).
    Link,
    /// Symbolic link (`'2'`).
    Symlink,
    /// Character device (`'3'`).
    CharacterDevice,
    /// Block device (`'4'`).
    BlockDevice,
    /// Directory (`'5'`).
    Directory,
    /// Named pipe (`'6'`).
    Fifo,
    /// Contiguous file (`'7'`).
    ContiguousFile,
}

impl EntryKind {
    /// All kinds, in typeflag order.
    pub const ALL: [EntryKind; 8] = [
        Self::File,
        Self::Link,
        Self::Symlink,
        Self::CharacterDevice,
        Self::BlockDevice,
        Self::Directory,
        Self::Fifo,
        Self::ContiguousFile,
    ];

    /// The typeflag byte written for this kind.
    pub fn typeflag(&self) -> u8 {
        match self {
            Self::File => b'0',
            Self::Link => b'1',
            Self::Symlink => b'2',
            Self::CharacterDevice => b'3',
            Self::BlockDevice => b'4',
            Self::Directory => b'5',
            Self::Fifo => b'6',
            Self::ContiguousFile => b'7',
        }
    }

    /// Map a typeflag byte to a kind.
    ///
    /// Unrecognized bytes (vendor extensions, PAX and GNU records, the legacy
    /// NUL flag) degrade to [`EntryKind::File`].
    pub fn from_typeflag(flag: u8) -> Self {
        match flag {
            b'1' => Self::Link,
            b'2' => Self::Symlink,
            b'3' => Self::CharacterDevice,
            b'4' => Self::BlockDevice,
            b'5' => Self::Directory,
            b'6' => Self::Fifo,
            b'7' => Self::ContiguousFile,
            _ => Self::File,
        }
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory)
    }

    /// Check if this kind carries file content.
    pub fn is_file_like(&self) -> bool {
        matches!(self, Self::File | Self::ContiguousFile)
    }

    /// Default permission bits for this kind.
    pub fn default_mode(&self) -> u32 {
        if self.is_dir() {
            DEFAULT_DIR_MODE
        } else {
            DEFAULT_FILE_MODE
        }
    }

    /// Get the kind name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Link => "link",
            Self::Symlink => "symlink",
            Self::CharacterDevice => "character-device",
            Self::BlockDevice => "block-device",
            Self::Directory => "directory",
            Self::Fifo => "fifo",
            Self::ContiguousFile => "contiguous-file",
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Caller-supplied metadata for an entry about to be appended.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntryInfo {
    /// Entry kind.
    pub kind: EntryKind,
    /// Path of the entry inside the archive.
    pub relative_path: String,
    /// Body size; required for stream sources.
    pub size: Option<u64>,
    /// Modification time; defaults to the time of `append`.
    pub mtime: Option<SystemTime>,
    /// Permission bits; defaults per kind.
    pub mode: Option<u32>,
    /// Owner user id.
    pub uid: Option<u32>,
    /// Owner group id.
    pub gid: Option<u32>,
    /// Owner user name.
    pub owner: Option<String>,
    /// Owner group name.
    pub group: Option<String>,
    /// Link target for links and symlinks.
    pub linkname: Option<String>,
    /// Device major number.
    pub dev_major: Option<u32>,
    /// Device minor number.
    pub dev_minor: Option<u32>,
}

impl EntryInfo {
    /// Create metadata for an entry of the given kind.
    pub fn new(kind: EntryKind, relative_path: impl Into<String>) -> Self {
        Self {
            kind,
            relative_path: relative_path.into(),
            ..Self::default()
        }
    }

    /// Create metadata for a regular file.
    pub fn file(relative_path: impl Into<String>) -> Self {
        Self::new(EntryKind::File, relative_path)
    }

    /// Create metadata for a directory.
    pub fn directory(relative_path: impl Into<String>) -> Self {
        Self::new(EntryKind::Directory, relative_path)
    }

    /// Create metadata for a symbolic link.
    pub fn symlink(relative_path: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(EntryKind::Symlink, relative_path).with_linkname(target)
    }

    /// Builder method to set the size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Builder method to set modification time.
    pub fn with_mtime(mut self, mtime: SystemTime) -> Self {
        self.mtime = Some(mtime);
        self
    }

    /// Builder method to set permission bits.
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Builder method to set numeric owner ids.
    pub fn with_ids(mut self, uid: u32, gid: u32) -> Self {
        self.uid = Some(uid);
        self.gid = Some(gid);
        self
    }

    /// Builder method to set owner names.
    pub fn with_names(mut self, owner: impl Into<String>, group: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self.group = Some(group.into());
        self
    }

    /// Builder method to set the link target.
    pub fn with_linkname(mut self, target: impl Into<String>) -> Self {
        self.linkname = Some(target.into());
        self
    }

    /// Builder method to set device numbers.
    pub fn with_device(mut self, major: u32, minor: u32) -> Self {
        self.dev_major = Some(major);
        self.dev_minor = Some(minor);
        self
    }

    /// Apply defaults and produce the stored metadata.
    ///
    /// `size` is the resolved body size and `now` the append time used when
    /// no mtime was given.
    pub fn resolve(&self, size: u64, now: SystemTime) -> Result<TarEntryInfo> {
        let relative_path = normalize_path(&self.relative_path)?;
        Ok(TarEntryInfo {
            name: basename(&relative_path).to_string(),
            kind: self.kind,
            size,
            mtime: truncate_to_secs(self.mtime.unwrap_or(now)),
            mode: self.mode.unwrap_or_else(|| self.kind.default_mode()),
            uid: self.uid.unwrap_or(0),
            gid: self.gid.unwrap_or(0),
            owner: self.owner.clone().unwrap_or_default(),
            group: self.group.clone().unwrap_or_default(),
            linkname: self.linkname.clone().unwrap_or_default(),
            dev_major: self.dev_major.unwrap_or(0),
            dev_minor: self.dev_minor.unwrap_or(0),
            relative_path,
        })
    }
}

/// Resolved metadata of an entry stored in an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TarEntryInfo {
    /// Last path component.
    pub name: String,
    /// Entry kind.
    pub kind: EntryKind,
    /// Full path inside the archive, without a trailing slash.
    pub relative_path: String,
    /// Body size in bytes.
    pub size: u64,
    /// Modification time, whole seconds.
    pub mtime: SystemTime,
    /// Permission bits.
    pub mode: u32,
    /// Owner user id.
    pub uid: u32,
    /// Owner group id.
    pub gid: u32,
    /// Owner user name.
    pub owner: String,
    /// Owner group name.
    pub group: String,
    /// Link target (empty unless a link).
    pub linkname: String,
    /// Device major number.
    pub dev_major: u32,
    /// Device minor number.
    pub dev_minor: u32,
}

impl TarEntryInfo {
    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Modification time as seconds since the Unix epoch.
    pub fn mtime_secs(&self) -> u64 {
        self.mtime
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    /// Validate the entry path for extraction.
    ///
    /// Returns an error for absolute paths and `..` components.
    pub fn validate_path(&self) -> Result<()> {
        let path = std::path::Path::new(&self.relative_path);

        if path.is_absolute() || self.relative_path.starts_with('/') {
            return Err(UstarError::path_traversal(&self.relative_path));
        }

        for component in path.components() {
            match component {
                std::path::Component::ParentDir
                | std::path::Component::RootDir
                | std::path::Component::Prefix(_) => {
                    return Err(UstarError::path_traversal(&self.relative_path));
                }
                _ => {}
            }
        }

        Ok(())
    }
}

impl std::fmt::Display for TarEntryInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let type_char = match self.kind {
            EntryKind::Directory => 'd',
            EntryKind::Symlink => 'l',
            EntryKind::Link => 'h',
            EntryKind::CharacterDevice => 'c',
            EntryKind::BlockDevice => 'b',
            EntryKind::Fifo => 'p',
            _ => '-',
        };
        write!(
            f,
            "{}{:04o} {:>8}/{:<8} {:>10} {}",
            type_char,
            self.mode & 0o7777,
            display_owner(&self.owner, self.uid),
            display_owner(&self.group, self.gid),
            self.size,
            self.relative_path
        )
    }
}

fn display_owner(name: &str, id: u32) -> String {
    if name.is_empty() {
        id.to_string()
    } else {
        name.to_string()
    }
}

/// Normalize an archive path: strip trailing slashes, reject empty paths and
/// NUL bytes.
pub fn normalize_path(path: &str) -> Result<String> {
    if path.contains('\0') {
        return Err(UstarError::invalid_input(format!(
            "path contains a NUL byte: {:?}",
            path
        )));
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(UstarError::invalid_input(format!(
            "empty entry path: {:?}",
            path
        )));
    }
    Ok(trimmed.to_string())
}

/// Last component of a slash-separated path.
pub fn basename(path: &str) -> &str {
    match path.rfind('/') {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

/// Everything before the last slash, or `None` at the top level.
pub fn dirname(path: &str) -> Option<&str> {
    path.rfind('/').map(|pos| &path[..pos]).filter(|d| !d.is_empty())
}

/// Ancestor directories of `path`, outermost first.
///
/// `"x/y/z.txt"` yields `["x", "x/y"]`.
pub fn ancestors(path: &str) -> Vec<&str> {
    let mut dirs = Vec::new();
    let mut current = dirname(path);
    while let Some(dir) = current {
        dirs.push(dir);
        current = dirname(dir);
    }
    dirs.reverse();
    dirs
}

/// Drop sub-second precision; USTAR stores whole seconds.
pub fn truncate_to_secs(time: SystemTime) -> SystemTime {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => UNIX_EPOCH + Duration::from_secs(d.as_secs()),
        Err(_) => UNIX_EPOCH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typeflag_mapping() {
        for kind in EntryKind::ALL {
            assert_eq!(EntryKind::from_typeflag(kind.typeflag()), kind);
        }
        assert_eq!(EntryKind::from_typeflag(0), EntryKind::File);
        assert_eq!(EntryKind::from_typeflag(b'x'), EntryKind::File);
        assert_eq!(EntryKind::from_typeflag(b'L'), EntryKind::File);
    }

    #[test]
    fn test_default_modes() {
        assert_eq!(EntryKind::File.default_mode(), 0o666);
        assert_eq!(EntryKind::Symlink.default_mode(), 0o666);
        assert_eq!(EntryKind::Directory.default_mode(), 0o755);
    }

    #[test]
    fn test_resolve_defaults() {
        let now = UNIX_EPOCH + Duration::from_millis(1_700_000_000_750);
        let info = EntryInfo::file("docs/readme.txt").resolve(12, now).unwrap();

        assert_eq!(info.name, "readme.txt");
        assert_eq!(info.relative_path, "docs/readme.txt");
        assert_eq!(info.size, 12);
        assert_eq!(info.mode, 0o666);
        assert_eq!(info.uid, 0);
        assert_eq!(info.owner, "");
        assert_eq!(info.mtime_secs(), 1_700_000_000);
    }

    #[test]
    fn test_resolve_keeps_given_fields() {
        let mtime = UNIX_EPOCH + Duration::from_secs(42);
        let info = EntryInfo::directory("a/b/")
            .with_mode(0o700)
            .with_ids(1000, 100)
            .with_names("alice", "users")
            .with_mtime(mtime)
            .resolve(0, SystemTime::now())
            .unwrap();

        assert_eq!(info.relative_path, "a/b");
        assert_eq!(info.mode, 0o700);
        assert_eq!((info.uid, info.gid), (1000, 100));
        assert_eq!(info.owner, "alice");
        assert_eq!(info.mtime, mtime);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("a/b/").unwrap(), "a/b");
        assert!(normalize_path("").is_err());
        assert!(normalize_path("///").is_err());
        assert!(normalize_path("a\0b").is_err());
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(basename("x/y/z.txt"), "z.txt");
        assert_eq!(basename("z.txt"), "z.txt");
        assert_eq!(dirname("x/y/z.txt"), Some("x/y"));
        assert_eq!(dirname("z.txt"), None);
        assert_eq!(ancestors("x/y/z.txt"), vec!["x", "x/y"]);
        assert!(ancestors("top").is_empty());
    }

    #[test]
    fn test_validate_path() {
        let now = SystemTime::now();
        let safe = EntryInfo::file("sub/file.txt").resolve(0, now).unwrap();
        assert!(safe.validate_path().is_ok());

        let parent = EntryInfo::file("sub/../../etc/passwd").resolve(0, now).unwrap();
        assert!(parent.validate_path().is_err());

        let absolute = EntryInfo::file("/etc/passwd").resolve(0, now).unwrap();
        assert!(absolute.validate_path().is_err());
    }

    #[test]
    fn test_display() {
        let info = EntryInfo::file("a.txt")
            .with_mode(0o644)
            .resolve(5, UNIX_EPOCH)
            .unwrap();
        let line = info.to_string();
        assert!(line.starts_with("-0644"));
        assert!(line.ends_with("a.txt"));
    }
}
