//! USTAR header encoding and decoding.
//!
//! A header is a fixed 512-byte record of fixed-width ASCII fields. The
//! layout lives in [`LAYOUT`], a static table that both [`TarHeader::to_block`]
//! and [`TarHeader::decode_at`] walk in order.

use std::ops::Range;
use std::time::{Duration, UNIX_EPOCH};
use ustar_core::entry::{self, EntryKind, TarEntryInfo};
use ustar_core::error::{Result, UstarError};

/// TAR block size.
pub const BLOCK_SIZE: usize = 512;

/// Maximum length of the name field.
pub const NAME_LEN: usize = 100;

/// Maximum length of the prefix field.
pub const PREFIX_LEN: usize = 155;

/// Magic written into every header.
pub const USTAR_MAGIC: &[u8; 6] = b"ustar\0";

/// Version written into every header.
pub const USTAR_VERSION: &[u8; 2] = b"00";

/// Header field identifiers, in on-disk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldId {
    /// Path suffix.
    Name,
    /// Permission bits.
    Mode,
    /// Owner user id.
    Uid,
    /// Owner group id.
    Gid,
    /// Body size.
    Size,
    /// Modification time.
    Mtime,
    /// Header checksum.
    Checksum,
    /// Entry kind.
    Typeflag,
    /// Link target.
    Linkname,
    /// `"ustar\0"`.
    Magic,
    /// `"00"`.
    Version,
    /// Owner user name.
    Uname,
    /// Owner group name.
    Gname,
    /// Device major number.
    DevMajor,
    /// Device minor number.
    DevMinor,
    /// Path prefix.
    Prefix,
    /// Reserved, zero-filled.
    Padding,
}

/// How a field is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// NUL-padded ASCII string.
    Text,
    /// Zero-padded octal number, NUL-terminated.
    Octal,
    /// `"%06o\0 "`.
    Checksum,
    /// Single typeflag byte.
    Flag,
    /// Fixed constant bytes.
    Constant,
    /// Zero bytes.
    Reserved,
}

/// A header field descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Field identifier.
    pub id: FieldId,
    /// Byte offset within the header.
    pub offset: usize,
    /// Field width in bytes.
    pub len: usize,
    /// Encoding.
    pub kind: FieldKind,
}

impl Field {
    const fn new(id: FieldId, offset: usize, len: usize, kind: FieldKind) -> Self {
        Self {
            id,
            offset,
            len,
            kind,
        }
    }

    /// Byte range of this field within a header block.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// The USTAR header layout.
pub const LAYOUT: [Field; 17] = [
    Field::new(FieldId::Name, 0, 100, FieldKind::Text),
    Field::new(FieldId::Mode, 100, 8, FieldKind::Octal),
    Field::new(FieldId::Uid, 108, 8, FieldKind::Octal),
    Field::new(FieldId::Gid, 116, 8, FieldKind::Octal),
    Field::new(FieldId::Size, 124, 12, FieldKind::Octal),
    Field::new(FieldId::Mtime, 136, 12, FieldKind::Octal),
    Field::new(FieldId::Checksum, 148, 8, FieldKind::Checksum),
    Field::new(FieldId::Typeflag, 156, 1, FieldKind::Flag),
    Field::new(FieldId::Linkname, 157, 100, FieldKind::Text),
    Field::new(FieldId::Magic, 257, 6, FieldKind::Constant),
    Field::new(FieldId::Version, 263, 2, FieldKind::Constant),
    Field::new(FieldId::Uname, 265, 32, FieldKind::Text),
    Field::new(FieldId::Gname, 297, 32, FieldKind::Text),
    Field::new(FieldId::DevMajor, 329, 8, FieldKind::Octal),
    Field::new(FieldId::DevMinor, 337, 8, FieldKind::Octal),
    Field::new(FieldId::Prefix, 345, 155, FieldKind::Text),
    Field::new(FieldId::Padding, 500, 12, FieldKind::Reserved),
];

const CHECKSUM_FIELD: Range<usize> = 148..156;
const MAGIC_FIELD: Range<usize> = 257..263;

/// Compute the header checksum: the unsigned sum of all bytes with the
/// checksum field counted as eight spaces.
pub fn checksum(block: &[u8; BLOCK_SIZE]) -> u32 {
    block
        .iter()
        .enumerate()
        .map(|(i, &b)| {
            if CHECKSUM_FIELD.contains(&i) {
                b' ' as u32
            } else {
                b as u32
            }
        })
        .sum()
}

/// Check for an all-zero block (end-of-archive marker or record padding).
pub fn is_zero_block(block: &[u8]) -> bool {
    block.iter().all(|&b| b == 0)
}

/// Number of zero bytes that follow a body of `size` bytes.
pub fn padding_len(size: u64) -> usize {
    ((BLOCK_SIZE as u64 - size % BLOCK_SIZE as u64) % BLOCK_SIZE as u64) as usize
}

/// Split a path into `(prefix, name)` so that it fits the header.
///
/// Paths of at most 100 bytes go entirely into the name. Longer paths are
/// split at the rightmost `/` that leaves a prefix of at most 155 bytes.
pub fn split_path(path: &str) -> Result<(&str, &str)> {
    if path.len() <= NAME_LEN {
        return Ok(("", path));
    }

    let split = path
        .bytes()
        .enumerate()
        .rev()
        .find(|&(i, b)| b == b'/' && i <= PREFIX_LEN)
        .map(|(i, _)| i);

    match split {
        Some(pos) if pos > 0 => {
            let name = &path[pos + 1..];
            if name.is_empty() || name.len() > NAME_LEN {
                Err(UstarError::name_too_long(path))
            } else {
                Ok((&path[..pos], name))
            }
        }
        _ => Err(UstarError::name_too_long(path)),
    }
}

/// TAR header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TarHeader {
    /// Name field (path suffix).
    pub name: String,
    /// File mode.
    pub mode: u32,
    /// Owner UID.
    pub uid: u32,
    /// Owner GID.
    pub gid: u32,
    /// File size.
    pub size: u64,
    /// Modification time (seconds).
    pub mtime: u64,
    /// Checksum as stored (zero before encoding).
    pub checksum: u32,
    /// Type flag.
    pub typeflag: u8,
    /// Link name.
    pub linkname: String,
    /// Owner name.
    pub uname: String,
    /// Group name.
    pub gname: String,
    /// Device major number.
    pub dev_major: u32,
    /// Device minor number.
    pub dev_minor: u32,
    /// Prefix for long names.
    pub prefix: String,
}

impl TarHeader {
    /// Build a header from resolved entry metadata.
    pub fn from_info(info: &TarEntryInfo) -> Result<Self> {
        let (prefix, name) = split_path(&info.relative_path)?;

        if info.linkname.len() > NAME_LEN {
            return Err(UstarError::name_too_long(&info.linkname));
        }

        Ok(Self {
            name: name.to_string(),
            mode: info.mode,
            uid: info.uid,
            gid: info.gid,
            size: info.size,
            mtime: info.mtime_secs(),
            checksum: 0,
            typeflag: info.kind.typeflag(),
            linkname: info.linkname.clone(),
            uname: info.owner.clone(),
            gname: info.group.clone(),
            dev_major: info.dev_major,
            dev_minor: info.dev_minor,
            prefix: prefix.to_string(),
        })
    }

    /// Encode resolved entry metadata straight into a header block.
    pub fn encode(info: &TarEntryInfo) -> Result<[u8; BLOCK_SIZE]> {
        Self::from_info(info)?.to_block()
    }

    /// Convert header to a 512-byte block, computing the checksum.
    pub fn to_block(&self) -> Result<[u8; BLOCK_SIZE]> {
        let mut block = [0u8; BLOCK_SIZE];

        for field in &LAYOUT {
            let dst = &mut block[field.range()];
            match field.kind {
                FieldKind::Text => Self::write_string(dst, field.id, self.text(field.id))?,
                FieldKind::Octal => Self::write_octal(dst, field.id, self.number(field.id))?,
                FieldKind::Checksum => dst.copy_from_slice(b"        "),
                FieldKind::Flag => dst[0] = self.typeflag,
                FieldKind::Constant if field.id == FieldId::Magic => {
                    dst.copy_from_slice(USTAR_MAGIC)
                }
                FieldKind::Constant => dst.copy_from_slice(USTAR_VERSION),
                FieldKind::Reserved => {}
            }
        }

        let sum = checksum(&block);
        let checksum_str = format!("{:06o}\0 ", sum);
        block[CHECKSUM_FIELD].copy_from_slice(checksum_str.as_bytes());

        Ok(block)
    }

    /// Decode a header block found at the start of an archive.
    pub fn decode(block: &[u8; BLOCK_SIZE]) -> Result<Self> {
        Self::decode_at(block, 0)
    }

    /// Decode a header block found at `offset`, validating checksum and
    /// magic before trusting any field.
    pub fn decode_at(block: &[u8; BLOCK_SIZE], offset: u64) -> Result<Self> {
        let computed = checksum(block);
        let stored = Self::parse_checksum(&block[CHECKSUM_FIELD]);
        if stored != Some(computed) {
            return Err(UstarError::corrupt(offset, stored.unwrap_or(0), computed));
        }

        if &block[257..262] != b"ustar" {
            return Err(UstarError::unsupported_format(&block[MAGIC_FIELD]));
        }

        let mut header = Self {
            name: String::new(),
            mode: 0,
            uid: 0,
            gid: 0,
            size: 0,
            mtime: 0,
            checksum: computed,
            typeflag: 0,
            linkname: String::new(),
            uname: String::new(),
            gname: String::new(),
            dev_major: 0,
            dev_minor: 0,
            prefix: String::new(),
        };

        for field in &LAYOUT {
            let src = &block[field.range()];
            match field.kind {
                FieldKind::Text => header.set_text(field.id, Self::parse_string(src)),
                FieldKind::Octal => header.set_number(field.id, Self::parse_octal(src, field.id)?)?,
                FieldKind::Flag => header.typeflag = src[0],
                FieldKind::Checksum | FieldKind::Constant | FieldKind::Reserved => {}
            }
        }

        Ok(header)
    }

    /// Full path: prefix and name joined by `/`.
    pub fn relative_path(&self) -> String {
        let path = if self.prefix.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.prefix, self.name)
        };
        if self.kind().is_dir() && path.len() > 1 {
            path.trim_end_matches('/').to_string()
        } else {
            path
        }
    }

    /// Get entry kind.
    pub fn kind(&self) -> EntryKind {
        EntryKind::from_typeflag(self.typeflag)
    }

    /// Convert to resolved entry metadata.
    pub fn to_info(&self) -> TarEntryInfo {
        let relative_path = self.relative_path();
        TarEntryInfo {
            name: entry::basename(&relative_path).to_string(),
            kind: self.kind(),
            size: self.size,
            mtime: UNIX_EPOCH + Duration::from_secs(self.mtime),
            mode: self.mode,
            uid: self.uid,
            gid: self.gid,
            owner: self.uname.clone(),
            group: self.gname.clone(),
            linkname: self.linkname.clone(),
            dev_major: self.dev_major,
            dev_minor: self.dev_minor,
            relative_path,
        }
    }

    fn text(&self, id: FieldId) -> &str {
        match id {
            FieldId::Name => &self.name,
            FieldId::Linkname => &self.linkname,
            FieldId::Uname => &self.uname,
            FieldId::Gname => &self.gname,
            FieldId::Prefix => &self.prefix,
            _ => "",
        }
    }

    fn set_text(&mut self, id: FieldId, value: String) {
        match id {
            FieldId::Name => self.name = value,
            FieldId::Linkname => self.linkname = value,
            FieldId::Uname => self.uname = value,
            FieldId::Gname => self.gname = value,
            FieldId::Prefix => self.prefix = value,
            _ => {}
        }
    }

    fn number(&self, id: FieldId) -> u64 {
        match id {
            FieldId::Mode => self.mode as u64,
            FieldId::Uid => self.uid as u64,
            FieldId::Gid => self.gid as u64,
            FieldId::Size => self.size,
            FieldId::Mtime => self.mtime,
            FieldId::DevMajor => self.dev_major as u64,
            FieldId::DevMinor => self.dev_minor as u64,
            _ => 0,
        }
    }

    fn set_number(&mut self, id: FieldId, value: u64) -> Result<()> {
        let narrow = || {
            u32::try_from(value).map_err(|_| {
                UstarError::invalid_header(format!("{:?} value {} out of range", id, value))
            })
        };
        match id {
            FieldId::Mode => self.mode = narrow()?,
            FieldId::Uid => self.uid = narrow()?,
            FieldId::Gid => self.gid = narrow()?,
            FieldId::Size => self.size = value,
            FieldId::Mtime => self.mtime = value,
            FieldId::DevMajor => self.dev_major = narrow()?,
            FieldId::DevMinor => self.dev_minor = narrow()?,
            _ => {}
        }
        Ok(())
    }

    /// Write a NUL-padded string to a field. A string that fills the field
    /// exactly is stored without terminator.
    fn write_string(field: &mut [u8], id: FieldId, s: &str) -> Result<()> {
        let bytes = s.as_bytes();
        if bytes.contains(&0) {
            return Err(UstarError::invalid_input(format!(
                "{:?} contains a NUL byte",
                id
            )));
        }
        if bytes.len() > field.len() {
            return Err(match id {
                FieldId::Name | FieldId::Prefix | FieldId::Linkname => {
                    UstarError::name_too_long(s)
                }
                _ => UstarError::invalid_input(format!(
                    "{:?} {:?} exceeds {} bytes",
                    id,
                    s,
                    field.len()
                )),
            });
        }
        field[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Write an octal number to a field: `width - 1` zero-padded digits and
    /// a NUL.
    fn write_octal(field: &mut [u8], id: FieldId, value: u64) -> Result<()> {
        let digits = field.len() - 1;
        let s = format!("{:0width$o}", value, width = digits);
        if s.len() > digits {
            return Err(UstarError::invalid_input(format!(
                "{:?} value {} does not fit in {} octal digits",
                id, value, digits
            )));
        }
        field[..digits].copy_from_slice(s.as_bytes());
        field[digits] = 0;
        Ok(())
    }

    /// Parse a null-terminated string.
    fn parse_string(data: &[u8]) -> String {
        let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
        String::from_utf8_lossy(&data[..end]).into_owned()
    }

    /// Parse an octal number, ignoring leading spaces and trailing NUL or
    /// space padding. An empty field reads as zero.
    fn parse_octal(data: &[u8], id: FieldId) -> Result<u64> {
        let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
        let s = String::from_utf8_lossy(&data[..end]);
        let s = s.trim_matches(' ');
        if s.is_empty() {
            return Ok(0);
        }
        u64::from_str_radix(s, 8)
            .map_err(|_| UstarError::invalid_header(format!("Invalid octal in {:?}: {:?}", id, s)))
    }

    /// Parse the stored checksum: optional leading spaces, octal digits, then
    /// only NUL or space padding.
    ///
    /// Writers disagree on the layout (`"004321\0 "`, `"004321 \0"`,
    /// `" 04321\0 "`, `"  4321  "`), so all of these decode to the same
    /// value. The field counts as spaces in the sum, which means swapping
    /// padding bytes or a leading zero for a space is not a detectable
    /// change. Any other byte in the field fails the parse.
    fn parse_checksum(data: &[u8]) -> Option<u32> {
        let start = data.iter().position(|&b| b != b' ')?;
        let digits = data[start..]
            .iter()
            .take_while(|b| (b'0'..=b'7').contains(b))
            .count();
        if digits == 0 {
            return None;
        }
        let rest = &data[start + digits..];
        if !rest.iter().all(|&b| b == 0 || b == b' ') {
            return None;
        }
        let s = std::str::from_utf8(&data[start..start + digits]).ok()?;
        u32::from_str_radix(s, 8).ok()
    }
}
