use std::io::Read;
use ustar_archive::tar::header::{BLOCK_SIZE, TarHeader, checksum};
use ustar_archive::{LoadOptions, StreamOptions, Tarball};
use ustar_core::{EntryKind, UstarError};

fn sample() -> Vec<u8> {
    let mut tarball = Tarball::new();
    tarball.add_file("dir/file.txt", "some file body").unwrap();
    let mut out = Vec::new();
    tarball
        .stream(StreamOptions::default())
        .read_to_end(&mut out)
        .unwrap();
    out
}

/// Rewrite the checksum of the header at `offset` after editing it.
fn reseal(bytes: &mut [u8], offset: usize) {
    let mut block = [0u8; BLOCK_SIZE];
    block.copy_from_slice(&bytes[offset..offset + BLOCK_SIZE]);
    let sum = checksum(&block);
    bytes[offset + 148..offset + 156].copy_from_slice(format!("{:06o}\0 ", sum).as_bytes());
}

#[test]
fn test_inverted_header_byte_is_detected() {
    let bytes = sample();
    for i in 0..BLOCK_SIZE {
        let mut corrupted = bytes.clone();
        corrupted[i] ^= 0xFF;
        let result = Tarball::load(&corrupted[..], LoadOptions::default());
        assert!(
            matches!(result, Err(UstarError::CorruptArchive { offset: 0, .. })),
            "byte {} not detected: {:?}",
            i,
            result.map(|t| t.len())
        );
    }
}

#[test]
fn test_checksum_padding_variants_load() -> Result<(), Box<dyn std::error::Error>> {
    let bytes = sample();
    assert_eq!(bytes[148], b'0');
    assert_eq!(&bytes[154..156], b"\0 ");
    let expected = Tarball::load(&bytes[..], LoadOptions::default())?.len();

    for (i, b) in [(154, b' '), (155, 0), (148, b' ')] {
        let mut variant = bytes.clone();
        variant[i] = b;
        let loaded = Tarball::load(&variant[..], LoadOptions::default())?;
        assert_eq!(loaded.len(), expected, "edit at byte {}", i);
    }

    // a digit after the padding is not a checksum
    let mut corrupted = bytes.clone();
    corrupted[155] = b'1';
    assert!(matches!(
        Tarball::load(&corrupted[..], LoadOptions::default()),
        Err(UstarError::CorruptArchive { offset: 0, .. })
    ));
    Ok(())
}

#[test]
fn test_second_header_corruption_reports_offset() {
    let mut bytes = sample();
    bytes[BLOCK_SIZE + 3] ^= 0x01;
    match Tarball::load(&bytes[..], LoadOptions::default()) {
        Err(UstarError::CorruptArchive {
            offset,
            expected,
            computed,
        }) => {
            assert_eq!(offset, BLOCK_SIZE as u64);
            assert_ne!(expected, computed);
        }
        other => panic!("unexpected result: {:?}", other.map(|t| t.len())),
    }
}

#[test]
fn test_truncated_input() {
    let bytes = sample();
    // inside the second header
    let result = Tarball::load(&bytes[..BLOCK_SIZE + 200], LoadOptions::default());
    assert!(matches!(
        result,
        Err(UstarError::TruncatedArchive {
            offset: 512,
            expected: 512,
            available: 200
        })
    ));

    // inside the file body
    let result = Tarball::load(&bytes[..BLOCK_SIZE * 2 + 4], LoadOptions::default());
    assert!(matches!(
        result,
        Err(UstarError::TruncatedArchive {
            offset: 512,
            expected: 526,
            available: 516
        })
    ));
}

#[test]
fn test_wrong_magic() {
    let mut bytes = sample();
    bytes[257..263].copy_from_slice(b"notar\0");
    reseal(&mut bytes, 0);
    let result = Tarball::load(&bytes[..], LoadOptions::default());
    assert!(matches!(
        result,
        Err(UstarError::UnsupportedFormat { ref magic }) if magic == b"notar\0"
    ));
}

#[test]
fn test_unknown_typeflag_is_file() {
    let mut bytes = sample();
    for flag in [b'x', b'g', b'L', 0u8, b'Z'] {
        bytes[BLOCK_SIZE + 156] = flag;
        reseal(&mut bytes, BLOCK_SIZE);
        let loaded = Tarball::load(&bytes[..], LoadOptions::default()).unwrap();
        let entry = loaded.entries().nth(1).unwrap();
        assert_eq!(entry.info().kind, EntryKind::File);
        assert_eq!(entry.data(), Some(&b"some file body"[..]));
    }
}

#[test]
fn test_invalid_octal_after_valid_checksum() {
    let mut bytes = sample();
    bytes[BLOCK_SIZE + 124] = b'9';
    reseal(&mut bytes, BLOCK_SIZE);
    let result = Tarball::load(&bytes[..], LoadOptions::default());
    assert!(matches!(result, Err(UstarError::InvalidHeader { .. })));
}

#[test]
fn test_gnu_directory_slash_accepted() {
    let mut bytes = sample();
    // "dir" -> "dir/" as GNU tar writes it
    bytes[3] = b'/';
    reseal(&mut bytes, 0);
    let loaded = Tarball::load(&bytes[..], LoadOptions::default()).unwrap();
    let dir = loaded.entries().next().unwrap().info();
    assert_eq!(dir.kind, EntryKind::Directory);
    assert_eq!(dir.relative_path, "dir");

    let block: [u8; BLOCK_SIZE] = bytes[..BLOCK_SIZE].try_into().unwrap();
    assert_eq!(TarHeader::decode(&block).unwrap().name, "dir/");
}

#[test]
fn test_gzip_flag_on_plain_input_fails() {
    let bytes = sample();
    assert!(matches!(
        Tarball::load(&bytes[..], LoadOptions::gzip()),
        Err(UstarError::Io(_))
    ));
}
