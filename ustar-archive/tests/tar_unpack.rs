use std::fs;
use std::io::Read;
use ustar_archive::tar::LoadOptions;
use ustar_archive::{StreamOptions, Tarball, UnpackOptions, unpack, walk};
use ustar_core::{EntryData, EntryInfo, EntryKind, UstarError};

fn archive(tarball: Tarball, options: StreamOptions) -> Vec<u8> {
    let mut out = Vec::new();
    tarball.write_to(&mut out, options).unwrap();
    out
}

#[test]
fn test_unpack_gzip_tree() -> Result<(), Box<dyn std::error::Error>> {
    let _ = env_logger::builder().is_test(true).try_init();
    let dest = tempfile::tempdir()?;

    let mut tarball = Tarball::new();
    tarball.add_file("site/index.html", "<h1>hi</h1>")?;
    tarball.add_file("site/css/main.css", "body{}")?;
    tarball.add_directory("site/empty")?;
    tarball.append(
        Some(EntryData::empty()),
        EntryInfo::new(EntryKind::Fifo, "site/pipe"),
    )?;
    let bytes = archive(tarball, StreamOptions::gzip().with_end_marker(true));

    let extracted = unpack(&bytes[..], dest.path(), &UnpackOptions::default().with_gzip(true))?;
    let paths: Vec<_> = extracted.iter().map(|i| i.relative_path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "site",
            "site/index.html",
            "site/css",
            "site/css/main.css",
            "site/empty"
        ]
    );

    assert_eq!(
        fs::read_to_string(dest.path().join("site/index.html"))?,
        "<h1>hi</h1>"
    );
    assert_eq!(
        fs::read_to_string(dest.path().join("site/css/main.css"))?,
        "body{}"
    );
    assert!(dest.path().join("site/empty").is_dir());
    assert!(!dest.path().join("site/pipe").exists());
    Ok(())
}

#[test]
fn test_unpack_rejects_parent_components() {
    let dest = tempfile::tempdir().unwrap();
    let mut tarball = Tarball::new();
    tarball.add_file("../escape.txt", "nope").unwrap();
    let bytes = archive(tarball, StreamOptions::default());

    let err = unpack(&bytes[..], dest.path(), &UnpackOptions::default()).unwrap_err();
    assert!(matches!(err, UstarError::PathTraversal { .. }));
    assert!(!dest.path().join("../escape.txt").exists());
}

#[test]
fn test_unpack_rejects_absolute_paths() {
    let dest = tempfile::tempdir().unwrap();
    let mut tarball = Tarball::new();
    tarball.add_file("/tmp/ustar-absolute.txt", "nope").unwrap();
    let bytes = archive(tarball, StreamOptions::default());

    let err = unpack(&bytes[..], dest.path(), &UnpackOptions::default()).unwrap_err();
    assert!(matches!(err, UstarError::PathTraversal { .. }));
}

#[cfg(unix)]
#[test]
fn test_unpack_refuses_writing_through_symlink() {
    let dest = tempfile::tempdir().unwrap();
    let outside = tempfile::tempdir().unwrap();

    let mut tarball = Tarball::new();
    tarball
        .append(
            Some(EntryData::empty()),
            EntryInfo::symlink("link", outside.path().to_string_lossy().into_owned()),
        )
        .unwrap();
    tarball
        .append(Some("owned".into()), EntryInfo::file("link/owned.txt"))
        .unwrap();
    let bytes = archive(tarball, StreamOptions::default());

    let err = unpack(&bytes[..], dest.path(), &UnpackOptions::default()).unwrap_err();
    assert!(matches!(err, UstarError::PathTraversal { .. }));
    assert!(!outside.path().join("owned.txt").exists());
}

#[test]
fn test_walk_matches_load() -> Result<(), Box<dyn std::error::Error>> {
    let mut tarball = Tarball::new();
    tarball.add_file("a/b/c.txt", "c".repeat(700))?;
    tarball.add_file("d.txt", "d")?;
    let bytes = archive(tarball, StreamOptions::default().with_end_marker(true));

    let loaded = Tarball::load(&bytes[..], LoadOptions::default())?;
    let mut walked = Vec::new();
    let count = walk(&bytes[..], &LoadOptions::default(), |info, body| {
        let mut data = Vec::new();
        body.read_to_end(&mut data)?;
        walked.push((info.clone(), data));
        Ok(())
    })?;

    assert_eq!(count, loaded.len());
    for ((info, data), entry) in walked.iter().zip(loaded.entries()) {
        assert_eq!(info, entry.info());
        assert_eq!(Some(&data[..]), entry.data());
    }
    Ok(())
}
