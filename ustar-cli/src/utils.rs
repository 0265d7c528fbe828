//! Utility functions for the CLI.

use glob::Pattern;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use ustar_archive::gzip;

/// Create a byte progress bar with standard styling.
pub fn create_progress_bar(len: u64, enable: bool) -> ProgressBar {
    if !enable {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
    {
        pb.set_style(style.progress_chars("█▓▒░ "));
    }
    pb
}

/// Check if a path matches the filter patterns.
/// - If include patterns are specified, the path must match at least one
/// - If exclude patterns are specified, the path must not match any
pub fn matches_filters(path: &str, include: &[String], exclude: &[String]) -> bool {
    let matches = |pattern: &String| Pattern::new(pattern).is_ok_and(|p| p.matches(path));

    if exclude.iter().any(matches) {
        return false;
    }
    include.is_empty() || include.iter().any(matches)
}

/// Whether an archive name asks for gzip.
pub fn is_gzip_name(path: &Path) -> bool {
    let name = path.to_string_lossy().to_ascii_lowercase();
    name.ends_with(".tar.gz") || name.ends_with(".tgz")
}

/// Open an archive, sniffing the gzip magic without consuming it.
pub fn open_archive(path: &Path) -> io::Result<(BufReader<File>, bool)> {
    let mut reader = BufReader::new(File::open(path)?);
    let gzip = gzip::is_gzip(reader.fill_buf()?);
    Ok((reader, gzip))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn test_filters() {
        let rs = vec!["*.rs".to_string()];
        let tests = vec!["tests/*".to_string()];
        assert!(matches_filters("src/lib.rs", &rs, &[]));
        assert!(!matches_filters("README.md", &rs, &[]));
        assert!(matches_filters("README.md", &[], &[]));
        assert!(!matches_filters("tests/a.rs", &rs, &tests));
    }

    #[test]
    fn test_gzip_names() {
        assert!(is_gzip_name(Path::new("backup.tar.gz")));
        assert!(is_gzip_name(Path::new("BACKUP.TGZ")));
        assert!(!is_gzip_name(Path::new("backup.tar")));
    }

    #[test]
    fn test_open_archive_sniffs_without_consuming() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.gz");
        let compressed = gzip::compress(b"payload", 6).unwrap();
        File::create(&path).unwrap().write_all(&compressed).unwrap();

        let (mut reader, is_gzip) = open_archive(&path).unwrap();
        assert!(is_gzip);
        let mut all = Vec::new();
        reader.read_to_end(&mut all).unwrap();
        assert_eq!(all, compressed);
    }
}
