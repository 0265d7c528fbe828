//! Extract command implementation.

use crate::utils::{create_progress_bar, open_archive};
use std::path::Path;
use ustar_archive::{UnpackOptions, unpack};

pub fn cmd_extract(
    archive: &Path,
    output: &Path,
    verbose: bool,
    progress: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let total = std::fs::metadata(archive)?.len();
    let (reader, gzip) = open_archive(archive)?;

    println!("Extracting {} to {}", archive.display(), output.display());

    let pb = create_progress_bar(total, progress);
    pb.set_message("reading");
    let options = UnpackOptions::default().with_gzip(gzip);
    let extracted = unpack(pb.wrap_read(reader), output, &options)?;
    pb.finish_with_message("Done");

    if verbose {
        for info in &extracted {
            if info.is_dir() {
                println!("  Created: {}/", info.relative_path);
            } else {
                println!("  Extracted: {} ({} bytes)", info.relative_path, info.size);
            }
        }
    }

    println!("Extracted {} entries", extracted.len());
    Ok(())
}
