//! List command implementation.

use crate::utils::{matches_filters, open_archive};
use serde::{Deserialize, Serialize};
use std::path::Path;
use ustar_archive::{LoadOptions, walk};
use ustar_core::TarEntryInfo;

/// JSON serializable entry data for archive listings.
#[derive(Debug, Serialize, Deserialize)]
struct EntryJson {
    path: String,
    kind: String,
    size: u64,
    mode: u32,
    uid: u32,
    gid: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    owner: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    group: String,
    mtime: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    linkname: Option<String>,
}

impl EntryJson {
    fn from_info(info: &TarEntryInfo) -> Self {
        Self {
            path: info.relative_path.clone(),
            kind: info.kind.name().to_string(),
            size: info.size,
            mode: info.mode,
            uid: info.uid,
            gid: info.gid,
            owner: info.owner.clone(),
            group: info.group.clone(),
            mtime: info.mtime_secs(),
            linkname: (!info.linkname.is_empty()).then(|| info.linkname.clone()),
        }
    }
}

/// JSON output for archive listing.
#[derive(Debug, Serialize, Deserialize)]
struct ArchiveListJson {
    archive: String,
    gzip: bool,
    entries: Vec<EntryJson>,
}

/// Options for listing archive contents.
pub struct ListOptions<'a> {
    pub verbose: bool,
    pub json: bool,
    pub include: &'a [String],
    pub exclude: &'a [String],
}

pub fn cmd_list(archive: &Path, options: &ListOptions) -> Result<(), Box<dyn std::error::Error>> {
    let (reader, gzip) = open_archive(archive)?;

    let mut entries = Vec::new();
    walk(reader, &LoadOptions::default().with_gzip(gzip), |info, _| {
        if matches_filters(&info.relative_path, options.include, options.exclude) {
            entries.push(info.clone());
        }
        Ok(())
    })?;

    if options.json {
        let listing = ArchiveListJson {
            archive: archive.display().to_string(),
            gzip,
            entries: entries.iter().map(EntryJson::from_info).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    if options.verbose {
        println!(
            "Archive: {} ({})",
            archive.display(),
            if gzip { "tar+gzip" } else { "tar" }
        );
        println!();
        for info in &entries {
            println!("{}", info);
        }
        println!("{}", "-".repeat(60));
        let total: u64 = entries.iter().map(|e| e.size).sum();
        println!("{} bytes in {} entries", total, entries.len());
    } else {
        for info in &entries {
            if info.is_dir() {
                println!("{}/", info.relative_path);
            } else {
                println!("{}", info.relative_path);
            }
        }
    }
    Ok(())
}
