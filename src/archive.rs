//! Bundling encoded segments into one downloadable archive.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::{Error, Result};

/// One named blob handed to an [`Archiver`].
#[derive(Debug, Clone, Copy)]
pub struct ArchiveEntry<'a> {
    pub name: &'a str,
    pub bytes: &'a [u8],
}

/// Combines named byte blobs, in insertion order, into a single byte stream.
///
/// Implementations must not inspect or alter the blob contents.
pub trait Archiver {
    fn bundle(&self, entries: &[ArchiveEntry<'_>]) -> Result<Vec<u8>>;
}

/// Writes a ZIP archive.
///
/// Entries are stored uncompressed (WAV compresses poorly with deflate and MP3 not at all)
/// and carry a fixed modification time, so the same entries always produce the same bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiver;

impl Archiver for ZipArchiver {
    fn bundle(&self, entries: &[ArchiveEntry<'_>]) -> Result<Vec<u8>> {
        let mut seen = HashSet::with_capacity(entries.len());
        if let Some(dup) = entries.iter().find(|e| !seen.insert(e.name)) {
            return Err(Error::Archive(format!("duplicate entry name '{}'", dup.name)));
        }

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for entry in entries {
            zip.start_file(entry.name, entry_options())
                .map_err(|e| Error::Archive(format!("failed to start '{}': {e}", entry.name)))?;
            zip.write_all(entry.bytes)
                .map_err(|e| Error::Archive(format!("failed to write '{}': {e}", entry.name)))?;
        }

        let cursor = zip
            .finish()
            .map_err(|e| Error::Archive(format!("failed to finalize archive: {e}")))?;
        Ok(cursor.into_inner())
    }
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644)
}
