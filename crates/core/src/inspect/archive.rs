use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use thiserror::Error;

use crate::model::{ArchiveFormat, ArchiveListing};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Work out which container format (if any) the head bytes announce.
///
/// Gzip streams only count as archives when the decompressed head carries a
/// tar header.
pub fn detect_format(path: &Path, head: &[u8]) -> Result<Option<ArchiveFormat>, ArchiveError> {
    if head.starts_with(b"PK\x03\x04") || head.starts_with(b"PK\x05\x06") {
        return Ok(Some(ArchiveFormat::Zip));
    }
    if has_ustar_magic(head) {
        return Ok(Some(ArchiveFormat::Tar));
    }
    if head.starts_with(&[0x1F, 0x8B]) {
        let mut decoder = GzDecoder::new(BufReader::new(File::open(path)?));
        let mut inner = Vec::with_capacity(512);
        // A truncated or non-tar gzip stream simply is not an archive we list.
        if (&mut decoder).take(512).read_to_end(&mut inner).is_ok() && has_ustar_magic(&inner) {
            return Ok(Some(ArchiveFormat::TarGz));
        }
    }
    Ok(None)
}

/// List up to `limit` entry names of a ZIP, TAR or gzip-compressed TAR file.
pub fn list_archive(
    path: &Path,
    head: &[u8],
    limit: usize,
) -> Result<Option<ArchiveListing>, ArchiveError> {
    let format = match detect_format(path, head)? {
        Some(format) => format,
        None => return Ok(None),
    };

    let (entries, truncated) = match format {
        ArchiveFormat::Zip => list_zip(path, limit)?,
        ArchiveFormat::Tar => list_tar(BufReader::new(File::open(path)?), limit)?,
        ArchiveFormat::TarGz => {
            list_tar(GzDecoder::new(BufReader::new(File::open(path)?)), limit)?
        }
    };

    Ok(Some(ArchiveListing { format, entries, truncated }))
}

fn list_zip(path: &Path, limit: usize) -> Result<(Vec<String>, bool), ArchiveError> {
    let mut archive = zip::ZipArchive::new(BufReader::new(File::open(path)?))?;
    let total = archive.len();
    let mut entries = Vec::with_capacity(total.min(limit));
    for idx in 0..total.min(limit) {
        // Raw access reads the header only, so encrypted entries list too.
        let file = archive.by_index_raw(idx)?;
        entries.push(file.name().to_string());
    }
    Ok((entries, total > limit))
}

fn list_tar<R: Read>(reader: R, limit: usize) -> Result<(Vec<String>, bool), ArchiveError> {
    let mut archive = tar::Archive::new(reader);
    let mut entries = Vec::new();
    for entry in archive.entries()? {
        let entry = entry?;
        if entries.len() == limit {
            return Ok((entries, true));
        }
        entries.push(entry.path()?.to_string_lossy().into_owned());
    }
    Ok((entries, false))
}

fn has_ustar_magic(head: &[u8]) -> bool {
    head.len() >= 262 && &head[257..262] == b"ustar"
}
