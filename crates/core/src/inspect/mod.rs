//! File inspection: turns a path into an immutable [`FileRecord`].
//!
//! The inspector is read-only. It fails only when a file cannot be read;
//! unrecognized formats still produce a record (MIME type
//! `application/octet-stream`, no archive or executable details). Format
//! details that fail to parse are logged and left out.

pub mod archive;
pub mod media;
pub mod mime;
pub mod pdf;
pub mod pe;

use std::fs::{self, File, Metadata};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{FileRecord, FileTimes};

/// Default bound on archive entries carried into a record.
pub const DEFAULT_MAX_ARCHIVE_ENTRIES: usize = 50;

/// PE images and PDFs above this size are not parsed.
const MAX_PARSE_BYTES: u64 = 64 * 1024 * 1024;

const EXECUTABLE_EXTENSIONS: [&str; 6] = ["exe", "bat", "cmd", "com", "ps1", "msi"];

#[derive(Debug, Error)]
pub enum InspectionError {
    #[error("Cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Not a regular file: {0}")]
    NotAFile(PathBuf),
}

impl InspectionError {
    fn unreadable(path: &Path, source: io::Error) -> Self {
        InspectionError::Unreadable { path: path.to_path_buf(), source }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectorOptions {
    /// Maximum number of archive entry names kept in a record.
    pub max_archive_entries: usize,
    /// Compute a SHA-256 digest of the whole file.
    pub compute_sha256: bool,
}

impl Default for InspectorOptions {
    fn default() -> Self {
        Self { max_archive_entries: DEFAULT_MAX_ARCHIVE_ENTRIES, compute_sha256: false }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FileInspector {
    options: InspectorOptions,
}

impl FileInspector {
    pub fn new(options: InspectorOptions) -> Self {
        Self { options }
    }

    /// Gather metadata for a single file.
    pub fn inspect(&self, path: &Path) -> Result<FileRecord, InspectionError> {
        let metadata = fs::metadata(path).map_err(|e| InspectionError::unreadable(path, e))?;
        if !metadata.is_file() {
            return Err(InspectionError::NotAFile(path.to_path_buf()));
        }
        let abs_path = path.canonicalize().map_err(|e| InspectionError::unreadable(path, e))?;

        let head = read_head(&abs_path, mime::SNIFF_LEN)
            .map_err(|e| InspectionError::unreadable(path, e))?;

        let name = abs_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| abs_path.display().to_string());
        let extension = abs_path
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .map(|e| e.to_ascii_lowercase());

        let mime_type = mime::detect_mime(extension.as_deref(), &head);
        let is_executable = is_executable(extension.as_deref(), &head, &metadata);

        let archive =
            match archive::list_archive(&abs_path, &head, self.options.max_archive_entries) {
                Ok(listing) => listing,
                Err(e) => {
                    warn!("Failed to read archive contents for {}: {e}", abs_path.display());
                    None
                }
            };

        let executable_info = if head.starts_with(b"MZ") {
            if metadata.len() > MAX_PARSE_BYTES {
                debug!("Skipping PE metadata for oversized file {}", abs_path.display());
                None
            } else {
                let bytes =
                    fs::read(&abs_path).map_err(|e| InspectionError::unreadable(path, e))?;
                pe::read_executable_info(&bytes)
            }
        } else {
            None
        };

        let image_info = if mime_type.starts_with("image/") {
            match media::read_image_info(&abs_path) {
                Ok(info) => info,
                Err(e) => {
                    warn!("Failed to read image metadata for {}: {e}", abs_path.display());
                    None
                }
            }
        } else {
            None
        };

        let pdf_info = if mime_type != "application/pdf" {
            None
        } else if metadata.len() > MAX_PARSE_BYTES {
            debug!("Skipping PDF metadata for oversized file {}", abs_path.display());
            None
        } else {
            match pdf::read_pdf_info(&abs_path) {
                Ok(info) => Some(info),
                Err(e) => {
                    warn!("Failed to read PDF metadata for {}: {e}", abs_path.display());
                    None
                }
            }
        };

        let sha256 = if self.options.compute_sha256 {
            Some(sha256_file(&abs_path).map_err(|e| InspectionError::unreadable(path, e))?)
        } else {
            None
        };

        Ok(FileRecord {
            name,
            extension,
            size_bytes: metadata.len(),
            mime_type,
            is_executable,
            archive,
            executable_info,
            image_info,
            pdf_info,
            times: file_times(&metadata),
            sha256,
            path: abs_path,
        })
    }
}

/// Inspect with default options.
pub fn inspect(path: &Path) -> Result<FileRecord, InspectionError> {
    FileInspector::default().inspect(path)
}

fn read_head(path: &Path, len: usize) -> io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut head = Vec::with_capacity(len);
    file.take(len as u64).read_to_end(&mut head)?;
    Ok(head)
}

fn is_executable(extension: Option<&str>, head: &[u8], metadata: &Metadata) -> bool {
    if extension.map(|e| EXECUTABLE_EXTENSIONS.contains(&e)).unwrap_or(false) {
        return true;
    }
    if head.starts_with(b"#!")
        || head.starts_with(b"\x7fELF")
        || head.starts_with(b"MZ")
        || head.starts_with(&[0xCA, 0xFE, 0xBA, 0xBE])
        || mime::is_mach_o(head)
    {
        return true;
    }
    has_exec_bit(metadata)
}

#[cfg(unix)]
fn has_exec_bit(metadata: &Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o100 != 0
}

#[cfg(not(unix))]
fn has_exec_bit(_metadata: &Metadata) -> bool {
    false
}

fn file_times(metadata: &Metadata) -> FileTimes {
    FileTimes {
        created: metadata.created().ok().map(DateTime::<Utc>::from),
        modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        accessed: metadata.accessed().ok().map(DateTime::<Utc>::from),
        permissions: permissions_string(metadata),
    }
}

#[cfg(unix)]
fn permissions_string(metadata: &Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;
    format!("{:#o}", metadata.permissions().mode())
}

#[cfg(not(unix))]
fn permissions_string(metadata: &Metadata) -> String {
    if metadata.permissions().readonly() { "readonly" } else { "readwrite" }.to_string()
}

/// Compute the SHA-256 hash of a file and return it as a hex string.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
