//! Core data model shared by the inspector, the classification engine and the
//! organizer.
//!
//! - `FileRecord`: immutable metadata gathered for one file.
//! - `ArchiveListing` / `ExecutableInfo` / `ImageInfo` / `PdfInfo`: optional
//!   format-specific extras.
//! - `Classification`: the outcome of labeling one file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Container formats the inspector knows how to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
}

impl ArchiveFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::TarGz => "tar.gz",
        }
    }
}

/// Bounded listing of the entries inside an archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveListing {
    pub format: ArchiveFormat,
    /// Entry names in archive order, at most the inspector's bound.
    pub entries: Vec<String>,
    /// True when the archive holds more entries than were listed.
    pub truncated: bool,
}

/// Metadata pulled from a Windows PE header and its version resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutableInfo {
    /// `PE32` or `PE32+`.
    pub format: String,
    pub machine: Option<String>,
    pub is_dll: bool,
    pub description: Option<String>,
    pub product_name: Option<String>,
    /// `CompanyName` from the version resource.
    pub publisher: Option<String>,
    /// `FileVersion` from the version resource.
    pub version: Option<String>,
    pub product_version: Option<String>,
    pub original_filename: Option<String>,
}

/// Image header facts. Pixels are never decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub format: String,
    pub width: u32,
    pub height: u32,
    /// Selected EXIF tags keyed by tag name (`Make`, `Model`, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub exif: BTreeMap<String, String>,
}

/// Page count and document information dictionary of a PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfInfo {
    pub page_count: usize,
    /// String entries of the `/Info` dictionary (`Title`, `Author`, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub info: BTreeMap<String, String>,
}

/// Timestamps and permission bits as reported by the filesystem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTimes {
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub accessed: Option<DateTime<Utc>>,
    /// Octal mode on unix (e.g. `0o100644`), `readonly`/`readwrite` elsewhere.
    pub permissions: String,
}

/// Everything the inspector learned about one file.
///
/// Built once at the start of a file's processing and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: PathBuf,
    pub name: String,
    /// Lower-case extension without the leading dot.
    pub extension: Option<String>,
    pub size_bytes: u64,
    pub mime_type: String,
    pub is_executable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive: Option<ArchiveListing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable_info: Option<ExecutableInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_info: Option<ImageInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_info: Option<PdfInfo>,
    pub times: FileTimes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl FileRecord {
    /// Extension rendered the way reports show it (`.pdf`, or `no_extension`).
    pub fn file_type(&self) -> String {
        match &self.extension {
            Some(ext) => format!(".{ext}"),
            None => "no_extension".to_string(),
        }
    }
}

/// Outcome of classifying one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Category, optionally followed by a sub-category.
    pub label_path: Vec<String>,
    /// Unparsed oracle output, kept for diagnostics.
    pub raw_response: String,
    /// Set when the response matched nothing and the fallback bucket was used.
    pub is_fallback: bool,
}

impl Classification {
    pub fn new(label_path: Vec<String>, raw_response: impl Into<String>) -> Self {
        Self { label_path, raw_response: raw_response.into(), is_fallback: false }
    }

    pub fn fallback(fallback_label: &str, raw_response: impl Into<String>) -> Self {
        Self {
            label_path: vec![fallback_label.to_string()],
            raw_response: raw_response.into(),
            is_fallback: true,
        }
    }

    pub fn category(&self) -> &str {
        self.label_path.first().map(String::as_str).unwrap_or_default()
    }

    pub fn sub_category(&self) -> Option<&str> {
        self.label_path.get(1).map(String::as_str)
    }

    /// `Category` or `Category/Sub`.
    pub fn label_string(&self) -> String {
        self.label_path.join("/")
    }
}
