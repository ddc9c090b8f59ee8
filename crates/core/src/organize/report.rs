//! Incremental CSV run report.
//!
//! Rows are appended and flushed one at a time so an interrupted run still
//! leaves a usable report. The header is written only when the file is new
//! or empty, so repeated runs accumulate into one table.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use serde::Serialize;

pub const HEADERS: [&str; 12] = [
    "file_name",
    "file_type",
    "file_size",
    "mime_type",
    "is_executable",
    "decided_label",
    "category",
    "sub_category",
    "is_fallback",
    "llm_response",
    "destination",
    "error",
];

/// One report line. Field order matches [`HEADERS`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub file_name: String,
    pub file_type: String,
    pub file_size: Option<u64>,
    pub mime_type: String,
    pub is_executable: Option<bool>,
    pub decided_label: String,
    pub category: String,
    pub sub_category: String,
    pub is_fallback: bool,
    pub llm_response: String,
    pub destination: String,
    pub error: String,
}

pub struct CsvReport {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl CsvReport {
    pub fn open(path: &Path) -> Result<Self, csv::Error> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let needs_header = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if needs_header {
            writer.write_record(HEADERS)?;
            writer.flush()?;
        }
        Ok(Self { path: path.to_path_buf(), writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, row: &ReportRow) -> Result<(), csv::Error> {
        self.writer.serialize(row)?;
        self.writer.flush()?;
        Ok(())
    }
}
