use std::path::Path;

use anyhow::{Context, Result};
use organizer_core::{FileInspector, FileRecord, InspectorOptions};

/// Print what the inspector extracts from one file.
pub fn inspect_command(path: &Path, json: bool, sha256: bool) -> Result<()> {
    let options = InspectorOptions { compute_sha256: sha256, ..Default::default() };
    let inspector = FileInspector::new(options);
    let record = inspector
        .inspect(path)
        .with_context(|| format!("Failed to inspect {}", path.display()))?;

    if json {
        let serialized =
            serde_json::to_string_pretty(&record).context("Failed to serialize file record")?;
        println!("{serialized}");
    } else {
        print_record(&record);
    }
    Ok(())
}

fn print_record(record: &FileRecord) {
    println!("File: {}", record.path.display());
    println!("  Name: {}", record.name);
    println!("  Type: {}", record.file_type());
    println!("  Size: {} bytes", record.size_bytes);
    println!("  MIME: {}", record.mime_type);
    println!("  Executable: {}", record.is_executable);
    println!("  Permissions: {}", record.times.permissions);
    if let Some(modified) = record.times.modified {
        println!("  Modified: {}", modified.to_rfc3339());
    }
    if let Some(hash) = &record.sha256 {
        println!("  SHA-256: {hash}");
    }
    if let Some(archive) = &record.archive {
        let suffix = if archive.truncated { ", truncated" } else { "" };
        let count = archive.entries.len();
        println!("  Archive: {} ({count} entries{suffix})", archive.format.as_str());
        for entry in &archive.entries {
            println!("    - {entry}");
        }
    }
    if let Some(info) = &record.executable_info {
        println!("  Executable format: {}", info.format);
        let fields = [
            ("Machine", &info.machine),
            ("Description", &info.description),
            ("Product", &info.product_name),
            ("Publisher", &info.publisher),
            ("Version", &info.version),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                println!("  {label}: {value}");
            }
        }
    }
    if let Some(image) = &record.image_info {
        println!("  Image: {} {}x{}", image.format, image.width, image.height);
        for (tag, value) in &image.exif {
            println!("    {tag}: {value}");
        }
    }
    if let Some(pdf) = &record.pdf_info {
        println!("  PDF pages: {}", pdf.page_count);
        for (key, value) in &pdf.info {
            println!("    {key}: {value}");
        }
    }
}
