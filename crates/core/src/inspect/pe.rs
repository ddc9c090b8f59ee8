//! Best-effort metadata for Windows PE binaries.
//!
//! Headers are parsed with goblin. Version-resource strings are recovered by
//! scanning the `.rsrc` section for the UTF-16LE `StringFileInfo` keys rather
//! than walking the full resource directory; missing data is never an error.

use goblin::pe::{header, PE};
use tracing::debug;

use crate::model::ExecutableInfo;

/// Version-resource keys we surface, in the order they are looked up.
pub const VERSION_KEYS: [&str; 6] = [
    "FileDescription",
    "ProductName",
    "CompanyName",
    "FileVersion",
    "ProductVersion",
    "OriginalFilename",
];

const MAX_VALUE_CHARS: usize = 256;

/// Parse a PE image. Returns `None` when the bytes are not a valid PE.
pub fn read_executable_info(bytes: &[u8]) -> Option<ExecutableInfo> {
    let pe = match PE::parse(bytes) {
        Ok(pe) => pe,
        Err(e) => {
            debug!("Not a parseable PE image: {e}");
            return None;
        }
    };

    let mut info = ExecutableInfo {
        format: if pe.is_64 { "PE32+" } else { "PE32" }.to_string(),
        machine: machine_name(pe.header.coff_header.machine).map(str::to_string),
        is_dll: pe.is_lib,
        ..Default::default()
    };

    let rsrc = pe.sections.iter().find(|s| s.name().map(|n| n == ".rsrc").unwrap_or(false));
    if let Some(section) = rsrc {
        let start = section.pointer_to_raw_data as usize;
        let end = start.saturating_add(section.size_of_raw_data as usize).min(bytes.len());
        if start < end {
            for (key, value) in scan_version_strings(&bytes[start..end]) {
                match key {
                    "FileDescription" => info.description = Some(value),
                    "ProductName" => info.product_name = Some(value),
                    "CompanyName" => info.publisher = Some(value),
                    "FileVersion" => info.version = Some(value),
                    "ProductVersion" => info.product_version = Some(value),
                    "OriginalFilename" => info.original_filename = Some(value),
                    _ => {}
                }
            }
        }
    }

    Some(info)
}

fn machine_name(machine: u16) -> Option<&'static str> {
    match machine {
        header::COFF_MACHINE_X86 => Some("x86"),
        header::COFF_MACHINE_X86_64 => Some("x86_64"),
        header::COFF_MACHINE_ARM => Some("arm"),
        header::COFF_MACHINE_ARM64 => Some("arm64"),
        _ => None,
    }
}

/// Find `StringFileInfo` key/value pairs in raw resource data.
///
/// Each entry is a UTF-16LE, NUL-terminated key followed by padding to a
/// 32-bit boundary and a NUL-terminated UTF-16LE value. The first non-empty
/// value per key wins.
pub fn scan_version_strings(data: &[u8]) -> Vec<(&'static str, String)> {
    let mut found = Vec::new();
    for key in VERSION_KEYS {
        let needle = utf16_with_nul(key);
        if let Some(value) = find_value(data, &needle) {
            found.push((key, value));
        }
    }
    found
}

fn find_value(data: &[u8], needle: &[u8]) -> Option<String> {
    if data.len() < needle.len() {
        return None;
    }
    let mut pos = 0;
    while pos + needle.len() <= data.len() {
        if &data[pos..pos + needle.len()] == needle {
            let value_start = align4(pos + needle.len());
            if let Some(value) = read_utf16z(data, value_start) {
                if !value.is_empty() {
                    return Some(value);
                }
            }
        }
        pos += 2;
    }
    None
}

fn read_utf16z(data: &[u8], start: usize) -> Option<String> {
    let mut units = Vec::new();
    let mut pos = start;
    while pos + 1 < data.len() && units.len() < MAX_VALUE_CHARS {
        let unit = u16::from_le_bytes([data[pos], data[pos + 1]]);
        if unit == 0 {
            return Some(String::from_utf16_lossy(&units).trim().to_string());
        }
        units.push(unit);
        pos += 2;
    }
    None
}

fn utf16_with_nul(s: &str) -> Vec<u8> {
    s.encode_utf16().chain(std::iter::once(0)).flat_map(|u| u.to_le_bytes()).collect()
}

fn align4(offset: usize) -> usize {
    (offset + 3) & !3
}
