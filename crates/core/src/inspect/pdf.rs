//! PDF page count and `/Info` dictionary. Page content is never read.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::{Document, Object};

use crate::model::PdfInfo;

const MAX_INFO_VALUE: usize = 200;

pub fn read_pdf_info(path: &Path) -> Result<PdfInfo, lopdf::Error> {
    let document = Document::load(path)?;
    let page_count = document.get_pages().len();

    let mut info = BTreeMap::new();
    if let Ok(dict) = document.trailer.get_deref(b"Info", &document).and_then(Object::as_dict) {
        for (key, value) in dict.iter() {
            if let Some(text) = text_value(value) {
                info.insert(String::from_utf8_lossy(key).into_owned(), text);
            }
        }
    }

    Ok(PdfInfo { page_count, info })
}

fn text_value(value: &Object) -> Option<String> {
    let text = match value {
        Object::String(bytes, _) => decode_text(bytes),
        Object::Name(name) => String::from_utf8_lossy(name).into_owned(),
        _ => return None,
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.chars().take(MAX_INFO_VALUE).collect())
}

/// UTF-16BE when the string starts with a byte order mark, otherwise UTF-8
/// with a Latin-1 fallback.
fn decode_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> =
            rest.chunks_exact(2).map(|pair| u16::from_be_bytes([pair[0], pair[1]])).collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}
