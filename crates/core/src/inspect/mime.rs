//! MIME detection: extension lookup first, magic-byte sniffing when the
//! extension is missing or tells us nothing.

use mime_guess::mime;

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Number of leading bytes the sniffers look at (covers the tar header magic).
pub const SNIFF_LEN: usize = 512;

/// Detect the MIME type from an optional lower-case extension and the file head.
pub fn detect_mime(extension: Option<&str>, head: &[u8]) -> String {
    if let Some(ext) = extension {
        if let Some(guess) = mime_guess::from_ext(ext).first() {
            if guess != mime::APPLICATION_OCTET_STREAM {
                return guess.essence_str().to_string();
            }
        }
    }
    sniff(head).unwrap_or(OCTET_STREAM).to_string()
}

/// Identify common formats by their signature bytes.
pub fn sniff(head: &[u8]) -> Option<&'static str> {
    if head.is_empty() {
        return None;
    }

    let starts = |magic: &[u8]| head.starts_with(magic);
    let at = |offset: usize, magic: &[u8]| {
        head.len() >= offset + magic.len() && &head[offset..offset + magic.len()] == magic
    };

    let detected = if starts(b"%PDF-") {
        "application/pdf"
    } else if starts(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else if starts(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if starts(b"GIF87a") || starts(b"GIF89a") {
        "image/gif"
    } else if starts(b"RIFF") && at(8, b"WEBP") {
        "image/webp"
    } else if starts(b"RIFF") && at(8, b"WAVE") {
        "audio/wav"
    } else if starts(b"RIFF") && at(8, b"AVI ") {
        "video/x-msvideo"
    } else if starts(b"II*\0") || starts(b"MM\0*") {
        "image/tiff"
    } else if starts(b"BM") && head.len() >= 14 {
        "image/bmp"
    } else if starts(b"PK\x03\x04") || starts(b"PK\x05\x06") || starts(b"PK\x07\x08") {
        "application/zip"
    } else if starts(&[0x1F, 0x8B]) {
        "application/gzip"
    } else if starts(b"BZh") {
        "application/x-bzip2"
    } else if starts(&[0xFD, b'7', b'z', b'X', b'Z', 0x00]) {
        "application/x-xz"
    } else if starts(&[b'7', b'z', 0xBC, 0xAF, 0x27, 0x1C]) {
        "application/x-7z-compressed"
    } else if starts(b"Rar!\x1a\x07") {
        "application/vnd.rar"
    } else if at(257, b"ustar") {
        "application/x-tar"
    } else if starts(b"\x7fELF") {
        "application/x-executable"
    } else if starts(b"MZ") {
        "application/vnd.microsoft.portable-executable"
    } else if is_mach_o(head) {
        "application/x-mach-binary"
    } else if starts(b"ID3")
        || starts(&[0xFF, 0xFB])
        || starts(&[0xFF, 0xF3])
        || starts(&[0xFF, 0xF2])
    {
        "audio/mpeg"
    } else if starts(b"OggS") {
        "audio/ogg"
    } else if starts(b"fLaC") {
        "audio/flac"
    } else if at(4, b"ftyp") {
        if at(8, b"qt  ") {
            "video/quicktime"
        } else if at(8, b"M4A ") {
            "audio/mp4"
        } else {
            "video/mp4"
        }
    } else if starts(&[0x1A, 0x45, 0xDF, 0xA3]) {
        "video/x-matroska"
    } else if starts(b"SQLite format 3\0") {
        "application/vnd.sqlite3"
    } else if starts(b"#!") {
        "text/x-shellscript"
    } else if looks_like_text(head) {
        "text/plain"
    } else {
        return None;
    };

    Some(detected)
}

pub(crate) fn is_mach_o(head: &[u8]) -> bool {
    const MAGICS: [[u8; 4]; 4] = [
        [0xFE, 0xED, 0xFA, 0xCE],
        [0xFE, 0xED, 0xFA, 0xCF],
        [0xCE, 0xFA, 0xED, 0xFE],
        [0xCF, 0xFA, 0xED, 0xFE],
    ];
    // 0xCAFEBABE is shared with Java class files; treat it as a fat Mach-O only
    // for executable detection, not for sniffing.
    MAGICS.iter().any(|m| head.starts_with(m))
}

fn looks_like_text(head: &[u8]) -> bool {
    if head.contains(&0) {
        return false;
    }
    match std::str::from_utf8(head) {
        Ok(_) => true,
        // A multi-byte sequence cut off at the end of the sniff window is fine.
        Err(e) => e.error_len().is_none() && e.valid_up_to() + 4 > head.len(),
    }
}
