//! Image dimensions and EXIF tags.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use exif::{In, Tag};
use image::ImageReader;
use thiserror::Error;
use tracing::debug;

use crate::model::ImageInfo;

const EXIF_TAGS: [Tag; 7] = [
    Tag::Make,
    Tag::Model,
    Tag::LensModel,
    Tag::Software,
    Tag::Artist,
    Tag::ImageDescription,
    Tag::DateTimeOriginal,
];

/// Longest EXIF value kept, in characters.
const MAX_EXIF_VALUE: usize = 200;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// Read the format and size from the image header. `Ok(None)` when the
/// bytes are not a format the decoder knows.
pub fn read_image_info(path: &Path) -> Result<Option<ImageInfo>, ImageError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let format = match reader.format() {
        Some(format) => format!("{format:?}"),
        None => return Ok(None),
    };
    let (width, height) = reader.into_dimensions()?;
    Ok(Some(ImageInfo { format, width, height, exif: read_exif(path) }))
}

fn read_exif(path: &Path) -> BTreeMap<String, String> {
    let mut tags = BTreeMap::new();
    let exif = match File::open(path)
        .map_err(exif::Error::from)
        .and_then(|file| exif::Reader::new().read_from_container(&mut BufReader::new(file)))
    {
        Ok(exif) => exif,
        Err(e) => {
            debug!("No EXIF data in {}: {e}", path.display());
            return tags;
        }
    };

    for tag in EXIF_TAGS {
        if let Some(field) = exif.get_field(tag, In::PRIMARY) {
            let value = field.display_value().to_string();
            let value = value.trim_matches('"').trim();
            if !value.is_empty() {
                tags.insert(tag.to_string(), value.chars().take(MAX_EXIF_VALUE).collect());
            }
        }
    }
    tags
}
