//! Upload classification: which pipeline path an uploaded file takes.

use anyhow::{bail, Context, Result};

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];
const VIDEO_EXTENSIONS: [&str; 2] = ["mp4", "avi"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Image,
    Video,
}

/// Classify an upload by its file name extension (case-insensitive).
pub fn classify(file_name: &str) -> Result<UploadKind> {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Ok(UploadKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Ok(UploadKind::Video)
    } else {
        bail!("unsupported upload type: {file_name:?} (expected jpg/jpeg/png/webp/mp4/avi)");
    }
}

/// Decoded header of an uploaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
}

/// Confirm the bytes decode as an image and report its dimensions.
pub fn probe_image(bytes: &[u8]) -> Result<ImageInfo> {
    let reader = image::ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .context("failed to sniff image format")?;
    let (width, height) = reader.into_dimensions().context("unreadable image upload")?;
    Ok(ImageInfo { width, height })
}
