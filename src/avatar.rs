//! Avatar upload policy and transcoding.

use actix_multipart::Multipart;
use futures::StreamExt;
use image::imageops::FilterType;
use image::ImageFormat;
use std::io::Cursor;

use crate::error::AppError;

/// Uploads above this many bytes are rejected.
pub const MAX_AVATAR_BYTES: usize = 1_000_000;
/// Stored avatars are square PNGs of this edge length.
pub const AVATAR_SIZE: u32 = 250;
/// Multipart field carrying the file.
pub const AVATAR_FIELD: &str = "avatar";

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Accepts `name.jpg`, `name.jpeg` and `name.png` (any letter case).
pub fn check_filename(filename: &str) -> Result<(), AppError> {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match extension {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(AppError::BadRequest(
            "Please upload a jpg, jpeg or png file".into(),
        )),
    }
}

/// Reads the single `avatar` file out of a multipart body, enforcing the
/// extension allow-list and the size ceiling while streaming.
pub async fn read_upload(mut payload: Multipart) -> Result<Vec<u8>, AppError> {
    let mut upload: Option<Vec<u8>> = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| AppError::BadRequest(format!("Invalid upload: {}", e)))?;

        if field.name() != AVATAR_FIELD || upload.is_some() {
            return Err(AppError::BadRequest("Unexpected field".into()));
        }
        let filename = field
            .content_disposition()
            .get_filename()
            .map(str::to_owned)
            .unwrap_or_default();
        check_filename(&filename)?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| AppError::BadRequest(format!("Invalid upload: {}", e)))?;
            if bytes.len() + chunk.len() > MAX_AVATAR_BYTES {
                return Err(AppError::BadRequest("File too large".into()));
            }
            bytes.extend_from_slice(&chunk);
        }
        upload = Some(bytes);
    }

    upload.ok_or_else(|| AppError::BadRequest("Please upload an image".into()))
}

/// Decodes an uploaded jpg/png, crops it to fill a 250x250 square and
/// re-encodes it as PNG.
pub fn normalize(bytes: &[u8]) -> Result<Vec<u8>, AppError> {
    let image = image::load_from_memory(bytes)
        .map_err(|_| AppError::BadRequest("Please upload a valid jpg, jpeg or png image".into()))?;

    let resized = image.resize_to_fill(AVATAR_SIZE, AVATAR_SIZE, FilterType::Lanczos3);

    let mut buffer = Cursor::new(Vec::new());
    resized.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}
