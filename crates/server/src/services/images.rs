use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::{
    db::models::Image,
    error::{AppError, Result},
};

/// Encode an upload for storage. Only `image/*` content types are accepted;
/// the part after the slash becomes the stored subtype.
pub fn encode_upload(bytes: &[u8], content_type: &str) -> Result<Image> {
    let subtype = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .strip_prefix("image/")
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            AppError::Validation(format!("Unsupported image type: {content_type}"))
        })?;

    Ok(Image {
        data: STANDARD.encode(bytes),
        mime_subtype: subtype.to_ascii_lowercase(),
    })
}

/// Raw bytes and full content type for redisplaying a stored image.
pub fn decode_stored(image: &Image) -> Result<(Vec<u8>, String)> {
    let bytes = STANDARD
        .decode(&image.data)
        .map_err(|e| AppError::Internal(format!("Stored image is not valid base64: {e}")))?;
    Ok((bytes, format!("image/{}", image.mime_subtype)))
}
