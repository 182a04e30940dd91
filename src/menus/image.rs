use base64::{Engine, engine::general_purpose::STANDARD};

use crate::error::{AppError, AppResult};

pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

/// Encodes an uploaded picture as a `data:` URL so it can live on the item row.
pub fn encode_data_url(content_type: Option<&str>, bytes: &[u8]) -> AppResult<String> {
    let content_type = content_type.unwrap_or_default();
    if !content_type.starts_with("image/") {
        return Err(AppError::validation("Only image uploads are accepted"));
    }
    if bytes.is_empty() {
        return Err(AppError::validation("The uploaded image is empty"));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(AppError::validation("Images must be 2 MB or smaller"));
    }

    Ok(format!("data:{};base64,{}", content_type, STANDARD.encode(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_png_as_data_url() {
        let url = encode_data_url(Some("image/png"), b"\x89PNG").unwrap();
        assert_eq!(url, "data:image/png;base64,iVBORw==");
    }

    #[test]
    fn rejects_non_images_and_oversized_files() {
        assert!(encode_data_url(Some("text/plain"), b"hi").is_err());
        assert!(encode_data_url(None, b"hi").is_err());

        let big = vec![0u8; MAX_IMAGE_BYTES + 1];
        assert!(encode_data_url(Some("image/jpeg"), &big).is_err());
    }
}
