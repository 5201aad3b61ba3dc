use std::fs;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::constants::RECIPE_IMAGE_DIR;
use crate::error::{ApiError, ApiResult};

/// Decodes an embedded base64 image, either a full data URL
/// (`data:image/png;base64,...`) or a bare base64 payload.
/// Returns the file extension and the raw bytes.
pub fn decode_base64_image(data: &str) -> ApiResult<(&'static str, Vec<u8>)> {
    let (extension, payload) = match data.strip_prefix("data:") {
        Some(rest) => {
            let (mime, payload) = rest
                .split_once(";base64,")
                .ok_or_else(|| ApiError::validation("image must be base64 encoded"))?;
            (extension_for(mime)?, payload)
        }
        None => ("png", data),
    };

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|_| ApiError::validation("invalid base64 image data"))?;

    if bytes.is_empty() {
        return Err(ApiError::validation("image must not be empty"));
    }

    Ok((extension, bytes))
}

fn extension_for(mime: &str) -> ApiResult<&'static str> {
    match mime {
        "image/png" => Ok("png"),
        "image/jpeg" | "image/jpg" => Ok("jpg"),
        "image/gif" => Ok("gif"),
        "image/webp" => Ok("webp"),
        _ => Err(ApiError::validation("unsupported image type")),
    }
}

/// Writes a decoded image under the media root and returns the stored
/// path, relative to the media root.
pub fn save_image(media_root: &Path, data: &str) -> ApiResult<String> {
    let (extension, bytes) = decode_base64_image(data)?;

    let name = format!("{RECIPE_IMAGE_DIR}/{:016x}.{extension}", rand::random::<u64>());
    let target = media_root.join(&name);

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&target, bytes)?;

    Ok(name)
}

/// Best-effort removal of a stored image: used for replaced images and
/// for a write whose enclosing operation failed. A file that is already
/// gone is not an error.
pub fn remove_image(media_root: &Path, name: &str) {
    let target = media_root.join(name);
    if let Err(e) = fs::remove_file(&target) {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("failed to remove media file {}: {e}", target.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // "hello" in base64.
    const PAYLOAD: &str = "aGVsbG8=";

    #[test]
    fn data_url_decodes_with_extension() {
        let (ext, bytes) =
            decode_base64_image(&format!("data:image/png;base64,{PAYLOAD}")).unwrap();
        assert_eq!(ext, "png");
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn bare_base64_defaults_to_png() {
        let (ext, bytes) = decode_base64_image(PAYLOAD).unwrap();
        assert_eq!(ext, "png");
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn jpeg_mime_maps_to_jpg() {
        let (ext, _) = decode_base64_image(&format!("data:image/jpeg;base64,{PAYLOAD}")).unwrap();
        assert_eq!(ext, "jpg");
    }

    #[test]
    fn saved_images_can_be_removed_again() {
        let root =
            std::env::temp_dir().join(format!("media-test-{:016x}", rand::random::<u64>()));

        let name = save_image(&root, &format!("data:image/png;base64,{PAYLOAD}")).unwrap();
        assert!(root.join(&name).is_file());

        remove_image(&root, &name);
        assert!(!root.join(&name).exists());

        // Removing it a second time is a no-op.
        remove_image(&root, &name);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn invalid_payloads_are_validation_errors() {
        assert!(matches!(
            decode_base64_image("data:image/png;base64,%%%"),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            decode_base64_image("data:text/plain;base64,aGVsbG8="),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            decode_base64_image("data:image/png;base64,"),
            Err(ApiError::Validation(_))
        ));
    }
}
