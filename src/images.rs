//! Images arrive as base64 data URIs (`data:image/png;base64,....`) and are
//! stored under the media root; the database only keeps the relative path.

use std::path::{Component, Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use image::ImageFormat;
use rand::{distributions::Alphanumeric, Rng};

use crate::errors::RequestError;

pub const RECIPE_IMAGES: &str = "recipes_images";
pub const USER_IMAGES: &str = "users_images";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub extension: String,
    pub bytes: Vec<u8>,
}

/// Decodes a `data:image/...;base64,` URI. The stored extension comes from
/// the decoded bytes, not from the declared MIME type.
pub fn decode_data_uri(data: &str) -> Result<DecodedImage, &'static str> {
    let (header, payload) = data
        .split_once(";base64,")
        .ok_or("Expected a base64 encoded data URI.")?;
    if !header.starts_with("data:image/") {
        return Err("Upload a valid image.");
    }
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|_| "Image payload is not valid base64.")?;
    if bytes.is_empty() {
        return Err("The submitted file is empty.");
    }
    let extension = match image::guess_format(&bytes) {
        Ok(ImageFormat::Png) => "png",
        Ok(ImageFormat::Jpeg) => "jpg",
        Ok(ImageFormat::Gif) => "gif",
        Ok(ImageFormat::WebP) => "webp",
        _ => return Err("Upload a valid image. The file is not a PNG, JPEG, GIF or WEBP image."),
    };
    Ok(DecodedImage {
        extension: extension.to_string(),
        bytes,
    })
}

/// Writes the image under `media_root/folder` and returns its path relative to the media root.
pub async fn store_image(
    media_root: &Path,
    folder: &str,
    image: &DecodedImage,
) -> Result<String, RequestError> {
    let directory = media_root.join(folder);
    tokio::fs::create_dir_all(&directory).await?;
    let stem: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();
    let file_name = format!("{}.{}", stem, image.extension);
    tokio::fs::write(directory.join(&file_name), &image.bytes).await?;
    tracing::debug!(folder, file = %file_name, "stored image");
    Ok(format!("{folder}/{file_name}"))
}

pub async fn remove_image(media_root: &Path, relative: &str) {
    let Some(path) = resolve_media_path(media_root, relative) else {
        return;
    };
    if let Err(e) = tokio::fs::remove_file(&path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(error = %e, path = %path.display(), "could not remove image");
        }
    }
}

/// Maps a request path onto the media root, refusing anything that could escape it.
pub fn resolve_media_path(media_root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    let mut components = relative.components().peekable();
    components.peek()?;
    if components.all(|c| matches!(c, Component::Normal(_))) {
        Some(media_root.join(relative))
    } else {
        None
    }
}

pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::PIXEL;

    #[test]
    fn decodes_png_data_uri() {
        let image = decode_data_uri(PIXEL).unwrap();
        assert_eq!(image.extension, "png");
        assert_eq!(&image.bytes[1..4], b"PNG");
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert!(decode_data_uri("not a data uri").is_err());
        assert!(decode_data_uri("data:text/plain;base64,aGVsbG8=").is_err());
        assert!(decode_data_uri("data:image/png;base64,@@@").is_err());
        assert!(decode_data_uri("data:image/png;base64,").is_err());
        assert!(decode_data_uri("data:image/svg+xml;base64,aGVsbG8=").is_err());
    }

    #[test]
    fn declared_image_type_is_not_trusted() {
        // "<html></html>" labelled as an image
        assert!(decode_data_uri("data:image/html;base64,PGh0bWw+PC9odG1sPg==").is_err());
        assert!(decode_data_uri("data:image/png;base64,aGVsbG8=").is_err());

        let (_, payload) = PIXEL.split_once(";base64,").unwrap();
        let relabelled = decode_data_uri(&format!("data:image/jpeg;base64,{payload}")).unwrap();
        assert_eq!(relabelled.extension, "png");
    }

    #[test]
    fn media_paths_cannot_escape_root() {
        let root = Path::new("/srv/media");
        assert_eq!(
            resolve_media_path(root, "recipes_images/a.png"),
            Some(PathBuf::from("/srv/media/recipes_images/a.png"))
        );
        assert_eq!(resolve_media_path(root, "../etc/passwd"), None);
        assert_eq!(resolve_media_path(root, "/etc/passwd"), None);
        assert_eq!(resolve_media_path(root, ""), None);
    }

    #[tokio::test]
    async fn stored_image_lands_under_folder() {
        let root = std::env::temp_dir().join(format!("foodgram-images-{}", std::process::id()));
        let image = decode_data_uri(PIXEL).unwrap();
        let relative = store_image(&root, RECIPE_IMAGES, &image).await.unwrap();
        assert!(relative.starts_with("recipes_images/") && relative.ends_with(".png"));
        let path = root.join(&relative);
        assert_eq!(tokio::fs::read(&path).await.unwrap(), image.bytes);
        remove_image(&root, &relative).await;
        assert!(!path.exists());
    }
}
