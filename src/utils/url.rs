use std::path::{Path, PathBuf};

use base64::{prelude::BASE64_STANDARD, Engine};
use percent_encoding::percent_decode_str;
pub use url::Url;

const IMAGE_SIGNATURES: [[&[u8]; 2]; 6] = [
    [b"GIF87a", b"image/gif"],
    [b"GIF89a", b"image/gif"],
    [b"\xFF\xD8\xFF", b"image/jpeg"],
    [b"\x89PNG\x0D\x0A\x1A\x0A", b"image/png"],
    [b"<svg ", b"image/svg+xml"],
    [b"\x00\x00\x01\x00", b"image/x-icon"],
];

/// Creates a base64 `data:` URL
pub fn create_data_url(media_type: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", media_type, BASE64_STANDARD.encode(data))
}

/// Determines the image media type from the file extension
pub fn detect_media_type_by_file_name(filename: &str) -> Option<&'static str> {
    let extension = Path::new(filename)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();

    match extension.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "svg" => Some("image/svg+xml"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Determines the image media type, falling back to magic bytes and then `image/jpeg`
pub fn detect_image_media_type(data: &[u8], filename: &str) -> &'static str {
    if let Some(media_type) = detect_media_type_by_file_name(filename) {
        return media_type;
    }

    for [signature, media_type] in IMAGE_SIGNATURES {
        if data.starts_with(signature) {
            return std::str::from_utf8(media_type).unwrap_or("image/jpeg");
        }
    }

    if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        return "image/webp";
    }

    "image/jpeg"
}

/// Returns true for sources that already point outside the local file tree
pub fn is_url_and_has_protocol(src: &str) -> bool {
    Url::parse(src)
        .map(|url| url.scheme().len() > 1)
        .unwrap_or(false)
}

/// Resolves a relative, possibly percent-encoded `src` against a base directory
pub fn resolve_local_src(base_dir: &Path, src: &str) -> Option<PathBuf> {
    let src = src.split(['?', '#']).next()?.trim();
    if src.is_empty() || is_url_and_has_protocol(src) {
        return None;
    }

    let decoded = percent_decode_str(src).decode_utf8().ok()?;
    Some(base_dir.join(decoded.as_ref()))
}

/// `file://` URL for a local path, made absolute first
pub fn file_url(path: &Path) -> Option<Url> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(path)
    };
    Url::from_file_path(absolute).ok()
}
