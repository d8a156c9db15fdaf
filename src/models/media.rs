//! In-memory image blobs moving through the ingestion pipeline.

use bytes::Bytes;

/// A file selected by the admin, held in memory until uploaded or discarded.
#[derive(Clone, Debug)]
pub struct MediaAsset {
    pub raw: Bytes,
    pub mime_type: String,
    /// Original filename as sent by the client, if any.
    pub filename: Option<String>,
}

impl MediaAsset {
    pub fn new(raw: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            mime_type: mime_type.into(),
            filename: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn size_bytes(&self) -> usize {
        self.raw.len()
    }

    /// Extension of the original filename, falling back to one derived from
    /// the MIME type. Only short ASCII-alphanumeric extensions are kept, so
    /// the object key always stays a single URL segment.
    pub fn extension(&self) -> String {
        self.filename
            .as_deref()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| is_plain_extension(ext))
            .unwrap_or_else(|| extension_for_mime(&self.mime_type).to_string())
    }
}

/// Output of the compressor.
#[derive(Clone, Debug)]
pub struct CompressedAsset {
    pub bytes: Bytes,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

impl CompressedAsset {
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

const MAX_EXTENSION_LEN: usize = 8;

fn is_plain_extension(ext: &str) -> bool {
    !ext.is_empty()
        && ext.len() <= MAX_EXTENSION_LEN
        && ext.bytes().all(|b| b.is_ascii_alphanumeric())
}

pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/svg+xml" => "svg",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_prefers_original_filename() {
        let asset = MediaAsset::new(vec![1u8], "image/png").with_filename("Photo.JPEG");
        assert_eq!(asset.extension(), "jpeg");
    }

    #[test]
    fn extension_falls_back_to_mime() {
        let asset = MediaAsset::new(vec![1u8], "image/webp").with_filename("noext");
        assert_eq!(asset.extension(), "webp");

        let asset = MediaAsset::new(vec![1u8], "application/x-unknown");
        assert_eq!(asset.extension(), "bin");
    }

    #[test]
    fn unsafe_filename_extensions_fall_back_to_mime() {
        for name in [
            "cover.png/x",
            "cover.png?v=2",
            "cover.png#top",
            "cover.p ng",
            "cover.",
            "cover.averyverylongext",
            "../../etc/passwd",
        ] {
            let asset = MediaAsset::new(vec![1u8], "image/png").with_filename(name);
            assert_eq!(asset.extension(), "png", "filename {name:?}");
        }
    }
}
