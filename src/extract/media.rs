use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Pdf,
}

impl MediaKind {
    /// Detects the upload kind from the declared content type, the file
    /// name and the leading bytes. Anything other than PNG, JPEG or PDF
    /// is `None`.
    pub fn detect(content_type: Option<&str>, file_name: Option<&str>, bytes: &[u8]) -> Option<Self> {
        let content_type = content_type.unwrap_or("").to_ascii_lowercase();
        let extension = file_name
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        if content_type.contains("application/pdf") || extension == "pdf" || bytes.starts_with(b"%PDF-") {
            return Some(MediaKind::Pdf);
        }

        let image_type = matches!(content_type.as_str(), "image/png" | "image/jpeg" | "image/jpg");
        let image_ext = matches!(extension.as_str(), "png" | "jpg" | "jpeg");
        let image_magic = matches!(
            image::guess_format(bytes),
            Ok(image::ImageFormat::Png) | Ok(image::ImageFormat::Jpeg)
        );
        if image_type || image_ext || image_magic {
            return Some(MediaKind::Image);
        }

        None
    }
}
