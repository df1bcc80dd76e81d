use std::sync::Arc;

use bytes::Bytes;
use image::ImageFormat;
use metrics::counter;
use serde::Serialize;
use strum::{Display, EnumIter, IntoEnumIterator};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    entities::product_photo,
    errors::ServiceError,
    services::photo_store::{NewPhoto, PhotoStore},
    storage::FileStorage,
};

/// Limits applied to every uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_bytes: usize,
    pub max_files: usize,
    pub description_max_len: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            max_files: 20,
            description_max_len: 255,
        }
    }
}

impl From<&AppConfig> for UploadLimits {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            max_bytes: cfg.upload_max_bytes,
            max_files: cfg.upload_max_files,
            description_max_len: cfg.description_max_len,
        }
    }
}

/// Image formats accepted for product photos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageKind {
    pub fn format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::Gif => ImageFormat::Gif,
            Self::Webp => ImageFormat::WebP,
        }
    }

    /// `None` for formats outside the accepted set.
    pub fn from_format(format: ImageFormat) -> Option<Self> {
        Self::iter().find(|kind| kind.format() == format)
    }

    /// Detects the format from the file's leading bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        image::guess_format(bytes).ok().and_then(Self::from_format)
    }

    /// Maps a MIME type, ignoring parameters and case.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        ImageFormat::from_mime_type(essence).and_then(Self::from_format)
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        ImageFormat::from_extension(extension).and_then(Self::from_format)
    }

    /// Extension used for stored files
    pub fn extension(self) -> &'static str {
        self.format()
            .extensions_str()
            .first()
            .copied()
            .unwrap_or("img")
    }
}

/// One file received from a client
#[derive(Debug, Clone)]
pub struct IncomingUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
    pub description: Option<String>,
}

/// A file that was turned away, with every reason that applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RejectedUpload {
    /// Zero-based index of the file in the request
    pub index: usize,
    #[schema(example = "banner.bmp")]
    pub file_name: String,
    pub reasons: Vec<String>,
}

/// Result of a batch upload; photos are in request order
#[derive(Debug, Clone)]
pub struct IngestionReport {
    pub accepted: Vec<product_photo::Model>,
    pub rejected: Vec<RejectedUpload>,
}

/// An upload that passed validation
#[derive(Debug)]
struct CheckedUpload {
    kind: ImageKind,
    bytes: Bytes,
    description: Option<String>,
}

/// Turns uploaded files into gallery photos.
///
/// Batches use partial success: invalid files are reported and skipped, the
/// valid ones are stored and appended in one transaction. A batch with no
/// valid file fails as a whole. Files written for a batch whose records could
/// not be created are deleted again.
#[derive(Clone)]
pub struct UploadIngestion {
    photos: PhotoStore,
    storage: Arc<dyn FileStorage>,
    limits: UploadLimits,
}

impl UploadIngestion {
    pub fn new(photos: PhotoStore, storage: Arc<dyn FileStorage>, limits: UploadLimits) -> Self {
        Self {
            photos,
            storage,
            limits,
        }
    }

    pub fn limits(&self) -> UploadLimits {
        self.limits
    }

    /// Validates one file, returning every problem found.
    fn check(&self, upload: IncomingUpload) -> Result<CheckedUpload, Vec<String>> {
        let mut reasons = Vec::new();

        if upload.bytes.is_empty() {
            reasons.push("File is empty".to_string());
        } else if upload.bytes.len() > self.limits.max_bytes {
            reasons.push(format!(
                "File exceeds the maximum size of {} bytes",
                self.limits.max_bytes
            ));
        }

        let declared_by_type = match upload.content_type.as_deref() {
            None | Some("application/octet-stream") => None,
            Some(content_type) => match ImageKind::from_content_type(content_type) {
                Some(kind) => Some(kind),
                None => {
                    reasons.push(format!("Unsupported content type {}", content_type));
                    None
                }
            },
        };
        let declared_by_name = match upload.file_name.rsplit_once('.') {
            Some((_, extension)) => match ImageKind::from_extension(extension) {
                Some(kind) => Some(kind),
                None => {
                    reasons.push(format!("Unsupported file extension .{}", extension));
                    None
                }
            },
            None => None,
        };

        let sniffed = ImageKind::sniff(&upload.bytes);
        match sniffed {
            None if !upload.bytes.is_empty() => {
                reasons.push("File content is not a JPEG, PNG, GIF or WebP image".to_string())
            }
            Some(actual) => {
                for declared in [declared_by_type, declared_by_name].into_iter().flatten() {
                    if declared != actual {
                        reasons.push(format!(
                            "Declared type {} does not match file content ({})",
                            declared, actual
                        ));
                        break;
                    }
                }
            }
            None => {}
        }

        if let Some(description) = &upload.description {
            if description.trim().chars().count() > self.limits.description_max_len {
                reasons.push(format!(
                    "Description cannot exceed {} characters",
                    self.limits.description_max_len
                ));
            }
        }

        match sniffed {
            Some(kind) if reasons.is_empty() => Ok(CheckedUpload {
                kind,
                bytes: upload.bytes,
                description: upload.description,
            }),
            _ => Err(reasons),
        }
    }

    /// Stores and appends every valid file of a batch.
    #[instrument(skip(self, uploads), fields(count = uploads.len()))]
    pub async fn ingest(
        &self,
        product_id: Uuid,
        uploads: Vec<IncomingUpload>,
    ) -> Result<IngestionReport, ServiceError> {
        if uploads.is_empty() {
            return Err(ServiceError::ValidationError(
                "At least one photo is required".to_string(),
            ));
        }
        if uploads.len() > self.limits.max_files {
            return Err(ServiceError::ValidationError(format!(
                "At most {} photos can be uploaded at once",
                self.limits.max_files
            )));
        }
        self.photos.ensure_product(product_id).await?;

        let mut accepted = Vec::new();
        let mut rejected = Vec::new();
        for (index, upload) in uploads.into_iter().enumerate() {
            let file_name = upload.file_name.clone();
            match self.check(upload) {
                Ok(checked) => accepted.push(checked),
                Err(reasons) => rejected.push(RejectedUpload {
                    index,
                    file_name,
                    reasons,
                }),
            }
        }

        if !rejected.is_empty() {
            counter!("catalog_uploads.rejected", rejected.len() as u64);
            warn!(
                product_id = %product_id,
                rejected = rejected.len(),
                "Some uploaded files were rejected"
            );
        }
        if accepted.is_empty() {
            return Err(ServiceError::UploadRejected(rejected));
        }

        let mut new_photos = Vec::with_capacity(accepted.len());
        for checked in accepted {
            match self.store(&checked).await {
                Ok(path) => new_photos.push(NewPhoto {
                    path,
                    description: checked.description,
                }),
                Err(err) => {
                    self.discard(&new_photos).await;
                    return Err(err);
                }
            }
        }

        let written = new_photos.clone();
        let photos = match self.photos.append_batch(product_id, new_photos).await {
            Ok(photos) => photos,
            Err(err) => {
                self.discard(&written).await;
                return Err(err);
            }
        };

        counter!("catalog_uploads.accepted", photos.len() as u64);
        info!(
            product_id = %product_id,
            accepted = photos.len(),
            rejected = rejected.len(),
            "Batch upload ingested"
        );
        Ok(IngestionReport {
            accepted: photos,
            rejected,
        })
    }

    /// Stores and appends one file; any validation problem fails the call.
    #[instrument(skip(self, upload), fields(file_name = %upload.file_name))]
    pub async fn ingest_single(
        &self,
        product_id: Uuid,
        upload: IncomingUpload,
    ) -> Result<product_photo::Model, ServiceError> {
        self.photos.ensure_product(product_id).await?;

        let checked = self
            .check(upload)
            .map_err(|reasons| ServiceError::ValidationError(reasons.join("; ")))?;
        let path = self.store(&checked).await?;

        match self
            .photos
            .append(product_id, path.clone(), checked.description)
            .await
        {
            Ok(photo) => {
                counter!("catalog_uploads.accepted", 1);
                info!(product_id = %product_id, photo_id = %photo.id, "Photo uploaded");
                Ok(photo)
            }
            Err(err) => {
                self.photos.discard_files(&[path]).await;
                Err(err)
            }
        }
    }

    async fn store(&self, checked: &CheckedUpload) -> Result<String, ServiceError> {
        let suggested = format!("upload.{}", checked.kind.extension());
        self.storage
            .store(checked.bytes.clone(), &suggested)
            .await
            .map_err(|e| {
                counter!("catalog_uploads.storage_failures", 1);
                warn!(error = %e, "Failed to store uploaded file");
                ServiceError::from(e)
            })
    }

    async fn discard(&self, written: &[NewPhoto]) {
        let paths: Vec<String> = written.iter().map(|photo| photo.path.clone()).collect();
        self.photos.discard_files(&paths).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0];

    #[rstest]
    #[case(JPEG, Some(ImageKind::Jpeg))]
    #[case(PNG, Some(ImageKind::Png))]
    #[case(b"GIF89a....", Some(ImageKind::Gif))]
    #[case(b"GIF87a....", Some(ImageKind::Gif))]
    #[case(b"RIFF\x10\0\0\0WEBPVP8 ", Some(ImageKind::Webp))]
    #[case(b"RIFF\x10\0\0\0WAVEfmt ", None)]
    #[case(b"BM\0\0\0\0\0\0\0\0\0\0\0\0", None)]
    #[case(b"", None)]
    fn sniffs_accepted_formats_only(#[case] bytes: &[u8], #[case] expected: Option<ImageKind>) {
        assert_eq!(ImageKind::sniff(bytes), expected);
    }

    #[rstest]
    #[case("jpg", Some(ImageKind::Jpeg))]
    #[case("JPEG", Some(ImageKind::Jpeg))]
    #[case("Png", Some(ImageKind::Png))]
    #[case("webp", Some(ImageKind::Webp))]
    #[case("bmp", None)]
    #[case("tiff", None)]
    fn maps_extensions(#[case] extension: &str, #[case] expected: Option<ImageKind>) {
        assert_eq!(ImageKind::from_extension(extension), expected);
    }

    #[test]
    fn maps_content_types_with_parameters() {
        assert_eq!(
            ImageKind::from_content_type("image/png; charset=binary"),
            Some(ImageKind::Png)
        );
        assert_eq!(ImageKind::from_content_type("Image/JPEG"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_content_type("image/bmp"), None);
        assert_eq!(ImageKind::from_content_type("text/plain"), None);
    }

    #[test]
    fn stored_extensions_come_from_the_format() {
        let extensions: Vec<_> = ImageKind::iter().map(ImageKind::extension).collect();
        assert_eq!(extensions, vec!["jpg", "png", "gif", "webp"]);
    }
}
