use axum::body::Bytes;
use axum::extract::Multipart;
use axum_helpers::AppError;
use core_config::uploads::{UploadConfig, DEFAULT_MAX_FILE_BYTES, DEFAULT_MAX_IMAGES_PER_PRODUCT};

use crate::error::ProductError;

/// Multipart field name carrying the image files
pub const FILES_FIELD: &str = "files";

/// Per-product image limits enforced by the upload flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_file_bytes: u64,
    pub max_images_per_product: usize,
}

impl UploadLimits {
    /// Largest request body the upload route must accept: every file at the
    /// size limit plus 1 MiB of multipart framing.
    pub fn body_limit(&self) -> usize {
        let files = self
            .max_file_bytes
            .saturating_mul(self.max_images_per_product as u64);
        usize::try_from(files.saturating_add(1024 * 1024)).unwrap_or(usize::MAX)
    }
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_images_per_product: DEFAULT_MAX_IMAGES_PER_PRODUCT,
        }
    }
}

impl From<&UploadConfig> for UploadLimits {
    fn from(config: &UploadConfig) -> Self {
        Self {
            max_file_bytes: config.max_file_bytes,
            max_images_per_product: config.max_images_per_product,
        }
    }
}

/// A file part read from a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    /// Observed size in bytes, counted even past the size limit
    pub size: u64,
    /// Buffered content; empty when `size` exceeded the limit
    pub data: Bytes,
}

impl UploadedFile {
    pub fn new(
        file_name: Option<&str>,
        content_type: Option<&str>,
        data: impl Into<Bytes>,
    ) -> Self {
        let data = data.into();
        Self {
            file_name: file_name.map(str::to_string),
            content_type: content_type.map(str::to_string),
            size: data.len() as u64,
            data,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn is_image(&self) -> bool {
        is_image(self.content_type.as_deref())
    }
}

/// Whether a declared content type is an `image/*` type.
pub fn is_image(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.starts_with("image/"))
}

/// Read every `files` part of a multipart body, in submission order.
///
/// Parts are consumed chunk by chunk. Once a part grows past
/// `max_file_bytes` its buffer is dropped and only its size keeps being
/// counted, so memory use stays bounded by the limit. Parts with other names
/// are skipped. Reading stops with `TooManyImages` as soon as a part beyond
/// `max_images_per_product` starts, before its content is consumed.
pub async fn read_files(
    multipart: &mut Multipart,
    limits: UploadLimits,
) -> Result<Vec<UploadedFile>, AppError> {
    let max_file_bytes = limits.max_file_bytes;
    let mut files = Vec::new();

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }
        if files.len() >= limits.max_images_per_product {
            return Err(ProductError::TooManyImages(limits.max_images_per_product).into());
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let mut size: u64 = 0;
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = field.chunk().await? {
            size += chunk.len() as u64;
            if size <= max_file_bytes {
                buffer.extend_from_slice(&chunk);
            } else if !buffer.is_empty() {
                buffer = Vec::new();
            }
        }

        tracing::debug!(?file_name, ?content_type, size, "Read upload part");

        files.push(UploadedFile {
            file_name,
            content_type,
            size,
            data: Bytes::from(buffer),
        });
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::post,
        Json, Router,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const BOUNDARY: &str = "X-UPLOAD-BOUNDARY";

    fn part(name: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
        let mut out = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        out.extend_from_slice(data);
        out.extend_from_slice(b"\r\n");
        out
    }

    fn limits(max_file_bytes: u64) -> UploadLimits {
        UploadLimits {
            max_file_bytes,
            max_images_per_product: 5,
        }
    }

    fn read_router(limits: UploadLimits) -> Router {
        Router::new().route(
            "/",
            post(move |mut multipart: Multipart| async move {
                let files = read_files(&mut multipart, limits).await?;
                Ok::<_, AppError>(Json(
                    files
                        .into_iter()
                        .map(|f| (f.file_name, f.size, f.data.len()))
                        .collect::<Vec<_>>(),
                ))
            }),
        )
    }

    fn multipart_post(body: Vec<u8>) -> Request<Body> {
        Request::post("/")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn read_with_limit(body: Vec<u8>, limit: u64) -> Vec<(Option<String>, u64, usize)> {
        let response = read_router(limits(limit))
            .oneshot(multipart_post(body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_is_image() {
        assert!(is_image(Some("image/png")));
        assert!(is_image(Some("image/jpeg")));
        assert!(!is_image(Some("text/plain")));
        assert!(!is_image(None));
    }

    #[test]
    fn test_limits_from_upload_config() {
        let mut config = UploadConfig::new("uploads");
        config.max_file_bytes = 2048;
        config.max_images_per_product = 3;
        assert_eq!(
            UploadLimits::from(&config),
            UploadLimits {
                max_file_bytes: 2048,
                max_images_per_product: 3,
            }
        );
        assert_eq!(
            UploadLimits::from(&UploadConfig::default()),
            UploadLimits::default()
        );
    }

    #[test]
    fn test_body_limit() {
        let limits = UploadLimits::default();
        assert_eq!(limits.body_limit(), 51 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_read_files_keeps_order_and_skips_other_fields() {
        let mut body = Vec::new();
        body.extend(part("files", "a.png", "image/png", b"aaaa"));
        body.extend(part("note", "n.txt", "text/plain", b"ignored"));
        body.extend(part("files", "b.png", "image/png", b"bb"));
        body.extend(format!("--{BOUNDARY}--\r\n").into_bytes());

        let files = read_with_limit(body, 1024).await;
        assert_eq!(
            files,
            vec![
                (Some("a.png".to_string()), 4, 4),
                (Some("b.png".to_string()), 2, 2),
            ]
        );
    }

    #[tokio::test]
    async fn test_read_files_drops_oversize_content_but_counts_size() {
        let mut body = Vec::new();
        body.extend(part("files", "big.png", "image/png", &[7u8; 64]));
        body.extend(format!("--{BOUNDARY}--\r\n").into_bytes());

        let files = read_with_limit(body, 16).await;
        assert_eq!(files, vec![(Some("big.png".to_string()), 64, 0)]);
    }

    #[tokio::test]
    async fn test_read_files_stops_at_first_part_past_the_limit() {
        let mut body = Vec::new();
        for i in 0..3 {
            body.extend(part("files", &format!("{i}.png"), "image/png", b"img"));
        }
        body.extend(format!("--{BOUNDARY}--\r\n").into_bytes());

        let response = read_router(UploadLimits {
            max_file_bytes: 1024,
            max_images_per_product: 2,
        })
        .oneshot(multipart_post(body))
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let error: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(error["message"], "You can upload maximum 2 images");
    }
}
