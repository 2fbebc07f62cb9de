//! Attachment store contract and multipart wire types.
//!
//! API layers depend on [`AttachmentStore`] rather than the concrete
//! S3 implementation so tests can substitute doubles. Methods are
//! manually desugared async (pinned boxed futures) to keep the trait
//! object-safe.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

use crate::errors::StorageError;

/// Metadata returned when a multipart upload session is started or
/// resumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultipartUploadMeta {
    /// Backend-issued id of the multipart session.
    pub upload_id: String,

    /// One presigned part-PUT URL per part, in part-number order
    /// (part 1 first).
    pub parts: Vec<String>,
}

/// Caller-supplied manifest finishing a multipart upload.
///
/// `key` is the attachment name as the uploading client knows it. The
/// store rewrites it into the namespaced object key and fills in the
/// internal bucket before submitting; callers only describe what they
/// uploaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteUpload {
    /// Attachment name, not yet namespaced.
    pub key: String,

    /// Backend-issued id of the multipart session.
    pub upload_id: String,

    /// ETag manifest for every uploaded part, ascending part order.
    pub parts: Vec<UploadedPart>,
}

/// One entry of a multipart completion manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedPart {
    /// 1-based part number.
    pub part_number: i32,

    /// ETag the backend returned when this part was uploaded.
    pub etag: String,
}

/// Async attachment storage contract.
///
/// Operations split into two failure styles, and the split is part of
/// the public contract:
///
/// * URL getters resolve to `Ok(None)` and the size probe to `Ok(0)`
///   when the object key is unusable; the backend is never contacted
///   for an unusable key.
/// * Deletes and multipart operations fail with a typed
///   [`StorageError`] instead.
pub trait AttachmentStore: Send + Sync + 'static {
    /// Delete a single attachment.
    fn delete_object(
        &self,
        user_id: &str,
        name: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + '_>>;

    /// Delete every attachment belonging to `user_id`.
    ///
    /// All keys under the user's prefix are listed first; a single
    /// batch delete then removes them. No keys is a successful no-op.
    fn delete_directory(
        &self,
        user_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + '_>>;

    /// Probe the stored size of an attachment in bytes.
    ///
    /// Resolves to `0` for an unusable key. On hosted deployments an
    /// object at or above the size ceiling is deleted and the probe
    /// fails with [`StorageError::ObjectTooLarge`].
    fn object_size(
        &self,
        user_id: &str,
        name: &str,
    ) -> Pin<Box<dyn Future<Output = Result<u64, StorageError>> + Send + '_>>;

    /// Presigned PUT URL for uploading one attachment, valid for one
    /// hour, signed for the public endpoint. `None` if the key is
    /// unusable.
    fn upload_url(
        &self,
        user_id: &str,
        name: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, StorageError>> + Send + '_>>;

    /// Presigned GET URL for downloading one attachment, valid for one
    /// hour, signed for the public endpoint. `None` if the key is
    /// unusable.
    fn download_url(
        &self,
        user_id: &str,
        name: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, StorageError>> + Send + '_>>;

    /// Start a multipart upload session, or resume one when a
    /// non-empty `upload_id` is supplied, and presign one part-PUT URL
    /// per part number `1..=parts`.
    fn start_multipart_upload(
        &self,
        user_id: &str,
        name: &str,
        parts: u32,
        upload_id: Option<&str>,
    ) -> Pin<Box<dyn Future<Output = Result<MultipartUploadMeta, StorageError>> + Send + '_>>;

    /// Abort a multipart upload session.
    fn abort_multipart_upload(
        &self,
        user_id: &str,
        name: &str,
        upload_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + '_>>;

    /// Complete a multipart upload session from a caller manifest.
    fn complete_multipart_upload(
        &self,
        user_id: &str,
        request: CompleteUpload,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_upload_manifest_parses_from_json() {
        let manifest: CompleteUpload = serde_json::from_str(
            r#"{
                "key": "attachment-01.bin",
                "upload_id": "upl-93fd01",
                "parts": [
                    { "part_number": 1, "etag": "\"9bb58f26192e4ba00f01e2e7b136bbd8\"" },
                    { "part_number": 2, "etag": "\"5d41402abc4b2a76b9719d911017c592\"" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(manifest.key, "attachment-01.bin");
        assert_eq!(manifest.upload_id, "upl-93fd01");
        assert_eq!(manifest.parts.len(), 2);
        assert_eq!(manifest.parts[0].part_number, 1);
        assert_eq!(
            manifest.parts[1].etag,
            "\"5d41402abc4b2a76b9719d911017c592\""
        );
    }

    #[test]
    fn test_multipart_meta_serializes_for_api_responses() {
        let meta = MultipartUploadMeta {
            upload_id: "upl-93fd01".to_string(),
            parts: vec!["https://example.com/p1".to_string()],
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["upload_id"], "upl-93fd01");
        assert_eq!(json["parts"][0], "https://example.com/p1");
    }
}
