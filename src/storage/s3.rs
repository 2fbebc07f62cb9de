//! S3-backed attachment store.
//!
//! Proxies attachment lifecycle operations onto an S3-compatible
//! service through the AWS SDK: single and batched deletes, HEAD-based
//! size probes, and presigned upload/download/multipart-part URLs.
//! Object bytes never flow through this process.
//!
//! Every attachment lives at the key `{user_id}/{name}`, so a user id
//! doubles as the listing prefix covering that user's "directory".
//!
//! Two client/bucket pairs are held. Presigned URLs are bound to the
//! hostname they were signed for: a URL signed for the
//! deployment-internal hostname fails signature verification when
//! fetched through the public one. Internal traffic (deletes, size
//! probes, multipart sessions) prefers the internal pair and falls
//! back to the public pair when none is configured; URLs handed to
//! end-user clients are always signed for the public pair.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, Delete, ObjectIdentifier};
use aws_sdk_s3::Client;
use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::errors::StorageError;
use crate::metrics;
use crate::storage::store::{AttachmentStore, CompleteUpload, MultipartUploadMeta};

/// Expiry applied to every presigned URL.
const PRESIGNED_URL_EXPIRY: Duration = Duration::from_secs(60 * 60);

/// Hosted deployments reject attachments at or above this many bytes.
const MAX_ATTACHMENT_SIZE: u64 = 512 * 1024 * 1024 + 1;

/// Which client/bucket pair an operation targets.
///
/// `Internal` resolves to the network-local pair when one is
/// configured and to the public pair otherwise; `External` always
/// resolves to the public pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClientMode {
    Internal,
    External,
}

/// HTTP verb a presigned URL is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UrlVerb {
    Get,
    Put,
    Head,
}

impl UrlVerb {
    fn as_str(self) -> &'static str {
        match self {
            UrlVerb::Get => "GET",
            UrlVerb::Put => "PUT",
            UrlVerb::Head => "HEAD",
        }
    }
}

/// One SDK client bound to a fixed service URL, plus the bucket it
/// addresses.
struct Endpoint {
    client: Client,
    bucket: String,
}

impl Endpoint {
    /// Build an SDK client for `service_url` with static credentials,
    /// path-style addressing and SigV4 signing. Signing behavior is
    /// fixed here per client; nothing is configured process-wide, and
    /// presigned URLs inherit the scheme of `service_url`.
    async fn connect(
        service_url: &str,
        region: &str,
        access_key_id: &str,
        secret_access_key: &str,
        bucket: String,
    ) -> Self {
        let credentials = aws_sdk_s3::config::Credentials::new(
            access_key_id,
            secret_access_key,
            None, // session token
            None, // expiry
            "quillstore-config",
        );

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .endpoint_url(service_url)
            .credentials_provider(credentials)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        Endpoint {
            client: Client::from_conf(s3_config),
            bucket,
        }
    }
}

/// S3-backed implementation of [`AttachmentStore`].
pub struct S3AttachmentStore {
    /// Public pair; always present.
    primary: Endpoint,
    /// Network-local pair; preferred for internal traffic when set.
    internal: Option<Endpoint>,
    /// Plain HTTP client executing HEAD size probes.
    http: reqwest::Client,
    /// Self-hosted deployments skip the size ceiling.
    self_hosted: bool,
}

impl S3AttachmentStore {
    /// Connect the endpoint pairs described by `config`.
    ///
    /// The internal pair is only established when the configuration
    /// carries a non-empty internal service URL; internal-mode
    /// operations fall back to the public pair otherwise.
    pub async fn new(config: &StorageConfig, self_hosted: bool) -> anyhow::Result<Self> {
        metrics::describe();

        let primary = Endpoint::connect(
            &config.service_url,
            &config.region,
            &config.access_key_id,
            &config.secret_access_key,
            config.bucket.clone(),
        )
        .await;

        let internal = match &config.internal {
            Some(internal) if !internal.service_url.is_empty() => Some(
                Endpoint::connect(
                    &internal.service_url,
                    &config.region,
                    &config.access_key_id,
                    &config.secret_access_key,
                    internal.bucket.clone(),
                )
                .await,
            ),
            _ => None,
        };

        info!(
            "attachment store ready: bucket={} internal_endpoint={} self_hosted={}",
            config.bucket,
            internal.is_some(),
            self_hosted
        );

        Ok(S3AttachmentStore {
            primary,
            internal,
            http: reqwest::Client::new(),
            self_hosted,
        })
    }

    /// Resolve the client/bucket pair for `mode`.
    fn endpoint(&self, mode: ClientMode) -> &Endpoint {
        match mode {
            ClientMode::Internal => self.internal.as_ref().unwrap_or(&self.primary),
            ClientMode::External => &self.primary,
        }
    }

    /// Presign a URL for one object, or `None` if the key is unusable.
    ///
    /// Presigning is local; the backend is not contacted.
    async fn presign_object(
        &self,
        user_id: &str,
        name: &str,
        verb: UrlVerb,
        mode: ClientMode,
    ) -> Result<Option<String>, StorageError> {
        let Some(key) = full_object_key(user_id, name) else {
            return Ok(None);
        };

        let endpoint = self.endpoint(mode);
        let presigning = PresigningConfig::expires_in(PRESIGNED_URL_EXPIRY)
            .map_err(|err| StorageError::Presign(sdk_error("presigning config", err)))?;

        let presigned = match verb {
            UrlVerb::Get => endpoint
                .client
                .get_object()
                .bucket(&endpoint.bucket)
                .key(&key)
                .presigned(presigning)
                .await
                .map_err(|err| StorageError::Presign(sdk_error("presign get_object", err)))?,
            UrlVerb::Put => endpoint
                .client
                .put_object()
                .bucket(&endpoint.bucket)
                .key(&key)
                .presigned(presigning)
                .await
                .map_err(|err| StorageError::Presign(sdk_error("presign put_object", err)))?,
            UrlVerb::Head => endpoint
                .client
                .head_object()
                .bucket(&endpoint.bucket)
                .key(&key)
                .presigned(presigning)
                .await
                .map_err(|err| StorageError::Presign(sdk_error("presign head_object", err)))?,
        };

        debug!(
            "presigned {}: bucket={} key={}",
            verb.as_str(),
            endpoint.bucket,
            key
        );
        metrics::record_presigned_url(verb.as_str());
        Ok(Some(presigned.uri().to_string()))
    }

    /// Presign a PUT URL for one part of a multipart session, signed
    /// for the internal pair.
    async fn presign_upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
    ) -> Result<String, StorageError> {
        let endpoint = self.endpoint(ClientMode::Internal);
        let presigning = PresigningConfig::expires_in(PRESIGNED_URL_EXPIRY)
            .map_err(|err| StorageError::Presign(sdk_error("presigning config", err)))?;

        let presigned = endpoint
            .client
            .upload_part()
            .bucket(&endpoint.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .presigned(presigning)
            .await
            .map_err(|err| StorageError::Presign(sdk_error("presign upload_part", err)))?;

        metrics::record_presigned_url("PUT-part");
        Ok(presigned.uri().to_string())
    }
}

impl AttachmentStore for S3AttachmentStore {
    fn delete_object(
        &self,
        user_id: &str,
        name: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + '_>> {
        let user_id = user_id.to_string();
        let name = name.to_string();
        Box::pin(async move {
            let Some(key) = full_object_key(&user_id, &name) else {
                return Err(StorageError::InvalidObjectName);
            };

            let endpoint = self.endpoint(ClientMode::Internal);
            debug!("delete_object: bucket={} key={}", endpoint.bucket, key);

            endpoint
                .client
                .delete_object()
                .bucket(&endpoint.bucket)
                .key(&key)
                .send()
                .await
                .map_err(|err| StorageError::Backend {
                    message: "Could not delete object.",
                    source: sdk_error("delete_object", err),
                })?;

            metrics::record_operation("delete_object");
            Ok(())
        })
    }

    fn delete_directory(
        &self,
        user_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + '_>> {
        // The user id is the listing prefix; no further validation
        // happens here. Callers supply authenticated user ids.
        let user_id = user_id.to_string();
        Box::pin(async move {
            let endpoint = self.endpoint(ClientMode::Internal);

            // Drain every page before deleting anything.
            let mut keys: Vec<ObjectIdentifier> = Vec::new();
            let mut continuation_token: Option<String> = None;
            loop {
                let mut request = endpoint
                    .client
                    .list_objects_v2()
                    .bucket(&endpoint.bucket)
                    .prefix(&user_id);
                if let Some(token) = &continuation_token {
                    request = request.continuation_token(token);
                }

                let response = request.send().await.map_err(|err| StorageError::Backend {
                    message: "Could not delete directory.",
                    source: sdk_error("list_objects_v2", err),
                })?;

                for object in response.contents() {
                    if let Some(key) = object.key() {
                        keys.push(
                            ObjectIdentifier::builder()
                                .key(key)
                                .build()
                                .expect("ObjectIdentifier requires key"),
                        );
                    }
                }

                match (response.is_truncated(), response.next_continuation_token()) {
                    (Some(true), Some(token)) => continuation_token = Some(token.to_string()),
                    _ => break,
                }
            }

            if keys.is_empty() {
                return Ok(());
            }

            debug!(
                "delete_directory: bucket={} prefix={} keys={}",
                endpoint.bucket,
                user_id,
                keys.len()
            );

            let delete = Delete::builder()
                .set_objects(Some(keys))
                .quiet(true)
                .build()
                .map_err(|err| StorageError::Backend {
                    message: "Could not delete directory.",
                    source: sdk_error("batch delete build", err),
                })?;

            endpoint
                .client
                .delete_objects()
                .bucket(&endpoint.bucket)
                .delete(delete)
                .send()
                .await
                .map_err(|err| StorageError::Backend {
                    message: "Could not delete directory.",
                    source: sdk_error("delete_objects", err),
                })?;

            metrics::record_operation("delete_directory");
            Ok(())
        })
    }

    fn object_size(
        &self,
        user_id: &str,
        name: &str,
    ) -> Pin<Box<dyn Future<Output = Result<u64, StorageError>> + Send + '_>> {
        let user_id = user_id.to_string();
        let name = name.to_string();
        Box::pin(async move {
            let Some(url) = self
                .presign_object(&user_id, &name, UrlVerb::Head, ClientMode::Internal)
                .await?
            else {
                return Ok(0);
            };

            let response = self.http.head(&url).send().await?;
            let size = response
                .headers()
                .get(reqwest::header::CONTENT_LENGTH)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(0);

            if !self.self_hosted && size >= MAX_ATTACHMENT_SIZE {
                warn!(
                    "attachment over size ceiling, deleting: user={} name={} size={}",
                    user_id, name, size
                );
                self.delete_object(&user_id, &name).await?;
                return Err(StorageError::ObjectTooLarge { size });
            }

            metrics::record_operation("object_size");
            Ok(size)
        })
    }

    fn upload_url(
        &self,
        user_id: &str,
        name: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, StorageError>> + Send + '_>> {
        let user_id = user_id.to_string();
        let name = name.to_string();
        Box::pin(async move {
            self.presign_object(&user_id, &name, UrlVerb::Put, ClientMode::External)
                .await
        })
    }

    fn download_url(
        &self,
        user_id: &str,
        name: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, StorageError>> + Send + '_>> {
        let user_id = user_id.to_string();
        let name = name.to_string();
        Box::pin(async move {
            self.presign_object(&user_id, &name, UrlVerb::Get, ClientMode::External)
                .await
        })
    }

    fn start_multipart_upload(
        &self,
        user_id: &str,
        name: &str,
        parts: u32,
        upload_id: Option<&str>,
    ) -> Pin<Box<dyn Future<Output = Result<MultipartUploadMeta, StorageError>> + Send + '_>> {
        let user_id = user_id.to_string();
        let name = name.to_string();
        let upload_id = upload_id.map(ToString::to_string);
        Box::pin(async move {
            let Some(key) = full_object_key(&user_id, &name) else {
                return Err(StorageError::InvalidMultipartRequest {
                    operation: "initiate",
                });
            };

            let endpoint = self.endpoint(ClientMode::Internal);

            // An empty id counts as absent so callers can resume with
            // whatever they stored, including nothing.
            let upload_id = match upload_id {
                Some(id) if !id.is_empty() => id,
                _ => {
                    let response = endpoint
                        .client
                        .create_multipart_upload()
                        .bucket(&endpoint.bucket)
                        .key(&key)
                        .send()
                        .await
                        .map_err(|err| StorageError::Backend {
                            message: "Failed to initiate multipart upload.",
                            source: sdk_error("create_multipart_upload", err),
                        })?;

                    response
                        .upload_id()
                        .ok_or_else(|| StorageError::Backend {
                            message: "Failed to initiate multipart upload.",
                            source: anyhow::anyhow!("backend returned no upload id"),
                        })?
                        .to_string()
                }
            };

            let mut urls = Vec::with_capacity(parts as usize);
            for part_number in 1..=parts {
                urls.push(
                    self.presign_upload_part(&key, &upload_id, part_number as i32)
                        .await?,
                );
            }

            debug!(
                "start_multipart_upload: bucket={} key={} upload_id={} parts={}",
                endpoint.bucket, key, upload_id, parts
            );
            metrics::record_operation("start_multipart_upload");
            Ok(MultipartUploadMeta {
                upload_id,
                parts: urls,
            })
        })
    }

    fn abort_multipart_upload(
        &self,
        user_id: &str,
        name: &str,
        upload_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + '_>> {
        let user_id = user_id.to_string();
        let name = name.to_string();
        let upload_id = upload_id.to_string();
        Box::pin(async move {
            let Some(key) = full_object_key(&user_id, &name) else {
                return Err(StorageError::InvalidMultipartRequest { operation: "abort" });
            };

            let endpoint = self.endpoint(ClientMode::Internal);
            debug!(
                "abort_multipart_upload: bucket={} key={} upload_id={}",
                endpoint.bucket, key, upload_id
            );

            endpoint
                .client
                .abort_multipart_upload()
                .bucket(&endpoint.bucket)
                .key(&key)
                .upload_id(&upload_id)
                .send()
                .await
                .map_err(|err| StorageError::Backend {
                    message: "Failed to abort multipart upload.",
                    source: sdk_error("abort_multipart_upload", err),
                })?;

            metrics::record_operation("abort_multipart_upload");
            Ok(())
        })
    }

    fn complete_multipart_upload(
        &self,
        user_id: &str,
        request: CompleteUpload,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + '_>> {
        let user_id = user_id.to_string();
        Box::pin(async move {
            // The manifest names the attachment as the client knows
            // it; rewrite to the namespaced key and internal bucket.
            let Some(key) = full_object_key(&user_id, &request.key) else {
                return Err(StorageError::InvalidMultipartRequest {
                    operation: "complete",
                });
            };

            let endpoint = self.endpoint(ClientMode::Internal);
            debug!(
                "complete_multipart_upload: bucket={} key={} upload_id={} parts={}",
                endpoint.bucket,
                key,
                request.upload_id,
                request.parts.len()
            );

            let completed_parts: Vec<CompletedPart> = request
                .parts
                .iter()
                .map(|part| {
                    CompletedPart::builder()
                        .part_number(part.part_number)
                        .e_tag(&part.etag)
                        .build()
                })
                .collect();
            let completed = CompletedMultipartUpload::builder()
                .set_parts(Some(completed_parts))
                .build();

            endpoint
                .client
                .complete_multipart_upload()
                .bucket(&endpoint.bucket)
                .key(&key)
                .upload_id(&request.upload_id)
                .multipart_upload(completed)
                .send()
                .await
                .map_err(|err| StorageError::Backend {
                    message: "Failed to complete multipart upload.",
                    source: sdk_error("complete_multipart_upload", err),
                })?;

            metrics::record_operation("complete_multipart_upload");
            Ok(())
        })
    }
}

/// True for characters the backend documents as safe in object keys.
fn is_safe_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '!' | '-' | '_' | '.' | '*' | '\'' | '(' | ')')
}

/// Derive the full object key `{user_id}/{name}`, or `None` when the
/// inputs are unusable.
///
/// The name check is a contains check (at least one safe character
/// anywhere), not a full-string match. Keys already persisted were
/// written under this exact rule, so it must not be tightened.
fn full_object_key(user_id: &str, name: &str) -> Option<String> {
    if user_id.is_empty() || !name.chars().any(is_safe_name_char) {
        return None;
    }
    Some(format!("{user_id}/{name}"))
}

/// Wrap a backend error with operation context.
fn sdk_error(context: &str, err: impl std::fmt::Display) -> anyhow::Error {
    anyhow::anyhow!("S3 {context}: {err}")
}
