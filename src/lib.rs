//! quillstore -- S3 attachment storage facade for a note-sync server.
//!
//! Mediates all attachment traffic between the sync server and an
//! S3-compatible object store. Object bytes never pass through this
//! crate: clients upload and download directly against presigned URLs.
//! What lives here is key derivation and validation, URL issuance,
//! single and per-user batch deletes, the hosted-deployment size
//! ceiling, and multipart upload session lifecycle.

pub mod common;
pub mod config;
pub mod data;
pub mod errors;
pub mod metrics;
pub mod storage;

pub use config::{load_config, Config};
pub use errors::StorageError;
pub use storage::s3::S3AttachmentStore;
pub use storage::store::{AttachmentStore, CompleteUpload, MultipartUploadMeta, UploadedPart};
