//! Attachment storage.
//!
//! The [`store::AttachmentStore`] trait abstracts over where
//! attachments physically live; [`s3::S3AttachmentStore`] is the
//! S3-compatible implementation used in every real deployment.

pub mod s3;
pub mod store;
