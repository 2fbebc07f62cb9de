//! Error types for the attachment storage facade.
//!
//! Every failure a caller can observe maps to one [`StorageError`]
//! variant. Messages are fixed per operation so API layers can relay
//! them to clients verbatim; the underlying SDK error rides along as a
//! `source` for logs.

use thiserror::Error;

/// Errors surfaced by the attachment storage facade.
///
/// URL getters never use the invalid-key variants: an unusable key
/// makes them resolve to `None`, and the size probe resolves to `0`.
/// Mutating operations fail loudly instead. The asymmetry is part of
/// the public contract.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The user id or attachment name failed object-key validation.
    #[error("Invalid object name.")]
    InvalidObjectName,

    /// A multipart call carried an unusable user id or object name.
    #[error("Could not {operation} multipart upload.")]
    InvalidMultipartRequest {
        /// The requested operation: "initiate", "abort" or "complete".
        operation: &'static str,
    },

    /// The backend rejected or failed an operation.
    #[error("{message}")]
    Backend {
        /// Fixed caller-facing message naming the failed operation.
        message: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// A size probe reported a size at or above the enforced ceiling.
    ///
    /// The offending object has already been deleted from the backend
    /// by the time this is returned.
    #[error("File size exceeds the maximum allowed size.")]
    ObjectTooLarge {
        /// Size in bytes reported by the backend.
        size: u64,
    },

    /// The HEAD request of a size probe could not be completed.
    #[error("Could not read object size.")]
    SizeProbe(#[from] reqwest::Error),

    /// Presigned URL generation failed inside the SDK.
    #[error("Could not generate presigned URL.")]
    Presign(#[source] anyhow::Error),
}
