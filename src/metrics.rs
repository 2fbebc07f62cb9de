//! Operation metrics for quillstore.
//!
//! Counters are recorded through the `metrics` facade and become
//! visible once the embedding application installs a recorder. This
//! crate never installs one itself.

use metrics::{counter, describe_counter};
use std::sync::Once;

/// Successful storage facade operations (counter). Label: operation.
pub const STORAGE_OPERATIONS_TOTAL: &str = "quillstore_storage_operations_total";

/// Presigned URLs issued (counter). Label: verb.
pub const PRESIGNED_URLS_TOTAL: &str = "quillstore_presigned_urls_total";

static DESCRIBE: Once = Once::new();

/// Register metric descriptions with the installed recorder.
///
/// Idempotent; called once from facade construction.
pub(crate) fn describe() {
    DESCRIBE.call_once(|| {
        describe_counter!(
            STORAGE_OPERATIONS_TOTAL,
            "Successful storage facade operations"
        );
        describe_counter!(PRESIGNED_URLS_TOTAL, "Presigned URLs issued");
    });
}

/// Record one successfully completed facade operation.
pub(crate) fn record_operation(operation: &'static str) {
    counter!(STORAGE_OPERATIONS_TOTAL, "operation" => operation).increment(1);
}

/// Record one issued presigned URL.
pub(crate) fn record_presigned_url(verb: &'static str) {
    counter!(PRESIGNED_URLS_TOTAL, "verb" => verb).increment(1);
}
