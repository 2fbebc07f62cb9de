//! Contracts shared across the sync-server services.

pub mod client;
