//! Persistence contracts.

pub mod context;
