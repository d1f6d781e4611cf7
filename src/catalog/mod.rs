//! HTTP client for an externally maintained media catalog index.
//!
//! Implements [`crate::source::CatalogIndex`] against a JSON web API:
//! the index owns the knowledge of what media exists and where; this
//! module only pages through it.

pub mod dto;
mod adapter;
mod client;

pub use client::CatalogClient;
