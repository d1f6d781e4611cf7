//! Engine-wide error types.
//!
//! Library modules use specific error types via `thiserror`, while
//! CLI/main uses `anyhow` for convenient error propagation.
//!
//! # Design
//!
//! - [`ProviderError`]: what a provider reports to its controller. The
//!   three variants carry the retry policy: configuration problems are
//!   fatal, fetch problems are retried opportunistically, and an empty
//!   result is fatal only while initializing.
//! - [`FetchError`]: a failed call to an external collaborator (folder
//!   browse, catalog query, geocode).

/// Result alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// A failed request to an external collaborator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// Transport-level failure (DNS, connect, TLS, aborted body).
    #[error("network error: {0}")]
    Network(String),

    /// The collaborator answered but the request was rejected.
    #[error("API error: {0}")]
    Api(String),

    /// The response body could not be decoded.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// The collaborator asked us to back off.
    #[error("rate limited - try again later")]
    RateLimited,
}

/// Top-level provider error.
///
/// The variant determines the recovery policy (see module docs).
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Missing or invalid configuration. Fatal to `initialize()`, no retry.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A collaborator call failed. Recoverable; retried on the next
    /// refill or navigation step. Never escalates a ready provider.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// A scan or query produced zero usable items. Fatal only during
    /// `initialize()`; during refills this is "nothing new".
    #[error("no usable media items: {0}")]
    EmptyResult(String),
}

impl ProviderError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create an empty-result error.
    pub fn empty(message: impl Into<String>) -> Self {
        Self::EmptyResult(message.into())
    }
}
