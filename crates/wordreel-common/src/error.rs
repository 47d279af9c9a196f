//! Common error types used throughout wordreel.
//!
//! Every failure of an external call carries a classification that the
//! pipeline controller pattern-matches on to decide between credential
//! rotation, same-credential retry, and marking the project failed.

/// Common error type for wordreel.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The plan or a request was malformed. Fatal, never retried.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The external service rejected the call due to quota exhaustion.
    /// Recoverable by rotating to a different credential.
    #[error("Rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// A network-level failure (timeout, connection reset). Recoverable
    /// with the same credential, bounded.
    #[error("Transient network error: {0}")]
    TransientNetwork(String),

    /// An upstream artifact was expected on disk but is absent. Indicates
    /// a regeneration-planner or provenance bug; never retried.
    #[error("Expected artifact missing: {0}")]
    ResourceMissing(String),

    /// Every credential in the pool is cooling down and the bounded wait
    /// was exceeded.
    #[error("No credential available")]
    NoCredentialAvailable,

    /// The requested project (or other record) was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal invariant was violated.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new Validation error.
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new TransientNetwork error.
    pub fn transient<S: Into<String>>(msg: S) -> Self {
        Self::TransientNetwork(msg.into())
    }

    /// Create a new ResourceMissing error.
    pub fn resource_missing<S: Into<String>>(msg: S) -> Self {
        Self::ResourceMissing(msg.into())
    }

    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new Database error.
    pub fn database<S: Into<String>>(msg: S) -> Self {
        Self::Database(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error can be recovered by rotating credentials.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Whether this error can be recovered by retrying the same credential.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientNetwork(_))
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
