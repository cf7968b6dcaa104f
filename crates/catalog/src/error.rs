//! Error types for catalog access.

use thiserror::Error;

/// External catalog an error or request belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Catalog {
    AniList,
    MangaDex,
    OpenLibrary,
}

impl std::fmt::Display for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Catalog::AniList => write!(f, "AniList"),
            Catalog::MangaDex => write!(f, "MangaDex"),
            Catalog::OpenLibrary => write!(f, "OpenLibrary"),
        }
    }
}

/// Errors raised while talking to a catalog or normalizing its payloads
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The request never produced a response (connect, timeout, TLS)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A 200 response whose body is not JSON
    #[error("{catalog} returned a body that is not JSON: {source}")]
    Decode {
        catalog: Catalog,
        #[source]
        source: serde_json::Error,
    },

    /// The catalog has no such item (non-200 status or empty payload)
    #[error("{catalog} has no item {id}")]
    NotFound { catalog: Catalog, id: String },

    /// The payload is JSON but not in the expected shape
    #[error("{catalog} returned an unexpected payload: {reason}")]
    InvalidPayload { catalog: Catalog, reason: String },
}

impl CatalogError {
    pub(crate) fn not_found(catalog: Catalog, id: impl Into<String>) -> Self {
        CatalogError::NotFound {
            catalog,
            id: id.into(),
        }
    }

    pub(crate) fn invalid(catalog: Catalog, reason: impl std::fmt::Display) -> Self {
        CatalogError::InvalidPayload {
            catalog,
            reason: reason.to_string(),
        }
    }

    /// Whether the error means "no such item" rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound { .. })
    }
}

/// Result alias for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;
