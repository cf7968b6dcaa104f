//! Catalog clients for AniList, MangaDex and OpenLibrary.
//!
//! The [`api`] clients fetch raw JSON from each catalog; the [`data`]
//! wrappers turn one item into a validated, normalized record.

pub mod api;
pub mod cache;
pub mod data;
pub mod error;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use api::{AniListClient, AnimeSummary, HttpTransport, MangaDexClient, OpenLibraryClient, RawResponse, Transport};
pub use cache::{CacheStats, SearchCache};
pub use data::{AnimeData, BookData, MangaData};
pub use error::{Catalog, CatalogError, Result};
