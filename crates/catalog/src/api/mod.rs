//! Catalog HTTP clients.
//!
//! One thin client per external catalog. Every call issues exactly one
//! request and yields the parsed JSON body, or `None` when the catalog
//! answers with anything other than 200.

pub mod anilist;
pub mod mangadex;
pub mod openlibrary;
pub mod transport;
pub mod types;

pub use anilist::AniListClient;
pub use mangadex::MangaDexClient;
pub use openlibrary::OpenLibraryClient;
pub use transport::{HttpTransport, RawResponse, Transport};
pub use types::*;

use crate::error::{Catalog, CatalogError, Result};
use serde_json::Value;
use tracing::warn;

/// Longest body excerpt written to the log for a failed request
const BODY_PREVIEW_CHARS: usize = 200;

/// Turn a raw response into `Some(json)` on 200 and `None` otherwise
pub(crate) fn decode(catalog: Catalog, url: &str, response: RawResponse) -> Result<Option<Value>> {
    if response.status != 200 {
        warn!(
            catalog = %catalog,
            url = %url,
            status = response.status,
            body = %preview(&response.body),
            "Catalog request failed"
        );
        return Ok(None);
    }

    serde_json::from_str(&response.body)
        .map(Some)
        .map_err(|source| CatalogError::Decode { catalog, source })
}

fn preview(body: &str) -> &str {
    match body.char_indices().nth(BODY_PREVIEW_CHARS) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_success_returns_body_unchanged() {
        let body = json!({"data": {"Page": {"media": [{"id": 20}]}}});
        let decoded = decode(
            Catalog::AniList,
            "https://graphql.anilist.co",
            RawResponse::new(200, body.to_string()),
        )
        .unwrap();
        assert_eq!(decoded, Some(body));
    }

    #[test]
    fn test_decode_non_200_is_none() {
        for status in [201, 204, 301, 404, 429, 500] {
            let decoded = decode(
                Catalog::MangaDex,
                "https://api.mangadex.org/manga/x",
                RawResponse::new(status, "{}"),
            )
            .unwrap();
            assert_eq!(decoded, None, "status {}", status);
        }
    }

    #[test]
    fn test_decode_garbage_is_error() {
        let err = decode(
            Catalog::OpenLibrary,
            "https://openlibrary.org/search.json",
            RawResponse::new(200, "<html>"),
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::Decode { .. }));
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "é".repeat(BODY_PREVIEW_CHARS + 10);
        assert_eq!(preview(&long).chars().count(), BODY_PREVIEW_CHARS);
        assert_eq!(preview("short"), "short");
    }
}
