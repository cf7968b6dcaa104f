//! OpenLibrary REST client.

use super::{decode, Transport};
use crate::error::{Catalog, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// OpenLibrary client
pub struct OpenLibraryClient {
    transport: Arc<dyn Transport>,
    base_url: String,
}

impl OpenLibraryClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://openlibrary.org";

    /// Create a new client against `base_url`
    pub fn new(transport: Arc<dyn Transport>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fetch book data by ISBN
    ///
    /// The body is an object keyed by `ISBN:{isbn}`, empty when the ISBN is
    /// unknown.
    pub async fn get_book(&self, isbn: &str) -> Result<Option<Value>> {
        debug!(isbn = %isbn, "Fetching book");
        let url = format!("{}/api/books", self.base_url);
        let bibkeys = bibkey(isbn);
        let response = self
            .transport
            .get(
                &url,
                &[
                    ("bibkeys", bibkeys.as_str()),
                    ("format", "json"),
                    ("jscmd", "data"),
                ],
            )
            .await?;
        decode(Catalog::OpenLibrary, &url, response)
    }

    /// Free-text title search
    pub async fn search_book(&self, title: &str) -> Result<Option<Value>> {
        info!(title = %title, "Searching books");
        let url = format!("{}/search.json", self.base_url);
        let response = self.transport.get(&url, &[("title", title)]).await?;
        decode(Catalog::OpenLibrary, &url, response)
    }

    /// Medium cover URL of a book, if OpenLibrary has one
    pub async fn get_cover(&self, isbn: &str) -> Result<Option<String>> {
        let Some(body) = self.get_book(isbn).await? else {
            return Ok(None);
        };

        let cover = body
            .get(bibkey(isbn))
            .and_then(|book| book.get("cover"))
            .and_then(|cover| cover.get("medium"))
            .and_then(Value::as_str)
            .map(str::to_string);

        if cover.is_none() {
            debug!(isbn = %isbn, "No cover found");
        }
        Ok(cover)
    }
}

/// Key OpenLibrary uses for an ISBN, both in the query and the response
pub(crate) fn bibkey(isbn: &str) -> String {
    format!("ISBN:{}", isbn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubTransport;
    use serde_json::json;

    const BASE: &str = "https://openlibrary.test";

    fn dune() -> Value {
        json!({
            "ISBN:9780441013593": {
                "title": "Dune",
                "publish_date": "2005",
                "number_of_pages": 896,
                "cover": {
                    "small": "https://covers.openlibrary.org/b/id/1-S.jpg",
                    "medium": "https://covers.openlibrary.org/b/id/1-M.jpg",
                    "large": "https://covers.openlibrary.org/b/id/1-L.jpg"
                }
            }
        })
    }

    #[tokio::test]
    async fn test_get_book_returns_body_unchanged() {
        let stub = Arc::new(StubTransport::new().on_get(
            &format!("{}/api/books", BASE),
            200,
            dune(),
        ));
        let client = OpenLibraryClient::new(stub.clone(), BASE);

        let body = client.get_book("9780441013593").await.unwrap();
        assert_eq!(body, Some(dune()));

        let calls = stub.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0]
            .query
            .contains(&("bibkeys".to_string(), "ISBN:9780441013593".to_string())));
    }

    #[tokio::test]
    async fn test_non_200_is_none() {
        let stub = Arc::new(
            StubTransport::new()
                .on_get(&format!("{}/search.json", BASE), 503, json!({"error": "down"})),
        );
        let client = OpenLibraryClient::new(stub, BASE);

        assert_eq!(client.search_book("Dune").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_cover() {
        let stub = Arc::new(StubTransport::new().on_get(
            &format!("{}/api/books", BASE),
            200,
            dune(),
        ));
        let client = OpenLibraryClient::new(stub, BASE);

        assert_eq!(
            client.get_cover("9780441013593").await.unwrap().as_deref(),
            Some("https://covers.openlibrary.org/b/id/1-M.jpg")
        );
        // Entry for a different ISBN is not in the body
        assert_eq!(client.get_cover("0000000000").await.unwrap(), None);
    }
}
