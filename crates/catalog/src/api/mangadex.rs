//! MangaDex REST client.

use super::{decode, Transport};
use crate::error::{Catalog, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// MangaDex client
pub struct MangaDexClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    uploads_url: String,
}

impl MangaDexClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.mangadex.org";
    pub const DEFAULT_UPLOADS_URL: &'static str = "https://uploads.mangadex.org";

    /// Create a new client; `uploads_url` is the host cover images live on
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        uploads_url: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            uploads_url: uploads_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Option<Value>> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.transport.get(&url, query).await?;
        decode(Catalog::MangaDex, &url, response)
    }

    /// Fetch one manga with its cover relationship expanded
    pub async fn get_manga(&self, manga_id: &str) -> Result<Option<Value>> {
        debug!(manga_id = %manga_id, "Fetching manga");
        self.get(&format!("/manga/{}", manga_id), &[("includes[]", "cover_art")])
            .await
    }

    /// Free-text title search
    pub async fn search_manga(&self, title: &str) -> Result<Option<Value>> {
        info!(title = %title, "Searching manga");
        self.get("/manga", &[("title", title)]).await
    }

    /// Fetch a cover record (holds the image file name)
    pub async fn get_cover(&self, cover_id: &str) -> Result<Option<Value>> {
        debug!(cover_id = %cover_id, "Fetching cover");
        self.get(&format!("/cover/{}", cover_id), &[]).await
    }

    /// Fetch the chapter feed of a manga
    pub async fn get_chapter_list(&self, manga_id: &str) -> Result<Option<Value>> {
        debug!(manga_id = %manga_id, "Fetching chapter feed");
        self.get(&format!("/manga/{}/feed", manga_id), &[]).await
    }

    /// Public URL of a cover image
    pub fn cover_art_url(&self, manga_id: &str, file_name: &str) -> String {
        format!("{}/covers/{}/{}", self.uploads_url, manga_id, file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubTransport;
    use serde_json::json;

    const BASE: &str = "https://mangadex.test";
    const UPLOADS: &str = "https://uploads.mangadex.test/";
    const BERSERK: &str = "801513ba-a712-498c-8f57-cae55b38cc92";

    #[tokio::test]
    async fn test_get_manga_requests_cover_expansion() {
        let body = json!({"result": "ok", "data": {"id": BERSERK}});
        let stub = Arc::new(StubTransport::new().on_get(
            &format!("{}/manga/{}", BASE, BERSERK),
            200,
            body.clone(),
        ));
        let client = MangaDexClient::new(stub.clone(), BASE, UPLOADS);

        assert_eq!(client.get_manga(BERSERK).await.unwrap(), Some(body));
        assert_eq!(
            stub.calls()[0].query,
            vec![("includes[]".to_string(), "cover_art".to_string())]
        );
    }

    #[tokio::test]
    async fn test_every_endpoint_is_none_on_error_status() {
        let stub = Arc::new(
            StubTransport::new()
                .on_get(&format!("{}/manga", BASE), 400, json!({"result": "error"}))
                .on_get(&format!("{}/cover/c1", BASE), 404, json!({"result": "error"}))
                .on_get(
                    &format!("{}/manga/{}/feed", BASE, BERSERK),
                    500,
                    json!({"result": "error"}),
                ),
        );
        let client = MangaDexClient::new(stub, BASE, UPLOADS);

        assert_eq!(client.search_manga("Berserk").await.unwrap(), None);
        assert_eq!(client.get_cover("c1").await.unwrap(), None);
        assert_eq!(client.get_chapter_list(BERSERK).await.unwrap(), None);
        assert_eq!(client.get_manga("unknown").await.unwrap(), None);
    }

    #[test]
    fn test_cover_art_url() {
        let client = MangaDexClient::new(Arc::new(StubTransport::new()), BASE, UPLOADS);
        assert_eq!(
            client.cover_art_url(BERSERK, "cover.jpg"),
            format!("https://uploads.mangadex.test/covers/{}/cover.jpg", BERSERK)
        );
    }
}
