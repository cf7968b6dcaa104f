//! Catalog response types.
//!
//! Only the fields the wrappers read are modelled; everything else in the
//! upstream payloads is ignored.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// ========== AniList ==========

/// GraphQL response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

/// `data` of the single-media query
#[derive(Debug, Clone, Deserialize)]
pub struct MediaData {
    #[serde(rename = "Media")]
    pub media: Option<AniListMedia>,
}

/// One AniList media entry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AniListMedia {
    pub id: i64,
    pub title: MediaTitle,
    pub cover_image: Option<CoverImage>,
    pub status: Option<String>,
    pub start_date: Option<FuzzyDate>,
    pub description: Option<String>,
    pub episodes: Option<i64>,
    pub duration: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaTitle {
    pub romaji: Option<String>,
    pub english: Option<String>,
    pub native: Option<String>,
}

impl MediaTitle {
    /// English title, else romaji, else native
    pub fn preferred(&self) -> Option<&str> {
        [&self.english, &self.romaji, &self.native]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoverImage {
    pub large: Option<String>,
    pub medium: Option<String>,
    pub color: Option<String>,
}

/// AniList partial date
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FuzzyDate {
    pub year: Option<i32>,
    pub month: Option<i32>,
    pub day: Option<i32>,
}

/// Trimmed search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimeSummary {
    pub id: Option<i64>,
    pub title: String,
    pub description: String,
    pub cover_image: Option<String>,
}

// ========== MangaDex ==========

/// `GET /manga/{id}` body
#[derive(Debug, Clone, Deserialize)]
pub struct MangaEntity {
    pub data: MangaResource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MangaResource {
    pub id: String,
    pub attributes: MangaAttributes,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MangaAttributes {
    #[serde(default, deserialize_with = "localized")]
    pub title: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "localized")]
    pub description: BTreeMap<String, String>,
    pub year: Option<i32>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Relationship {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub attributes: Option<Value>,
}

impl Relationship {
    /// `fileName` of an expanded cover_art relationship
    pub fn cover_file_name(&self) -> Option<&str> {
        self.attributes
            .as_ref()
            .and_then(|a| a.get("fileName"))
            .and_then(Value::as_str)
    }
}

/// `GET /cover/{id}` body
#[derive(Debug, Clone, Deserialize)]
pub struct CoverEntity {
    pub data: CoverResource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoverResource {
    pub id: String,
    pub attributes: CoverAttributes,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoverAttributes {
    #[serde(rename = "fileName")]
    pub file_name: String,
}

/// `GET /manga/{id}/feed` body
#[derive(Debug, Clone, Deserialize)]
pub struct ChapterFeed {
    #[serde(default)]
    pub data: Vec<Value>,
    pub total: Option<i64>,
}

/// MangaDex sends `[]` instead of `{}` for empty localized strings
fn localized<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Localized {
        Map(BTreeMap<String, String>),
        List(Vec<Value>),
    }

    Ok(match Localized::deserialize(deserializer)? {
        Localized::Map(map) => map,
        Localized::List(_) => BTreeMap::new(),
    })
}

// ========== OpenLibrary ==========

/// One entry of `GET /api/books?jscmd=data`
#[derive(Debug, Clone, Deserialize)]
pub struct OpenLibraryBook {
    pub title: String,
    pub subtitle: Option<String>,
    pub publish_date: Option<String>,
    pub number_of_pages: Option<i64>,
    pub cover: Option<BookCover>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookCover {
    pub small: Option<String>,
    pub medium: Option<String>,
    pub large: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_preferred_title_order() {
        let title = MediaTitle {
            romaji: Some("Shingeki no Kyojin".to_string()),
            english: Some("Attack on Titan".to_string()),
            native: Some("進撃の巨人".to_string()),
        };
        assert_eq!(title.preferred(), Some("Attack on Titan"));

        let title = MediaTitle {
            romaji: Some("Gintama".to_string()),
            english: Some("  ".to_string()),
            native: None,
        };
        assert_eq!(title.preferred(), Some("Gintama"));

        assert_eq!(MediaTitle::default().preferred(), None);
    }

    #[test]
    fn test_localized_accepts_empty_list() {
        let attrs: MangaAttributes = serde_json::from_value(json!({
            "title": {"en": "Berserk"},
            "description": [],
            "year": 1989,
            "status": "ongoing"
        }))
        .unwrap();
        assert_eq!(attrs.title.get("en").map(String::as_str), Some("Berserk"));
        assert!(attrs.description.is_empty());
    }

    #[test]
    fn test_cover_file_name() {
        let rel: Relationship = serde_json::from_value(json!({
            "id": "c1",
            "type": "cover_art",
            "attributes": {"fileName": "cover.jpg"}
        }))
        .unwrap();
        assert_eq!(rel.cover_file_name(), Some("cover.jpg"));

        let bare: Relationship =
            serde_json::from_value(json!({"id": "c1", "type": "cover_art"})).unwrap();
        assert_eq!(bare.cover_file_name(), None);
    }
}
