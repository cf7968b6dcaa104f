//! Normalized views over single catalog items.
//!
//! Each wrapper is built by one `fetch`, which pulls the item from its
//! catalog and validates the payload against the typed schema in
//! [`crate::api::types`]. A missing item becomes [`CatalogError::NotFound`];
//! a payload of the wrong shape becomes [`CatalogError::InvalidPayload`].

use crate::api::openlibrary::bibkey;
use crate::api::types::*;
use crate::api::{AniListClient, MangaDexClient, OpenLibraryClient};
use crate::error::{Catalog, CatalogError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

fn parse<T: DeserializeOwned>(catalog: Catalog, what: &str, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| CatalogError::invalid(catalog, format!("malformed {}: {}", what, e)))
}

/// MangaDex IDs are UUIDs; anything outside `[A-Za-z0-9-]` cannot exist
pub fn is_valid_mangadex_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 64 && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Strip separators from an ISBN-10/13, or `None` if it cannot be one
pub fn normalize_isbn(isbn: &str) -> Option<String> {
    let compact: String = isbn
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let valid = match compact.len() {
        10 => {
            let (body, check) = compact.split_at(9);
            body.chars().all(|c| c.is_ascii_digit())
                && check.chars().all(|c| c.is_ascii_digit() || c == 'X')
        }
        13 => compact.chars().all(|c| c.is_ascii_digit()),
        _ => false,
    };

    valid.then_some(compact)
}

// ========== Manga ==========

/// One MangaDex title
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MangaData {
    manga_id: String,
    title: String,
    year: Option<i32>,
    status: Option<String>,
    description: String,
    cover_art: Option<String>,
    number_of_chapters: i64,
}

impl MangaData {
    /// Fetch metadata, cover and chapter count of a manga
    pub async fn fetch(client: &MangaDexClient, manga_id: &str) -> Result<Self> {
        if !is_valid_mangadex_id(manga_id) {
            return Err(CatalogError::not_found(Catalog::MangaDex, manga_id));
        }

        let body = client
            .get_manga(manga_id)
            .await?
            .ok_or_else(|| CatalogError::not_found(Catalog::MangaDex, manga_id))?;
        let entity: MangaEntity = parse(Catalog::MangaDex, "manga", body)?;
        let resource = entity.data;
        if !is_valid_mangadex_id(&resource.id) {
            return Err(CatalogError::invalid(Catalog::MangaDex, "manga has a malformed id"));
        }

        let title = resource
            .attributes
            .title
            .get("en")
            .or_else(|| resource.attributes.title.values().next())
            .cloned()
            .ok_or_else(|| CatalogError::invalid(Catalog::MangaDex, "manga has no title"))?;

        let description = resource
            .attributes
            .description
            .get("en")
            .cloned()
            .unwrap_or_default();

        let cover_art = resolve_cover(client, &resource).await?;
        let number_of_chapters = count_chapters(client, &resource.id).await?;

        debug!(manga_id = %resource.id, title = %title, chapters = number_of_chapters, "Normalized manga");

        Ok(Self {
            manga_id: resource.id,
            title,
            year: resource.attributes.year,
            status: resource.attributes.status,
            description,
            cover_art,
            number_of_chapters,
        })
    }

    pub fn manga_id(&self) -> &str {
        &self.manga_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Full cover image URL
    pub fn cover_art(&self) -> Option<&str> {
        self.cover_art.as_deref()
    }

    pub fn number_of_chapters(&self) -> i64 {
        self.number_of_chapters
    }

    /// Fetch the current chapter feed
    pub async fn chapter_list(&self, client: &MangaDexClient) -> Result<Vec<Value>> {
        let body = client
            .get_chapter_list(&self.manga_id)
            .await?
            .ok_or_else(|| CatalogError::not_found(Catalog::MangaDex, self.manga_id.clone()))?;
        let feed: ChapterFeed = parse(Catalog::MangaDex, "chapter feed", body)?;
        Ok(feed.data)
    }
}

/// Locate the cover relationship by type and turn it into an image URL
async fn resolve_cover(client: &MangaDexClient, resource: &MangaResource) -> Result<Option<String>> {
    let Some(relationship) = resource.relationships.iter().find(|r| r.kind == "cover_art") else {
        debug!(manga_id = %resource.id, "Manga has no cover relationship");
        return Ok(None);
    };

    if let Some(file_name) = relationship.cover_file_name() {
        return Ok(Some(client.cover_art_url(&resource.id, file_name)));
    }

    // Relationship was not expanded; look the cover record up
    let Some(body) = client.get_cover(&relationship.id).await? else {
        warn!(manga_id = %resource.id, cover_id = %relationship.id, "Cover record unavailable");
        return Ok(None);
    };
    let cover: CoverEntity = parse(Catalog::MangaDex, "cover", body)?;
    Ok(Some(
        client.cover_art_url(&resource.id, &cover.data.attributes.file_name),
    ))
}

async fn count_chapters(client: &MangaDexClient, manga_id: &str) -> Result<i64> {
    let Some(body) = client.get_chapter_list(manga_id).await? else {
        warn!(manga_id = %manga_id, "Chapter feed unavailable, counting zero chapters");
        return Ok(0);
    };
    let feed: ChapterFeed = parse(Catalog::MangaDex, "chapter feed", body)?;
    Ok(feed.total.unwrap_or(feed.data.len() as i64))
}

// ========== Anime ==========

/// One AniList anime
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimeData {
    anime_id: i64,
    title: String,
    year: Option<i32>,
    status: Option<String>,
    description: String,
    cover_art: Option<String>,
    episodes_number: Option<i64>,
    duration: Option<i64>,
}

impl AnimeData {
    /// Fetch an anime by AniList ID
    pub async fn fetch(client: &AniListClient, anime_id: i64) -> Result<Self> {
        let not_found = || CatalogError::not_found(Catalog::AniList, anime_id.to_string());

        let body = client.get_anime(anime_id).await?.ok_or_else(not_found)?;
        let response: GraphQlResponse<MediaData> = parse(Catalog::AniList, "media response", body)?;

        if let Some(error) = response.errors.first() {
            debug!(anime_id = anime_id, error = %error.message, "AniList reported an error");
        }

        let media = response
            .data
            .and_then(|data| data.media)
            .ok_or_else(not_found)?;

        let title = media
            .title
            .preferred()
            .map(str::to_string)
            .ok_or_else(|| CatalogError::invalid(Catalog::AniList, "anime has no title"))?;

        Ok(Self {
            anime_id: media.id,
            title,
            year: media.start_date.and_then(|d| d.year),
            status: media.status,
            description: media.description.unwrap_or_default(),
            cover_art: media.cover_image.and_then(|c| c.large),
            episodes_number: media.episodes,
            duration: media.duration,
        })
    }

    pub fn anime_id(&self) -> i64 {
        self.anime_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn cover_art(&self) -> Option<&str> {
        self.cover_art.as_deref()
    }

    /// Episode count; `None` while airing with no announced total
    pub fn episodes_number(&self) -> Option<i64> {
        self.episodes_number
    }

    /// Minutes per episode
    pub fn duration(&self) -> Option<i64> {
        self.duration
    }
}

// ========== Books ==========

/// One OpenLibrary edition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookData {
    isbn: String,
    title: String,
    year: Option<String>,
    description: String,
    number_of_pages: Option<i64>,
    cover_image: Option<String>,
}

impl BookData {
    /// Fetch an edition by ISBN-10 or ISBN-13
    pub async fn fetch(client: &OpenLibraryClient, isbn: &str) -> Result<Self> {
        let isbn = normalize_isbn(isbn)
            .ok_or_else(|| CatalogError::not_found(Catalog::OpenLibrary, isbn))?;
        let not_found = || CatalogError::not_found(Catalog::OpenLibrary, isbn.clone());

        let mut body = client.get_book(&isbn).await?.ok_or_else(not_found)?;
        let entry = body
            .get_mut(bibkey(&isbn))
            .map(Value::take)
            .ok_or_else(not_found)?;
        let book: OpenLibraryBook = parse(Catalog::OpenLibrary, "book", entry)?;

        Ok(Self {
            isbn: isbn.clone(),
            title: book.title,
            year: book.publish_date,
            description: book.subtitle.unwrap_or_default(),
            number_of_pages: book.number_of_pages,
            cover_image: book.cover.and_then(|c| c.large),
        })
    }

    pub fn isbn(&self) -> &str {
        &self.isbn
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Publication date as OpenLibrary writes it ("2005", "June 1990", ...)
    pub fn year(&self) -> Option<&str> {
        self.year.as_deref()
    }

    pub fn number_of_pages(&self) -> Option<i64> {
        self.number_of_pages
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn cover_image(&self) -> Option<&str> {
        self.cover_image.as_deref()
    }
}
