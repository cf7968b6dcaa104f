//! Data models for the tracker.
//!
//! This module defines the persisted rows (media items, progress, accounts)
//! and the insert payloads handed to the [`Store`](crate::Store).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum stored title length
pub const TITLE_MAX_LEN: usize = 300;
/// Maximum stored external ID length
pub const EXTERNAL_ID_MAX_LEN: usize = 150;
/// Maximum stored description length for anime and manga
pub const LONG_DESCRIPTION_MAX_LEN: usize = 2000;
/// Maximum stored description length for books
pub const BOOK_DESCRIPTION_MAX_LEN: usize = 500;

/// Anime row, keyed by its AniList ID
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anime {
    pub id: i64,
    pub title: String,
    pub anilist_id: String,
    pub description: String,
    pub cover_art: Option<String>,
    pub total_episodes: i64,
    /// Minutes per episode
    pub duration: Option<i64>,
}

/// Anime to be created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAnime {
    pub title: String,
    pub anilist_id: String,
    pub description: String,
    pub cover_art: Option<String>,
    pub total_episodes: i64,
    pub duration: Option<i64>,
}

/// Manga row, keyed by its MangaDex ID
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manga {
    pub id: i64,
    pub title: String,
    pub mangadex_id: String,
    pub anilist_id: Option<String>,
    pub description: String,
    pub cover_art: Option<String>,
    pub total_chapters: i64,
}

/// Manga to be created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewManga {
    pub title: String,
    pub mangadex_id: String,
    pub anilist_id: Option<String>,
    pub description: String,
    pub cover_art: Option<String>,
    pub total_chapters: i64,
}

/// Book row, keyed by ISBN
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub book_id: String,
    pub description: String,
    pub cover_art: Option<String>,
    pub total_page: i64,
}

/// Book to be created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub book_id: String,
    pub description: String,
    pub cover_art: Option<String>,
    pub total_page: i64,
}

/// Kind of media a progress row points at
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaType {
    Anime,
    Manga,
    Book,
}

impl MediaType {
    /// Progress column holding the position for this media type
    pub fn position_column(&self) -> &'static str {
        match self {
            MediaType::Anime => "episode_number",
            MediaType::Manga => "chapter_number",
            MediaType::Book => "page_number",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaType::Anime => write!(f, "ANIME"),
            MediaType::Manga => write!(f, "MANGA"),
            MediaType::Book => write!(f, "BOOK"),
        }
    }
}

impl std::str::FromStr for MediaType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ANIME" => Ok(MediaType::Anime),
            "MANGA" => Ok(MediaType::Manga),
            "BOOK" => Ok(MediaType::Book),
            _ => Err(anyhow::anyhow!("Invalid media type: {}", s)),
        }
    }
}

/// Coarse consumption status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgressStatus {
    Ongoing,
    Completed,
    OnHold,
}

impl std::fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgressStatus::Ongoing => write!(f, "ONGOING"),
            ProgressStatus::Completed => write!(f, "COMPLETED"),
            ProgressStatus::OnHold => write!(f, "ON_HOLD"),
        }
    }
}

impl std::str::FromStr for ProgressStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ONGOING" => Ok(ProgressStatus::Ongoing),
            "COMPLETED" => Ok(ProgressStatus::Completed),
            "ON_HOLD" => Ok(ProgressStatus::OnHold),
            _ => Err(anyhow::anyhow!("Invalid progress status: {}", s)),
        }
    }
}

/// A user's consumption state for one media row
///
/// `media_id` is the local row ID of the anime/manga/book; nothing enforces
/// that the row exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub id: i64,
    pub user_id: i64,
    pub media_type: MediaType,
    pub media_id: i64,
    pub episode_number: Option<i64>,
    pub chapter_number: Option<i64>,
    pub page_number: Option<i64>,
    pub star_rate: i64,
    pub status: ProgressStatus,
    pub updated_at: DateTime<Utc>,
}

/// Progress to be saved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub media_type: MediaType,
    pub media_id: i64,
    /// Episode, chapter or page depending on `media_type`
    pub position: Option<i64>,
    pub star_rate: i64,
    pub status: ProgressStatus,
}

/// Registered account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Account to be created (password already hashed)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Truncate to at most `max` characters, on a char boundary
pub fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

/// Whether an external catalog ID fits its column
pub fn is_storable_external_id(id: &str) -> bool {
    !id.is_empty() && id.chars().count() <= EXTERNAL_ID_MAX_LEN
}
