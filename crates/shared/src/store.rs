//! Persistence for media rows, progress, and accounts.
//!
//! This module provides a high-level API over the SQLite database,
//! including get-or-create deduplication keyed on external catalog IDs.

use crate::models::*;
use crate::Database;
use anyhow::{ensure, Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use std::time::Duration;
use tracing::{debug, info};

const ANIME_COLUMNS: &str =
    "id, title, anilist_id, description, cover_art, total_episodes, duration";
const MANGA_COLUMNS: &str =
    "id, title, mangadex_id, anilist_id, description, cover_art, total_chapters";
const BOOK_COLUMNS: &str = "id, title, book_id, description, cover_art, total_page";
const PROGRESS_COLUMNS: &str = "id, user_id, media_type, media_id, episode_number, \
     chapter_number, page_number, star_rate, status, updated_at";
const USER_COLUMNS: &str = "id, username, email, password_hash, created_at";

/// Repository over the tracker tables
pub struct Store {
    db: Database,
}

impl Store {
    /// Create a new store with the given database
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    // ========== Anime ==========

    /// Get or create an anime entry (deduplication)
    ///
    /// If an anime with the given AniList ID already exists it is returned
    /// unchanged. Otherwise the new anime is inserted. The flag tells whether
    /// a row was created.
    pub fn get_or_create_anime(&mut self, anime: &NewAnime) -> Result<(Anime, bool)> {
        check_external_id("AniList", &anime.anilist_id)?;
        if let Some(existing) = self.anime_by_anilist_id(&anime.anilist_id)? {
            debug!(anilist_id = %anime.anilist_id, db_id = existing.id, "Anime already exists");
            return Ok((existing, false));
        }

        let conn = self.db.conn_mut();
        conn.execute(
            "INSERT INTO anime (title, anilist_id, description, cover_art, total_episodes, duration)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                truncate_chars(&anime.title, TITLE_MAX_LEN),
                anime.anilist_id,
                truncate_chars(&anime.description, LONG_DESCRIPTION_MAX_LEN),
                anime.cover_art,
                anime.total_episodes,
                anime.duration,
            ],
        )
        .context("Failed to insert anime")?;

        let id = conn.last_insert_rowid();
        info!(anilist_id = %anime.anilist_id, db_id = id, title = %anime.title, "Created new anime entry");

        let created = self
            .anime_by_id(id)?
            .context("Inserted anime row disappeared")?;
        Ok((created, true))
    }

    /// Look up an anime by AniList ID
    pub fn anime_by_anilist_id(&self, anilist_id: &str) -> Result<Option<Anime>> {
        self.db
            .conn()
            .query_row(
                &format!("SELECT {} FROM anime WHERE anilist_id = ?1", ANIME_COLUMNS),
                params![anilist_id],
                row_to_anime,
            )
            .optional()
            .context("Failed to query anime")
    }

    /// Look up an anime by row ID
    pub fn anime_by_id(&self, id: i64) -> Result<Option<Anime>> {
        self.db
            .conn()
            .query_row(
                &format!("SELECT {} FROM anime WHERE id = ?1", ANIME_COLUMNS),
                params![id],
                row_to_anime,
            )
            .optional()
            .context("Failed to query anime")
    }

    // ========== Manga ==========

    /// Get or create a manga entry keyed on its MangaDex ID
    pub fn get_or_create_manga(&mut self, manga: &NewManga) -> Result<(Manga, bool)> {
        check_external_id("MangaDex", &manga.mangadex_id)?;
        if let Some(anilist_id) = &manga.anilist_id {
            check_external_id("AniList", anilist_id)?;
        }
        if let Some(existing) = self.manga_by_mangadex_id(&manga.mangadex_id)? {
            debug!(mangadex_id = %manga.mangadex_id, db_id = existing.id, "Manga already exists");
            return Ok((existing, false));
        }

        let conn = self.db.conn_mut();
        conn.execute(
            "INSERT INTO manga (title, mangadex_id, anilist_id, description, cover_art, total_chapters)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                truncate_chars(&manga.title, TITLE_MAX_LEN),
                manga.mangadex_id,
                manga.anilist_id,
                truncate_chars(&manga.description, LONG_DESCRIPTION_MAX_LEN),
                manga.cover_art,
                manga.total_chapters,
            ],
        )
        .context("Failed to insert manga")?;

        let id = conn.last_insert_rowid();
        info!(mangadex_id = %manga.mangadex_id, db_id = id, title = %manga.title, "Created new manga entry");

        let created = self
            .manga_by_id(id)?
            .context("Inserted manga row disappeared")?;
        Ok((created, true))
    }

    /// Look up a manga by MangaDex ID
    pub fn manga_by_mangadex_id(&self, mangadex_id: &str) -> Result<Option<Manga>> {
        self.db
            .conn()
            .query_row(
                &format!("SELECT {} FROM manga WHERE mangadex_id = ?1", MANGA_COLUMNS),
                params![mangadex_id],
                row_to_manga,
            )
            .optional()
            .context("Failed to query manga")
    }

    /// Look up a manga by row ID
    pub fn manga_by_id(&self, id: i64) -> Result<Option<Manga>> {
        self.db
            .conn()
            .query_row(
                &format!("SELECT {} FROM manga WHERE id = ?1", MANGA_COLUMNS),
                params![id],
                row_to_manga,
            )
            .optional()
            .context("Failed to query manga")
    }

    // ========== Books ==========

    /// Get or create a book entry keyed on its ISBN
    pub fn get_or_create_book(&mut self, book: &NewBook) -> Result<(Book, bool)> {
        check_external_id("ISBN", &book.book_id)?;
        if let Some(existing) = self.book_by_isbn(&book.book_id)? {
            debug!(isbn = %book.book_id, db_id = existing.id, "Book already exists");
            return Ok((existing, false));
        }

        let conn = self.db.conn_mut();
        conn.execute(
            "INSERT INTO book (title, book_id, description, cover_art, total_page)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                truncate_chars(&book.title, TITLE_MAX_LEN),
                book.book_id,
                truncate_chars(&book.description, BOOK_DESCRIPTION_MAX_LEN),
                book.cover_art,
                book.total_page,
            ],
        )
        .context("Failed to insert book")?;

        let id = conn.last_insert_rowid();
        info!(isbn = %book.book_id, db_id = id, title = %book.title, "Created new book entry");

        let created = self
            .book_by_id(id)?
            .context("Inserted book row disappeared")?;
        Ok((created, true))
    }

    /// Look up a book by ISBN
    pub fn book_by_isbn(&self, isbn: &str) -> Result<Option<Book>> {
        self.db
            .conn()
            .query_row(
                &format!("SELECT {} FROM book WHERE book_id = ?1", BOOK_COLUMNS),
                params![isbn],
                row_to_book,
            )
            .optional()
            .context("Failed to query book")
    }

    /// Look up a book by row ID
    pub fn book_by_id(&self, id: i64) -> Result<Option<Book>> {
        self.db
            .conn()
            .query_row(
                &format!("SELECT {} FROM book WHERE id = ?1", BOOK_COLUMNS),
                params![id],
                row_to_book,
            )
            .optional()
            .context("Failed to query book")
    }

    // ========== Progress ==========

    /// Insert or update a user's progress for one media row
    ///
    /// The position lands in the column matching the media type; the other
    /// position columns are left untouched.
    pub fn save_progress(&mut self, user_id: i64, update: &ProgressUpdate) -> Result<Progress> {
        let column = update.media_type.position_column();
        let conn = self.db.conn_mut();

        let sql = format!(
            "INSERT INTO progress (user_id, media_type, media_id, {col}, star_rate, status, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(user_id, media_type, media_id) DO UPDATE SET
                 {col} = excluded.{col},
                 star_rate = excluded.star_rate,
                 status = excluded.status,
                 updated_at = excluded.updated_at",
            col = column
        );

        conn.execute(
            &sql,
            params![
                user_id,
                update.media_type.to_string(),
                update.media_id,
                update.position,
                update.star_rate,
                update.status.to_string(),
                Utc::now(),
            ],
        )
        .context("Failed to save progress")?;

        let progress = conn
            .query_row(
                &format!(
                    "SELECT {} FROM progress WHERE user_id = ?1 AND media_type = ?2 AND media_id = ?3",
                    PROGRESS_COLUMNS
                ),
                params![user_id, update.media_type.to_string(), update.media_id],
                row_to_progress,
            )
            .context("Failed to reload progress")?;

        debug!(
            user_id = user_id,
            media_type = %update.media_type,
            media_id = update.media_id,
            status = %update.status,
            "Saved progress"
        );

        Ok(progress)
    }

    /// All progress rows of a user, most recently updated first
    pub fn progress_for_user(&self, user_id: i64) -> Result<Vec<Progress>> {
        let conn = self.db.conn();

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM progress WHERE user_id = ?1 ORDER BY updated_at DESC, id DESC",
            PROGRESS_COLUMNS
        ))?;

        let rows = stmt
            .query_map(params![user_id], row_to_progress)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    // ========== Accounts ==========

    /// Create a new account
    ///
    /// Returns `None` when the username is already taken, including when a
    /// concurrent registration claimed it first.
    pub fn create_user(&mut self, user: &NewUser) -> Result<Option<User>> {
        let conn = self.db.conn_mut();

        let inserted = conn.execute(
            "INSERT INTO users (username, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![user.username, user.email, user.password_hash, Utc::now()],
        );
        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                debug!(username = %user.username, "Username already taken");
                return Ok(None);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to create user {}", user.username))
            }
        }

        let id = conn.last_insert_rowid();
        info!(user_id = id, username = %user.username, "Created user");

        let created = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                params![id],
                row_to_user,
            )
            .context("Failed to reload user")?;
        Ok(Some(created))
    }

    /// Look up an account by username
    pub fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.db
            .conn()
            .query_row(
                &format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS),
                params![username],
                row_to_user,
            )
            .optional()
            .context("Failed to query user")
    }

    /// Check whether a username is already registered
    pub fn username_exists(&self, username: &str) -> Result<bool> {
        Ok(self.user_by_username(username)?.is_some())
    }

    /// Record a session token for a user
    pub fn create_session(&mut self, token: &str, user_id: i64) -> Result<()> {
        self.db
            .conn_mut()
            .execute(
                "INSERT INTO sessions (token, user_id, created_at) VALUES (?1, ?2, ?3)",
                params![token, user_id, Utc::now()],
            )
            .context("Failed to create session")?;

        debug!(user_id = user_id, "Session created");
        Ok(())
    }

    /// Resolve a session token to its user
    ///
    /// Sessions older than `ttl` resolve to nobody.
    pub fn user_for_session(&self, token: &str, ttl: Duration) -> Result<Option<User>> {
        let cutoff = session_cutoff(ttl)?;

        self.db
            .conn()
            .query_row(
                "SELECT u.id, u.username, u.email, u.password_hash, u.created_at
                 FROM sessions s JOIN users u ON u.id = s.user_id
                 WHERE s.token = ?1 AND s.created_at > ?2",
                params![token, cutoff],
                row_to_user,
            )
            .optional()
            .context("Failed to query session")
    }

    /// Delete every session older than `ttl`
    pub fn purge_expired_sessions(&mut self, ttl: Duration) -> Result<usize> {
        let cutoff = session_cutoff(ttl)?;

        let removed = self
            .db
            .conn_mut()
            .execute("DELETE FROM sessions WHERE created_at <= ?1", params![cutoff])
            .context("Failed to purge sessions")?;

        if removed > 0 {
            info!(removed = removed, "Purged expired sessions");
        }
        Ok(removed)
    }

    /// Forget a session token; unknown tokens are ignored
    pub fn delete_session(&mut self, token: &str) -> Result<()> {
        let removed = self
            .db
            .conn_mut()
            .execute("DELETE FROM sessions WHERE token = ?1", params![token])
            .context("Failed to delete session")?;

        debug!(removed = removed, "Session deleted");
        Ok(())
    }

    /// Row counts for startup diagnostics
    pub fn get_stats(&self) -> Result<StoreStats> {
        let conn = self.db.conn();
        let count = |table: &str| -> Result<usize> {
            let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?;
            Ok(n as usize)
        };

        Ok(StoreStats {
            anime: count("anime")?,
            manga: count("manga")?,
            books: count("book")?,
            users: count("users")?,
            progress: count("progress")?,
        })
    }
}

fn row_to_anime(row: &rusqlite::Row) -> rusqlite::Result<Anime> {
    Ok(Anime {
        id: row.get(0)?,
        title: row.get(1)?,
        anilist_id: row.get(2)?,
        description: row.get(3)?,
        cover_art: row.get(4)?,
        total_episodes: row.get(5)?,
        duration: row.get(6)?,
    })
}

fn row_to_manga(row: &rusqlite::Row) -> rusqlite::Result<Manga> {
    Ok(Manga {
        id: row.get(0)?,
        title: row.get(1)?,
        mangadex_id: row.get(2)?,
        anilist_id: row.get(3)?,
        description: row.get(4)?,
        cover_art: row.get(5)?,
        total_chapters: row.get(6)?,
    })
}

fn row_to_book(row: &rusqlite::Row) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(0)?,
        title: row.get(1)?,
        book_id: row.get(2)?,
        description: row.get(3)?,
        cover_art: row.get(4)?,
        total_page: row.get(5)?,
    })
}

fn row_to_progress(row: &rusqlite::Row) -> rusqlite::Result<Progress> {
    Ok(Progress {
        id: row.get(0)?,
        user_id: row.get(1)?,
        // The CHECK constraints keep these two columns parseable
        media_type: row
            .get::<_, String>(2)?
            .parse()
            .unwrap_or(MediaType::Anime),
        media_id: row.get(3)?,
        episode_number: row.get(4)?,
        chapter_number: row.get(5)?,
        page_number: row.get(6)?,
        star_rate: row.get(7)?,
        status: row
            .get::<_, String>(8)?
            .parse()
            .unwrap_or(ProgressStatus::Ongoing),
        updated_at: row.get(9)?,
    })
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Row counts per table
#[derive(Debug, Clone)]
pub struct StoreStats {
    pub anime: usize,
    pub manga: usize,
    pub books: usize,
    pub users: usize,
    pub progress: usize,
}

fn check_external_id(catalog: &str, id: &str) -> Result<()> {
    ensure!(
        is_storable_external_id(id),
        "{} ID must be 1 to {} characters, got {}",
        catalog,
        EXTERNAL_ID_MAX_LEN,
        id.chars().count()
    );
    Ok(())
}

fn session_cutoff(ttl: Duration) -> Result<chrono::DateTime<Utc>> {
    let ttl = chrono::Duration::from_std(ttl).context("Session lifetime out of range")?;
    Ok(Utc::now() - ttl)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::new(Database::open_in_memory().unwrap())
    }

    fn naruto() -> NewAnime {
        NewAnime {
            title: "Naruto".to_string(),
            anilist_id: "20".to_string(),
            description: "A ninja story".to_string(),
            cover_art: Some("https://img.anili.st/naruto.jpg".to_string()),
            total_episodes: 220,
            duration: Some(23),
        }
    }

    fn user(store: &mut Store, name: &str) -> User {
        store
            .create_user(&NewUser {
                username: name.to_string(),
                email: format!("{}@example.com", name),
                password_hash: "hash".to_string(),
            })
            .unwrap()
            .unwrap()
    }

    const DAY: Duration = Duration::from_secs(24 * 3600);

    #[test]
    fn test_get_or_create_anime_is_idempotent() -> Result<()> {
        let mut store = store();

        let (first, created) = store.get_or_create_anime(&naruto())?;
        assert!(created);
        assert_eq!(first.title, "Naruto");
        assert_eq!(first.total_episodes, 220);

        let (second, created) = store.get_or_create_anime(&naruto())?;
        assert!(!created);
        assert_eq!(second.id, first.id);
        assert_eq!(store.get_stats()?.anime, 1);

        Ok(())
    }

    #[test]
    fn test_long_fields_are_truncated() -> Result<()> {
        let mut store = store();
        let mut anime = naruto();
        anime.description = "x".repeat(LONG_DESCRIPTION_MAX_LEN + 50);

        let (row, _) = store.get_or_create_anime(&anime)?;
        assert_eq!(row.description.len(), LONG_DESCRIPTION_MAX_LEN);

        let (book, _) = store.get_or_create_book(&NewBook {
            title: "Dune".to_string(),
            book_id: "9780441013593".to_string(),
            description: "y".repeat(BOOK_DESCRIPTION_MAX_LEN + 1),
            cover_art: None,
            total_page: 896,
        })?;
        assert_eq!(book.description.len(), BOOK_DESCRIPTION_MAX_LEN);

        Ok(())
    }

    #[test]
    fn test_manga_dedup_by_mangadex_id() -> Result<()> {
        let mut store = store();
        let manga = NewManga {
            title: "Berserk".to_string(),
            mangadex_id: "801513ba-a712-498c-8f57-cae55b38cc92".to_string(),
            anilist_id: None,
            description: String::new(),
            cover_art: None,
            total_chapters: 374,
        };

        let (a, created_a) = store.get_or_create_manga(&manga)?;
        let (b, created_b) = store.get_or_create_manga(&manga)?;
        assert!(created_a);
        assert!(!created_b);
        assert_eq!(a, b);
        assert_eq!(store.manga_by_id(a.id)?, Some(a));

        Ok(())
    }

    #[test]
    fn test_save_progress_upserts() -> Result<()> {
        let mut store = store();
        let alice = user(&mut store, "alice");
        let (anime, _) = store.get_or_create_anime(&naruto())?;

        let first = store.save_progress(
            alice.id,
            &ProgressUpdate {
                media_type: MediaType::Anime,
                media_id: anime.id,
                position: Some(3),
                star_rate: 4,
                status: ProgressStatus::Ongoing,
            },
        )?;
        assert_eq!(first.episode_number, Some(3));
        assert_eq!(first.chapter_number, None);

        let second = store.save_progress(
            alice.id,
            &ProgressUpdate {
                media_type: MediaType::Anime,
                media_id: anime.id,
                position: Some(220),
                star_rate: 5,
                status: ProgressStatus::Completed,
            },
        )?;
        assert_eq!(second.id, first.id);
        assert_eq!(second.episode_number, Some(220));
        assert_eq!(second.status, ProgressStatus::Completed);

        let rows = store.progress_for_user(alice.id)?;
        assert_eq!(rows.len(), 1);

        Ok(())
    }

    #[test]
    fn test_progress_is_per_user() -> Result<()> {
        let mut store = store();
        let alice = user(&mut store, "alice");
        let bob = user(&mut store, "bob");

        let update = ProgressUpdate {
            media_type: MediaType::Book,
            media_id: 7,
            position: Some(120),
            star_rate: 3,
            status: ProgressStatus::OnHold,
        };
        store.save_progress(alice.id, &update)?;

        assert_eq!(store.progress_for_user(alice.id)?[0].page_number, Some(120));
        assert!(store.progress_for_user(bob.id)?.is_empty());

        Ok(())
    }

    #[test]
    fn test_duplicate_username_rejected() -> Result<()> {
        let mut store = store();
        user(&mut store, "alice");
        assert!(store.username_exists("alice")?);
        assert!(!store.username_exists("bob")?);

        let dup = store.create_user(&NewUser {
            username: "alice".to_string(),
            email: "other@example.com".to_string(),
            password_hash: "hash".to_string(),
        })?;
        assert!(dup.is_none());
        assert_eq!(store.get_stats()?.users, 1);

        Ok(())
    }

    #[test]
    fn test_sessions() -> Result<()> {
        let mut store = store();
        let alice = user(&mut store, "alice");

        store.create_session("token-1", alice.id)?;
        let resolved = store.user_for_session("token-1", DAY)?;
        assert_eq!(resolved.map(|u| u.username), Some("alice".to_string()));

        store.delete_session("token-1")?;
        assert!(store.user_for_session("token-1", DAY)?.is_none());

        // Deleting twice is harmless
        store.delete_session("token-1")?;

        Ok(())
    }

    #[test]
    fn test_expired_sessions() -> Result<()> {
        let mut store = store();
        let alice = user(&mut store, "alice");

        store.create_session("fresh", alice.id)?;
        store.db.conn_mut().execute(
            "INSERT INTO sessions (token, user_id, created_at) VALUES (?1, ?2, ?3)",
            params!["stale", alice.id, Utc::now() - chrono::Duration::days(30)],
        )?;

        assert!(store.user_for_session("fresh", DAY)?.is_some());
        assert!(store.user_for_session("stale", DAY)?.is_none());
        assert!(store.user_for_session("stale", 60 * DAY)?.is_some());

        assert_eq!(store.purge_expired_sessions(DAY)?, 1);
        assert!(store.user_for_session("stale", 60 * DAY)?.is_none());
        assert!(store.user_for_session("fresh", DAY)?.is_some());

        Ok(())
    }

    #[test]
    fn test_overlong_external_ids_rejected() -> Result<()> {
        let mut store = store();

        let mut anime = naruto();
        anime.anilist_id = "9".repeat(EXTERNAL_ID_MAX_LEN + 1);
        assert!(store.get_or_create_anime(&anime).is_err());

        let manga = NewManga {
            title: "Berserk".to_string(),
            mangadex_id: "a".repeat(EXTERNAL_ID_MAX_LEN + 1),
            anilist_id: None,
            description: String::new(),
            cover_art: None,
            total_chapters: 0,
        };
        assert!(store.get_or_create_manga(&manga).is_err());

        let stats = store.get_stats()?;
        assert_eq!((stats.anime, stats.manga), (0, 0));

        Ok(())
    }
}
