//! Shared state handed to every handler through `web::Data`.

use catalog::{AniListClient, MangaDexClient, OpenLibraryClient, Transport};
use shared::{Config, Store};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Application state
///
/// The store lock is only ever taken between awaits, never across one.
pub struct AppState {
    pub config: Config,
    pub anilist: AniListClient,
    pub mangadex: MangaDexClient,
    pub openlibrary: OpenLibraryClient,
    store: Mutex<Store>,
}

impl AppState {
    /// Build the catalog clients from `config`, all sharing `transport`
    pub fn new(config: Config, store: Store, transport: Arc<dyn Transport>) -> Self {
        let catalogs = &config.catalogs;

        let anilist = AniListClient::new(
            transport.clone(),
            catalogs.anilist_url.clone(),
            config.cache.capacity,
            Duration::from_secs(config.cache.ttl_seconds),
        );
        let mangadex = MangaDexClient::new(
            transport.clone(),
            catalogs.mangadex_url.clone(),
            catalogs.mangadex_uploads_url.clone(),
        );
        let openlibrary = OpenLibraryClient::new(transport, catalogs.openlibrary_url.clone());

        Self {
            config,
            anilist,
            mangadex,
            openlibrary,
            store: Mutex::new(store),
        }
    }

    /// Lock the store
    pub fn store(&self) -> MutexGuard<'_, Store> {
        self.store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
