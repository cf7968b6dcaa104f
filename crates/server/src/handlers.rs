//! HTTP handlers.
//!
//! Every page answers with its JSON context. Successful form posts answer
//! `303 See Other` pointing at the next page.

use crate::auth;
use crate::error::AppError;
use crate::forms::{LoginForm, NewUserForm, ProgressForm, SearchForm};
use crate::state::AppState;
use actix_web::http::header;
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use catalog::{AnimeData, BookData, MangaData};
use serde_json::{json, Value};
use shared::{Anime, Book, Manga, MediaType, NewAnime, NewBook, NewManga, NewUser, ProgressUpdate};
use std::sync::Arc;
use tracing::{debug, info};

type HandlerResult = Result<HttpResponse, AppError>;

/// Search shown on the home page
pub const HOME_QUERY: &str = "Naruto";

fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

fn media_list(results: Option<Arc<Vec<Value>>>) -> Value {
    results
        .map(|list| Value::Array(list.to_vec()))
        .unwrap_or_else(|| json!([]))
}

/// `key` of a catalog search body, or an empty list
fn search_results(body: Option<Value>, key: &str) -> Value {
    body.and_then(|mut b| b.get_mut(key).map(Value::take))
        .filter(Value::is_array)
        .unwrap_or_else(|| json!([]))
}

// ========== Local rows ==========

async fn resolve_anime(state: &AppState, anilist_id: i64) -> Result<(AnimeData, Anime, bool), AppError> {
    let data = AnimeData::fetch(&state.anilist, anilist_id).await?;
    let new = NewAnime {
        title: data.title().to_string(),
        anilist_id: data.anime_id().to_string(),
        description: data.description().to_string(),
        cover_art: data.cover_art().map(str::to_string),
        total_episodes: data.episodes_number().unwrap_or(0),
        duration: data.duration(),
    };
    let (row, created) = state.store().get_or_create_anime(&new)?;
    Ok((data, row, created))
}

async fn resolve_manga(state: &AppState, manga_id: &str) -> Result<(MangaData, Manga, bool), AppError> {
    let data = MangaData::fetch(&state.mangadex, manga_id).await?;
    let new = NewManga {
        title: data.title().to_string(),
        mangadex_id: data.manga_id().to_string(),
        anilist_id: None,
        description: data.description().to_string(),
        cover_art: data.cover_art().map(str::to_string),
        total_chapters: data.number_of_chapters(),
    };
    let (row, created) = state.store().get_or_create_manga(&new)?;
    Ok((data, row, created))
}

async fn resolve_book(state: &AppState, isbn: &str) -> Result<(Book, bool), AppError> {
    let data = BookData::fetch(&state.openlibrary, isbn).await?;
    let new = NewBook {
        title: data.title().to_string(),
        book_id: data.isbn().to_string(),
        description: data.description().to_string(),
        cover_art: data.cover_image().map(str::to_string),
        total_page: data.number_of_pages().unwrap_or(0),
    };
    Ok(state.store().get_or_create_book(&new)?)
}

// ========== Search ==========

#[get("/")]
async fn home(state: web::Data<AppState>) -> HandlerResult {
    let results = state.anilist.search_anime(HOME_QUERY).await?;
    Ok(HttpResponse::Ok().json(json!({ "animes": media_list(results) })))
}

#[get("/search")]
async fn search(state: web::Data<AppState>, form: web::Query<SearchForm>) -> HandlerResult {
    let query = form.clean()?;
    let results = state.anilist.search_anime(&query).await?;
    Ok(HttpResponse::Ok().json(json!({ "query": query, "anime": media_list(results) })))
}

#[get("/search/manga")]
async fn search_manga(state: web::Data<AppState>, form: web::Query<SearchForm>) -> HandlerResult {
    let query = form.clean()?;
    let body = state.mangadex.search_manga(&query).await?;
    Ok(HttpResponse::Ok().json(json!({ "query": query, "manga": search_results(body, "data") })))
}

#[get("/search/books")]
async fn search_books(state: web::Data<AppState>, form: web::Query<SearchForm>) -> HandlerResult {
    let query = form.clean()?;
    let body = state.openlibrary.search_book(&query).await?;
    Ok(HttpResponse::Ok().json(json!({ "query": query, "books": search_results(body, "docs") })))
}

// ========== Detail pages ==========

#[get("/anime/{id}")]
async fn anime_detail(state: web::Data<AppState>, path: web::Path<i64>) -> HandlerResult {
    let (data, anime, created) = resolve_anime(&state, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "anime": anime, "created": created, "data": data })))
}

#[get("/manga/{id}")]
async fn manga_detail(state: web::Data<AppState>, path: web::Path<String>) -> HandlerResult {
    let (data, manga, created) = resolve_manga(&state, &path).await?;
    Ok(HttpResponse::Ok().json(json!({ "manga": manga, "created": created, "data": data })))
}

#[get("/book/{isbn}")]
async fn book_detail(state: web::Data<AppState>, path: web::Path<String>) -> HandlerResult {
    let book = BookData::fetch(&state.openlibrary, &path).await?;
    Ok(HttpResponse::Ok().json(json!({ "book": book })))
}

// ========== Accounts ==========

#[get("/register")]
async fn register_page() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "form": {} }))
}

#[post("/register")]
async fn register(state: web::Data<AppState>, form: web::Form<NewUserForm>) -> HandlerResult {
    let registration = form.clean(&state.store())?;
    let password_hash = auth::hash_password_blocking(registration.password).await?;

    // Another request may have taken the name while the hash was computed
    let user = state
        .store()
        .create_user(&NewUser {
            username: registration.username,
            email: registration.email,
            password_hash,
        })?
        .ok_or_else(NewUserForm::username_taken)?;
    info!(user_id = user.id, username = %user.username, "Registered user");

    Ok(see_other("/login"))
}

#[get("/login")]
async fn login_page() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "form": {} }))
}

#[post("/login")]
async fn login(state: web::Data<AppState>, form: web::Form<LoginForm>) -> HandlerResult {
    let credentials = form.clean()?;

    let user = auth::authenticate(&state, &credentials.username, &credentials.password)
        .await?
        .ok_or_else(|| {
            debug!(username = %credentials.username, "Rejected login");
            LoginForm::invalid_login()
        })?;
    let cookie = auth::start_session(&mut state.store(), &user, &state.config)?;

    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/"))
        .cookie(cookie)
        .finish())
}

#[post("/logout")]
async fn logout(state: web::Data<AppState>, req: HttpRequest) -> HandlerResult {
    let removal = auth::end_session(&mut state.store(), &req)?;
    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/"))
        .cookie(removal)
        .finish())
}

// ========== Progress ==========

#[post("/{kind}/{id}/progress")]
async fn save_progress(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
    form: web::Form<ProgressForm>,
) -> HandlerResult {
    let user = auth::require_user(&state, &req)?;
    let input = form.clean()?;
    let (kind, id) = path.into_inner();

    let media_type: MediaType = kind
        .parse()
        .map_err(|_| AppError::NotFound(format!("media type {}", kind)))?;

    let media_id = match media_type {
        MediaType::Anime => {
            let anilist_id = id
                .parse::<i64>()
                .map_err(|_| AppError::NotFound(format!("anime {}", id)))?;
            resolve_anime(&state, anilist_id).await?.1.id
        }
        MediaType::Manga => resolve_manga(&state, &id).await?.1.id,
        MediaType::Book => resolve_book(&state, &id).await?.0.id,
    };

    let saved = state.store().save_progress(
        user.id,
        &ProgressUpdate {
            media_type,
            media_id,
            position: input.position,
            star_rate: input.star_rate,
            status: input.status,
        },
    )?;
    info!(
        user_id = user.id,
        media_type = %media_type,
        media_id = media_id,
        status = %saved.status,
        "Progress updated"
    );

    Ok(see_other("/progress"))
}

#[get("/progress")]
async fn progress(state: web::Data<AppState>, req: HttpRequest) -> HandlerResult {
    let user = auth::require_user(&state, &req)?;
    let rows = state.store().progress_for_user(user.id)?;
    Ok(HttpResponse::Ok().json(json!({ "user": user, "progress": rows })))
}

/// Register every route
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(home)
        .service(search)
        .service(search_manga)
        .service(search_books)
        .service(anime_detail)
        .service(manga_detail)
        .service(book_detail)
        .service(register_page)
        .service(register)
        .service(login_page)
        .service(login)
        .service(logout)
        .service(save_progress)
        .service(progress);
}
