//! Password hashing and cookie sessions.

use crate::error::AppError;
use crate::state::AppState;
use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::error::BlockingError;
use actix_web::{web, HttpRequest};
use anyhow::{anyhow, Context, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use shared::{Config, Store, User};
use tracing::{debug, info};
use uuid::Uuid;

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "session";

/// Hash a password into a PHC string
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|e| anyhow!("Failed to encode salt: {}", e))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

/// Check a password against a stored PHC string
///
/// A malformed stored hash never verifies.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            debug!(error = %e, "Stored password hash is malformed");
            false
        }
    }
}

fn blocking_failed(e: BlockingError) -> AppError {
    AppError::Internal(anyhow!("Password hashing task failed: {}", e))
}

/// [`hash_password`] on the blocking thread pool
pub async fn hash_password_blocking(password: String) -> std::result::Result<String, AppError> {
    let hash = web::block(move || hash_password(&password))
        .await
        .map_err(blocking_failed)??;
    Ok(hash)
}

/// User matching the credentials, if any
///
/// The store is locked only for the lookup. The hash is checked on the
/// blocking thread pool so other requests keep using the store meanwhile.
pub async fn authenticate(
    state: &AppState,
    username: &str,
    password: &str,
) -> std::result::Result<Option<User>, AppError> {
    let user = state
        .store()
        .user_by_username(username)
        .context("Failed to look up user")?;
    let Some(user) = user else {
        return Ok(None);
    };

    let password = password.to_string();
    let stored = user.password_hash.clone();
    let verified = web::block(move || verify_password(&password, &stored))
        .await
        .map_err(blocking_failed)?;

    Ok(verified.then_some(user))
}

/// Open a session for `user` and build the cookie carrying it
///
/// Expired sessions are purged on the way.
pub fn start_session(store: &mut Store, user: &User, config: &Config) -> Result<Cookie<'static>> {
    let ttl = config.session_ttl();
    store.purge_expired_sessions(ttl)?;

    let token = Uuid::new_v4().to_string();
    store.create_session(&token, user.id)?;
    info!(user_id = user.id, username = %user.username, "User logged in");

    Ok(Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.server.secure_cookies)
        .max_age(time::Duration::seconds(ttl.as_secs() as i64))
        .finish())
}

/// Drop the request's session (if any) and build the removal cookie
pub fn end_session(store: &mut Store, req: &HttpRequest) -> Result<Cookie<'static>> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        store.delete_session(cookie.value())?;
        debug!("Session closed");
    }

    let mut removal = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    removal.make_removal();
    Ok(removal)
}

/// User owning the request's session cookie
pub fn current_user(state: &AppState, req: &HttpRequest) -> Result<Option<User>> {
    match req.cookie(SESSION_COOKIE) {
        Some(cookie) => state
            .store()
            .user_for_session(cookie.value(), state.config.session_ttl()),
        None => Ok(None),
    }
}

/// Like [`current_user`], but anonymous requests are rejected
pub fn require_user(state: &AppState, req: &HttpRequest) -> std::result::Result<User, AppError> {
    current_user(state, req)?.ok_or(AppError::Unauthorized)
}
