//! Web application of the maaboo media tracker.
//!
//! Wires the catalog clients and the store into actix-web handlers:
//! - Search and detail pages for anime, manga and books
//! - Registration, login and cookie sessions
//! - Per-user progress tracking

pub mod auth;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod state;

pub use error::AppError;
pub use forms::FormErrors;
pub use state::AppState;
