//! Error type returned by every handler.

use crate::forms::FormErrors;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use catalog::CatalogError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum AppError {
    /// Catalog lookup failed or answered with something unusable
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Store, database or other internal failure
    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),

    /// Submitted form did not validate
    #[error("invalid form")]
    Form(FormErrors),

    /// Route matched but the target does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Route requires a logged-in user
    #[error("login required")]
    Unauthorized,
}

impl AppError {
    /// Shorthand for a form error on one field
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FormErrors::new();
        errors.add(field, message);
        AppError::Form(errors)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Catalog(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            AppError::Catalog(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Form(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = match self {
            AppError::Form(errors) => json!({ "form": errors }),
            AppError::Internal(e) => {
                error!(error = %format!("{:#}", e), "Request failed");
                json!({ "error": "internal server error" })
            }
            AppError::Catalog(e) if status == StatusCode::BAD_GATEWAY => {
                warn!(error = %e, "Catalog failure");
                json!({ "error": self.to_string() })
            }
            _ => json!({ "error": self.to_string() }),
        };
        HttpResponse::build(status).json(body)
    }
}
