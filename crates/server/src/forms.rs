//! Request forms and their validation.
//!
//! Every form deserializes leniently (missing fields become empty strings)
//! and is then checked by `clean`, which either yields the cleaned values
//! or an [`AppError::Form`] holding every message per field.

use crate::error::AppError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use shared::{ProgressStatus, Store};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Key for errors that belong to the form as a whole
pub const NON_FIELD_ERRORS: &str = "__all__";

pub const SEARCH_QUERY_MAX_LEN: usize = 150;
pub const USERNAME_MAX_LEN: usize = 150;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const STAR_RATE_MAX: i64 = 5;

const REQUIRED: &str = "This field is required.";
const USERNAME_TAKEN: &str = "A user with that username already exists.";

static USERNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").expect("static username pattern"));

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").expect("static email pattern"));

/// Validation messages keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Messages for one field (empty if the field is valid)
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `Ok(value)` when no error was recorded
    pub fn finish<T>(self, value: T) -> Result<T, AppError> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(AppError::Form(self))
        }
    }
}

/// Trimmed value of a required field, recording an error when blank
fn required<'a>(errors: &mut FormErrors, field: &str, value: &'a str) -> Option<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
        None
    } else {
        Some(value)
    }
}

fn max_length(errors: &mut FormErrors, field: &str, value: &str, max: usize) -> bool {
    let len = value.chars().count();
    if len > max {
        errors.add(
            field,
            format!(
                "Ensure this value has at most {} characters (it has {}).",
                max, len
            ),
        );
        return false;
    }
    true
}

// ========== Search ==========

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchForm {
    #[serde(default)]
    pub query: String,
}

impl SearchForm {
    /// Trimmed search term
    pub fn clean(&self) -> Result<String, AppError> {
        let mut errors = FormErrors::new();
        let query = required(&mut errors, "query", &self.query)
            .filter(|q| max_length(&mut errors, "query", q, SEARCH_QUERY_MAX_LEN))
            .unwrap_or_default()
            .to_string();
        errors.finish(query)
    }
}

// ========== Registration ==========

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUserForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

/// Validated registration, password still in clear text
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl NewUserForm {
    /// Validate every field and check the username is free
    pub fn clean(&self, store: &Store) -> Result<Registration, AppError> {
        let mut errors = FormErrors::new();

        let username = required(&mut errors, "username", &self.username).filter(|name| {
            if !max_length(&mut errors, "username", name, USERNAME_MAX_LEN) {
                return false;
            }
            if !USERNAME.is_match(name) {
                errors.add(
                    "username",
                    "Enter a valid username. This value may contain only letters, \
                     numbers, and @/./+/-/_ characters.",
                );
                return false;
            }
            true
        });

        if let Some(name) = username {
            if store.username_exists(name)? {
                errors.add("username", USERNAME_TAKEN);
            }
        }

        let email = required(&mut errors, "email", &self.email).filter(|email| {
            let valid = EMAIL.is_match(email);
            if !valid {
                errors.add("email", "Enter a valid email address.");
            }
            valid
        });

        // Passwords are taken verbatim
        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        } else if self.password1.chars().count() < PASSWORD_MIN_LEN {
            errors.add(
                "password1",
                format!(
                    "This password is too short. It must contain at least {} characters.",
                    PASSWORD_MIN_LEN
                ),
            );
        }

        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match.");
        }

        errors.finish(Registration {
            username: username.unwrap_or_default().to_string(),
            email: email.unwrap_or_default().to_string(),
            password: self.password1.clone(),
        })
    }

    /// Error for a username claimed between validation and insert
    pub fn username_taken() -> AppError {
        AppError::field("username", USERNAME_TAKEN)
    }
}

// ========== Login ==========

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn clean(&self) -> Result<Credentials, AppError> {
        let mut errors = FormErrors::new();
        let username = required(&mut errors, "username", &self.username).unwrap_or_default();
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        errors.finish(Credentials {
            username: username.to_string(),
            password: self.password.clone(),
        })
    }

    /// Error for an unknown username or a wrong password
    pub fn invalid_login() -> AppError {
        AppError::field(
            NON_FIELD_ERRORS,
            "Please enter a correct username and password.",
        )
    }
}

// ========== Progress ==========

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgressForm {
    #[serde(default)]
    pub status: String,
    /// Episode, chapter or page; blank means unknown
    #[serde(default)]
    pub position: String,
    /// Blank means unrated (0)
    #[serde(default)]
    pub star_rate: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressInput {
    pub status: ProgressStatus,
    pub position: Option<i64>,
    pub star_rate: i64,
}

fn integer(errors: &mut FormErrors, field: &str, value: &str) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match value.parse::<i64>() {
        Ok(n) => Some(n),
        Err(_) => {
            errors.add(field, "Enter a whole number.");
            None
        }
    }
}

impl ProgressForm {
    pub fn clean(&self) -> Result<ProgressInput, AppError> {
        let mut errors = FormErrors::new();

        let status = required(&mut errors, "status", &self.status).and_then(|s| {
            match s.parse::<ProgressStatus>() {
                Ok(status) => Some(status),
                Err(_) => {
                    errors.add(
                        "status",
                        format!(
                            "Select a valid choice. {} is not one of the available choices.",
                            s
                        ),
                    );
                    None
                }
            }
        });

        let position = integer(&mut errors, "position", &self.position);
        if matches!(position, Some(n) if n < 0) {
            errors.add("position", "Ensure this value is greater than or equal to 0.");
        }

        let star_rate = integer(&mut errors, "star_rate", &self.star_rate).unwrap_or(0);
        if !(0..=STAR_RATE_MAX).contains(&star_rate) {
            errors.add(
                "star_rate",
                format!("Ensure this value is between 0 and {}.", STAR_RATE_MAX),
            );
        }

        let Some(status) = status else {
            return Err(AppError::Form(errors));
        };
        errors.finish(ProgressInput {
            status,
            position,
            star_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Database, NewUser};

    fn store() -> Store {
        Store::new(Database::open_in_memory().unwrap())
    }

    fn form_errors(result: Result<impl std::fmt::Debug, AppError>) -> FormErrors {
        match result {
            Err(AppError::Form(errors)) => errors,
            other => panic!("expected form errors, got {:?}", other),
        }
    }

    fn registration(password1: &str, password2: &str) -> NewUserForm {
        NewUserForm {
            username: "spike".to_string(),
            email: "spike@bebop.test".to_string(),
            password1: password1.to_string(),
            password2: password2.to_string(),
        }
    }

    #[test]
    fn test_search_query_is_trimmed() {
        let form = SearchForm {
            query: "  Naruto ".to_string(),
        };
        assert_eq!(form.clean().unwrap(), "Naruto");
    }

    #[test]
    fn test_search_query_required() {
        for query in ["", "   "] {
            let errors = form_errors(
                SearchForm {
                    query: query.to_string(),
                }
                .clean(),
            );
            assert_eq!(errors.get("query"), [REQUIRED.to_string()]);
        }
    }

    #[test]
    fn test_search_query_max_length() {
        let ok = SearchForm {
            query: "a".repeat(SEARCH_QUERY_MAX_LEN),
        };
        assert!(ok.clean().is_ok());

        let too_long = SearchForm {
            query: "a".repeat(SEARCH_QUERY_MAX_LEN + 1),
        };
        assert!(form_errors(too_long.clean()).has("query"));
    }

    #[test]
    fn test_password_length_boundary() {
        let store = store();

        let seven = form_errors(registration("abcdefg", "abcdefg").clean(&store));
        assert!(seven.has("password1"));

        let eight = registration("abcdefgh", "abcdefgh").clean(&store).unwrap();
        assert_eq!(eight.password, "abcdefgh");
        assert_eq!(eight.email, "spike@bebop.test");
    }

    #[test]
    fn test_password_mismatch() {
        let errors = form_errors(registration("swordfish2", "swordfish3").clean(&store()));
        assert_eq!(
            errors.get("password2"),
            ["The two password fields didn't match.".to_string()]
        );
        assert!(!errors.has("password1"));
    }

    #[test]
    fn test_username_characters() {
        let store = store();
        let mut form = registration("swordfish2", "swordfish2");

        form.username = "spike spiegel".to_string();
        assert!(form_errors(form.clean(&store)).has("username"));

        form.username = "spike.s+bebop@crew_1-x".to_string();
        assert!(form.clean(&store).is_ok());

        form.username = "s".repeat(USERNAME_MAX_LEN + 1);
        assert!(form_errors(form.clean(&store)).has("username"));
    }

    #[test]
    fn test_email_validation() {
        let store = store();
        let mut form = registration("swordfish2", "swordfish2");

        for bad in ["", "spike", "spike@bebop", "spike @bebop.test"] {
            form.email = bad.to_string();
            assert!(form_errors(form.clean(&store)).has("email"), "{}", bad);
        }
    }

    #[test]
    fn test_username_taken() {
        let mut store = store();
        store
            .create_user(&NewUser {
                username: "spike".to_string(),
                email: "spike@bebop.test".to_string(),
                password_hash: "x".to_string(),
            })
            .unwrap()
            .unwrap();

        let errors = form_errors(registration("swordfish2", "swordfish2").clean(&store));
        assert_eq!(
            errors.get("username"),
            ["A user with that username already exists.".to_string()]
        );
    }

    #[test]
    fn test_every_error_is_reported_at_once() {
        let errors = form_errors(NewUserForm::default().clean(&store()));
        for field in ["username", "email", "password1", "password2"] {
            assert!(errors.has(field), "{}", field);
        }
    }

    #[test]
    fn test_login_form_required_fields() {
        let errors = form_errors(LoginForm::default().clean());
        assert!(errors.has("username"));
        assert!(errors.has("password"));

        let credentials = LoginForm {
            username: " faye ".to_string(),
            password: " pw ".to_string(),
        }
        .clean()
        .unwrap();
        assert_eq!(credentials.username, "faye");
        assert_eq!(credentials.password, " pw ");
    }

    #[test]
    fn test_progress_form() {
        let input = ProgressForm {
            status: "ON_HOLD".to_string(),
            position: "12".to_string(),
            star_rate: "4".to_string(),
        }
        .clean()
        .unwrap();
        assert_eq!(
            input,
            ProgressInput {
                status: ProgressStatus::OnHold,
                position: Some(12),
                star_rate: 4,
            }
        );

        let blank = ProgressForm {
            status: "ONGOING".to_string(),
            ..Default::default()
        }
        .clean()
        .unwrap();
        assert_eq!(blank.position, None);
        assert_eq!(blank.star_rate, 0);
    }

    #[test]
    fn test_progress_form_rejects_bad_values() {
        let errors = form_errors(
            ProgressForm {
                status: "DROPPED".to_string(),
                position: "-1".to_string(),
                star_rate: "6".to_string(),
            }
            .clean(),
        );
        assert!(errors.has("status"));
        assert!(errors.has("position"));
        assert!(errors.has("star_rate"));

        let errors = form_errors(
            ProgressForm {
                status: "ONGOING".to_string(),
                position: "twelve".to_string(),
                star_rate: String::new(),
            }
            .clean(),
        );
        assert_eq!(errors.get("position"), ["Enter a whole number.".to_string()]);
    }
}
