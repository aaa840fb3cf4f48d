use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

use crate::trials::TrialsError;

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        AppError {
            status,
            message: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.status)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "success": false, "error": self.message }));
        (self.status, body).into_response()
    }
}

/// (table prefix, column keyword, message). An empty keyword matches any
/// constraint on that table.
const UNIQUE_MESSAGES: &[(&str, &str, &str)] = &[
    ("profiles_", "pkey", "You already have a member profile"),
    ("profiles_", "username", "That username is already taken"),
    ("profiles_", "referral_code", "That referral code is already in use"),
    ("supporters_", "email", "An account with this email already exists"),
    ("supporters_", "user_id", "You are already registered as a supporter"),
    ("supporters_", "referral_code", "That referral code is already in use"),
    (
        "wishes_",
        "",
        "You already have an active wish. Wait until it is fulfilled or rejected before submitting another.",
    ),
    ("user_votes_", "", "You have already voted in this poll"),
    ("user_badges_", "", "This badge has already been awarded"),
    ("badges_", "name", "A badge with this name already exists"),
    ("referrals_", "", "This referral has already been recorded"),
];

/// The quoted constraint name in a Postgres unique-violation message, or the
/// whole message when there is none.
fn constraint_name(db_message: &str) -> &str {
    db_message.split('"').nth(1).unwrap_or(db_message)
}

/// Picks the user-facing text for a unique violation from the constraint
/// named in the database message.
pub fn unique_violation_message(db_message: &str) -> &'static str {
    let name = constraint_name(db_message).to_ascii_lowercase();
    UNIQUE_MESSAGES
        .iter()
        .find(|(table, column, _)| {
            name.strip_prefix(table)
                .is_some_and(|rest| rest.contains(column))
        })
        .map(|(_, _, message)| *message)
        .unwrap_or("This record already exists")
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::not_found("Not found"),
            sqlx::Error::Database(db_err)
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                AppError::conflict(unique_violation_message(db_err.message()))
            }
            _ => {
                tracing::error!(error = %err, "database operation failed");
                AppError::internal("Something went wrong, please try again")
            }
        }
    }
}

impl From<TrialsError> for AppError {
    fn from(err: TrialsError) -> Self {
        match err {
            TrialsError::NotFound => AppError::not_found("Clinical trial not found"),
            other => {
                tracing::warn!(error = %other, "clinical trials service call failed");
                AppError::new(
                    StatusCode::BAD_GATEWAY,
                    "The clinical trials service is unavailable right now",
                )
            }
        }
    }
}
