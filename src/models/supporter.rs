use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("valid email regex")
});

const MAX_NAME: usize = 80;

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Supporter {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub referral_code: String,
    pub referred_by: Option<Uuid>,
    pub converted_profile_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SupporterSignup {
    pub name: String,
    pub email: String,
    pub referral_code: Option<String>,
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

impl SupporterSignup {
    pub fn validated(self) -> AppResult<Self> {
        let name = self.name.trim().to_string();
        let email = self.email.trim().to_ascii_lowercase();
        if name.is_empty() || name.chars().count() > MAX_NAME {
            return Err(AppError::bad_request(format!(
                "Name is required and must be at most {MAX_NAME} characters"
            )));
        }
        if !is_valid_email(&email) {
            return Err(AppError::bad_request("Please enter a valid email address"));
        }
        let referral_code = self
            .referral_code
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty());
        Ok(SupporterSignup {
            name,
            email,
            referral_code,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ConvertRequest {
    pub username: Option<String>,
}
