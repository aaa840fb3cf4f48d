use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MEMBER: &str = "member";

const MAX_DISPLAY_NAME: usize = 80;
const MAX_BIO: usize = 1000;
const MAX_LOCATION: usize = 120;
const MAX_AVATAR_URL: usize = 500;

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub avatar_url: Option<String>,
    pub points: i32,
    pub referral_code: String,
    pub is_public: bool,
    pub profile_completed: bool,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    /// A profile counts as complete once name, bio and location are filled.
    pub fn meets_completion_criteria(&self) -> bool {
        [&self.display_name, &self.bio, &self.location]
            .iter()
            .all(|field| field.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }

    pub fn display_label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct PublicProfile {
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub avatar_url: Option<String>,
    pub points: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct LeaderboardEntry {
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub points: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub avatar_url: Option<String>,
    pub is_public: Option<bool>,
}

fn check_len(field: &str, value: &Option<String>, max: usize) -> AppResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(AppError::bad_request(format!(
            "{field} must be at most {max} characters"
        ))),
        _ => Ok(()),
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ProfileUpdate {
    /// Trims every text field and checks length limits.
    pub fn validated(self) -> AppResult<Self> {
        let update = ProfileUpdate {
            display_name: clean(self.display_name),
            bio: clean(self.bio),
            location: clean(self.location),
            avatar_url: clean(self.avatar_url),
            is_public: self.is_public,
        };
        check_len("Display name", &update.display_name, MAX_DISPLAY_NAME)?;
        check_len("Bio", &update.bio, MAX_BIO)?;
        check_len("Location", &update.location, MAX_LOCATION)?;
        check_len("Avatar URL", &update.avatar_url, MAX_AVATAR_URL)?;
        if let Some(url) = &update.avatar_url {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(AppError::bad_request("Avatar URL must be an http(s) link"));
            }
        }
        Ok(update)
    }
}
