use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Badge {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub points_threshold: i32,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AwardedBadge {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub points_threshold: i32,
    pub awarded_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewBadge {
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub points_threshold: i32,
}

impl NewBadge {
    pub fn validated(self) -> AppResult<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() || name.chars().count() > 80 {
            return Err(AppError::bad_request(
                "Badge name is required and must be at most 80 characters",
            ));
        }
        if self.points_threshold < 0 {
            return Err(AppError::bad_request("Points threshold cannot be negative"));
        }
        Ok(NewBadge {
            name,
            description: self.description.filter(|d| !d.trim().is_empty()),
            icon: self.icon.filter(|i| !i.trim().is_empty()),
            points_threshold: self.points_threshold,
        })
    }
}
