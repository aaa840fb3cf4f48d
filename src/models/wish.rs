use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

const TITLE_LEN: (usize, usize) = (3, 120);
const DESCRIPTION_LEN: (usize, usize) = (10, 2000);
const MAX_CATEGORY: usize = 50;
const MAX_NOTE: usize = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WishStatus {
    Pending,
    Approved,
    Fulfilled,
    Rejected,
}

#[derive(Debug, Error)]
#[error("unknown wish status: {0}")]
pub struct UnknownWishStatus(String);

impl WishStatus {
    pub const ACTIVE: [WishStatus; 2] = [WishStatus::Pending, WishStatus::Approved];

    pub fn as_str(self) -> &'static str {
        match self {
            WishStatus::Pending => "pending",
            WishStatus::Approved => "approved",
            WishStatus::Fulfilled => "fulfilled",
            WishStatus::Rejected => "rejected",
        }
    }

    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }

    /// `pending → approved → fulfilled`, or `pending → rejected`.
    pub fn can_transition_to(self, next: WishStatus) -> bool {
        matches!(
            (self, next),
            (WishStatus::Pending, WishStatus::Approved)
                | (WishStatus::Pending, WishStatus::Rejected)
                | (WishStatus::Approved, WishStatus::Fulfilled)
        )
    }

    /// Visible to everyone, not just the owner and admins.
    pub fn is_public(self) -> bool {
        matches!(self, WishStatus::Approved | WishStatus::Fulfilled)
    }
}

impl fmt::Display for WishStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WishStatus {
    type Err = UnknownWishStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WishStatus::Pending),
            "approved" => Ok(WishStatus::Approved),
            "fulfilled" => Ok(WishStatus::Fulfilled),
            "rejected" => Ok(WishStatus::Rejected),
            other => Err(UnknownWishStatus(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Wish {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub status: WishStatus,
    pub admin_note: Option<String>,
    pub fulfilled_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for Wish {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<WishStatus>()
            .map_err(|err| sqlx::Error::ColumnDecode {
                index: "status".into(),
                source: Box::new(err),
            })?;
        Ok(Wish {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            category: row.try_get("category")?,
            status,
            admin_note: row.try_get("admin_note")?,
            fulfilled_by: row.try_get("fulfilled_by")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct WishInput {
    pub title: String,
    pub description: String,
    pub category: Option<String>,
}

fn check_range(field: &str, value: &str, (min, max): (usize, usize)) -> AppResult<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(AppError::bad_request(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

impl WishInput {
    pub fn validated(self) -> AppResult<Self> {
        let title = self.title.trim().to_string();
        let description = self.description.trim().to_string();
        let category = self
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        check_range("Title", &title, TITLE_LEN)?;
        check_range("Description", &description, DESCRIPTION_LEN)?;
        if category.as_ref().is_some_and(|c| c.chars().count() > MAX_CATEGORY) {
            return Err(AppError::bad_request(format!(
                "Category must be at most {MAX_CATEGORY} characters"
            )));
        }
        Ok(WishInput {
            title,
            description,
            category,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct WishStatusUpdate {
    pub status: WishStatus,
    pub note: Option<String>,
    pub fulfilled_by: Option<String>,
}

impl WishStatusUpdate {
    pub fn validated(self) -> AppResult<Self> {
        let note = self.note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        if note.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTE) {
            return Err(AppError::bad_request(format!(
                "Note must be at most {MAX_NOTE} characters"
            )));
        }
        let fulfilled_by = self
            .fulfilled_by
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty());
        if fulfilled_by.is_some() && self.status != WishStatus::Fulfilled {
            return Err(AppError::bad_request(
                "fulfilled_by can only be set when marking a wish fulfilled",
            ));
        }
        Ok(WishStatusUpdate {
            status: self.status,
            note,
            fulfilled_by,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct WishListQuery {
    pub status: Option<WishStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_transitions() {
        use WishStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Fulfilled));

        assert!(!Pending.can_transition_to(Fulfilled));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Approved.can_transition_to(Pending));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Fulfilled.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn only_pending_and_approved_are_active() {
        assert!(WishStatus::Pending.is_active());
        assert!(WishStatus::Approved.is_active());
        assert!(!WishStatus::Fulfilled.is_active());
        assert!(!WishStatus::Rejected.is_active());
    }

    #[test]
    fn status_parses_from_db_text() {
        for status in [
            WishStatus::Pending,
            WishStatus::Approved,
            WishStatus::Fulfilled,
            WishStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<WishStatus>().unwrap(), status);
        }
        assert!("closed".parse::<WishStatus>().is_err());
    }

    #[test]
    fn wish_input_bounds() {
        let ok = WishInput {
            title: "  New wheelchair cushion ".into(),
            description: "A pressure relief cushion for daily use.".into(),
            category: Some(" ".into()),
        }
        .validated()
        .unwrap();
        assert_eq!(ok.title, "New wheelchair cushion");
        assert!(ok.category.is_none());

        let short = WishInput {
            title: "Hi".into(),
            description: "A pressure relief cushion.".into(),
            category: None,
        };
        assert!(short.validated().is_err());
    }

    #[test]
    fn fulfilled_by_only_with_fulfilled_status() {
        let update = WishStatusUpdate {
            status: WishStatus::Approved,
            note: None,
            fulfilled_by: Some("Ana".into()),
        };
        assert!(update.validated().is_err());
    }
}
