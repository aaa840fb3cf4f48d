use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

const MIN_OPTIONS: usize = 2;
const MAX_OPTIONS: usize = 10;
const MAX_OPTION_LEN: usize = 200;
const TITLE_LEN: (usize, usize) = (3, 200);

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Vote {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub options: Vec<String>,
    pub is_active: bool,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Vote {
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.ends_at.map_or(true, |end| now < end)
    }

    pub fn has_option(&self, index: i32) -> bool {
        usize::try_from(index).is_ok_and(|i| i < self.options.len())
    }
}

/// An active poll together with the caller's recorded choice, if any.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct VoteWithChoice {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub options: Vec<String>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub my_choice: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    pub option_index: i32,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct OptionResult {
    pub option: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct VoteResults {
    pub vote_id: Uuid,
    pub title: String,
    pub total: i64,
    pub results: Vec<OptionResult>,
}

/// Lays per-index counts over the option list; indexes with no rows count 0.
pub fn tally_options(options: &[String], counts: &[(i32, i64)]) -> Vec<OptionResult> {
    options
        .iter()
        .enumerate()
        .map(|(index, option)| OptionResult {
            option: option.clone(),
            count: counts
                .iter()
                .filter(|(i, _)| usize::try_from(*i).is_ok_and(|i| i == index))
                .map(|(_, c)| *c)
                .sum(),
        })
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct NewVote {
    pub title: String,
    pub description: Option<String>,
    pub options: Vec<String>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl NewVote {
    pub fn validated(self, now: DateTime<Utc>) -> AppResult<Self> {
        let title = self.title.trim().to_string();
        let len = title.chars().count();
        if len < TITLE_LEN.0 || len > TITLE_LEN.1 {
            return Err(AppError::bad_request(format!(
                "Title must be between {} and {} characters",
                TITLE_LEN.0, TITLE_LEN.1
            )));
        }
        let options: Vec<String> = self
            .options
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        if options.len() < MIN_OPTIONS || options.len() > MAX_OPTIONS {
            return Err(AppError::bad_request(format!(
                "A poll needs between {MIN_OPTIONS} and {MAX_OPTIONS} options"
            )));
        }
        if options.iter().any(|o| o.chars().count() > MAX_OPTION_LEN) {
            return Err(AppError::bad_request(format!(
                "Options must be at most {MAX_OPTION_LEN} characters"
            )));
        }
        if self.ends_at.is_some_and(|end| end <= now) {
            return Err(AppError::bad_request("End date must be in the future"));
        }
        Ok(NewVote {
            title,
            description: self
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            options,
            ends_at: self.ends_at,
        })
    }
}
