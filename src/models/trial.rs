use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;
const MAX_CONDITIONS: usize = 10;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialLocationFilter {
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

/// Payload for the upstream search endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialSearchRequest {
    pub conditions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub status: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phase: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<TrialLocationFilter>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim().to_string();
        if !value.is_empty() && !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

impl TrialSearchRequest {
    /// Trims and de-duplicates filters, requires at least one condition and
    /// clamps the page size.
    pub fn normalized(self) -> AppResult<Self> {
        let conditions = clean_list(self.conditions);
        if conditions.is_empty() {
            return Err(AppError::bad_request(
                "Enter at least one condition to search for",
            ));
        }
        if conditions.len() > MAX_CONDITIONS {
            return Err(AppError::bad_request(format!(
                "Search for at most {MAX_CONDITIONS} conditions at once"
            )));
        }
        let location = match self.location {
            Some(loc) if !loc.country.trim().is_empty() => Some(TrialLocationFilter {
                country: loc.country.trim().to_string(),
                state: loc.state.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
                city: loc.city.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            }),
            _ => None,
        };
        Ok(TrialSearchRequest {
            conditions,
            status: clean_list(self.status),
            phase: clean_list(self.phase),
            location,
            page_size: Some(
                self.page_size
                    .unwrap_or(DEFAULT_PAGE_SIZE)
                    .clamp(1, MAX_PAGE_SIZE),
            ),
            page_token: self.page_token.filter(|t| !t.is_empty()),
        })
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TrialSite {
    #[serde(default)]
    pub facility: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// A trial as returned by the search service. Fields this service does not
/// interpret are passed through untouched.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Trial {
    pub nct_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub brief_summary: Option<String>,
    #[serde(default)]
    pub locations: Vec<TrialSite>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrialSearchResponse {
    #[serde(default)]
    pub trials: Vec<Trial>,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub page_token: Option<String>,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct TrialAlert {
    pub id: Uuid,
    pub user_id: Uuid,
    pub conditions: Vec<String>,
    pub status: Vec<String>,
    pub phase: Vec<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TrialAlert {
    pub fn search_request(&self) -> TrialSearchRequest {
        TrialSearchRequest {
            conditions: self.conditions.clone(),
            status: self.status.clone(),
            phase: self.phase.clone(),
            location: self.country.as_ref().map(|country| TrialLocationFilter {
                country: country.clone(),
                state: None,
                city: self.city.clone(),
            }),
            page_size: Some(MAX_PAGE_SIZE),
            page_token: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewTrialAlert {
    pub conditions: Vec<String>,
    #[serde(default)]
    pub status: Vec<String>,
    #[serde(default)]
    pub phase: Vec<String>,
    pub country: Option<String>,
    pub city: Option<String>,
}

impl NewTrialAlert {
    pub fn validated(self) -> AppResult<Self> {
        let search = TrialSearchRequest {
            conditions: self.conditions,
            status: self.status,
            phase: self.phase,
            location: self.country.map(|country| TrialLocationFilter {
                country,
                state: None,
                city: self.city.clone(),
            }),
            page_size: None,
            page_token: None,
        }
        .normalized()?;
        let (country, city) = match search.location {
            Some(loc) => (Some(loc.country), loc.city),
            None => (None, None),
        };
        Ok(NewTrialAlert {
            conditions: search.conditions,
            status: search.status,
            phase: search.phase,
            country,
            city,
        })
    }
}
