//! Client for the external clinical-trials search service.

use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

use crate::models::trial::{Trial, TrialSearchRequest, TrialSearchResponse};

const SEARCH_PATH: &str = "/api/v1/trials/search";
const DETAIL_PATH: &str = "/api/v1/trials";
const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Error)]
pub enum TrialsError {
    #[error("trials request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("trials service answered with status {0}")]
    Status(u16),

    #[error("trial not found")]
    NotFound,
}

#[derive(Clone)]
pub struct TrialsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl TrialsClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, TrialsError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(TrialsClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn with_key(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }

    #[tracing::instrument(skip(self, request), fields(conditions = ?request.conditions))]
    pub async fn search(
        &self,
        request: &TrialSearchRequest,
    ) -> Result<TrialSearchResponse, TrialsError> {
        let url = format!("{}{}", self.base_url, SEARCH_PATH);
        let response = self
            .with_key(self.http.post(&url).json(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrialsError::Status(status.as_u16()));
        }
        let body: TrialSearchResponse = response.json().await?;
        tracing::debug!(
            returned = body.trials.len(),
            total = body.total_count,
            "trials search completed"
        );
        Ok(body)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, nct_id: &str) -> Result<Trial, TrialsError> {
        let url = format!(
            "{}{}/{}",
            self.base_url,
            DETAIL_PATH,
            urlencoding::encode(nct_id)
        );
        let response = self.with_key(self.http.get(&url)).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(TrialsError::NotFound),
            status if !status.is_success() => Err(TrialsError::Status(status.as_u16())),
            _ => Ok(response.json().await?),
        }
    }
}
