//! Remote API client: pagination, auth, and rate-limit handling.
//!
//! Callers see whole collections and final responses; page-following and
//! 429 backoff happen inside. Retries are bounded and use an async sleep,
//! so dropping the future cancels a stuck backoff.

pub mod types;

use crate::db::{Store, StoreError};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use types::{Collection, ReviewSubmission, StartAssignmentPayload, UserResource};

pub const DEFAULT_BASE_URL: &str = "https://api.wanikani.com/v2";

/// API revision pin; the service versions payload shapes with this header.
const REVISION_HEADER: (&str, &str) = ("Wanikani-Revision", "20170710");

/// Metadata key holding the bearer credential.
pub const API_KEY_META: &str = "api_key";

#[derive(Debug, Error)]
pub enum ApiError {
    /// 401: the credential is bad. Never retried; the caller must
    /// re-authenticate.
    #[error("invalid API token")]
    InvalidApiKey,

    /// Other 4xx/5xx: fatal for this request, not retried.
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Consecutive 429s exhausted the retry budget.
    #[error("rate limited: gave up after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Parse(String),
}

impl ApiError {
    /// Whether this error means the remote is unreachable rather than
    /// unhappy. The sync orchestrator reports these as a transient
    /// offline state.
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Network(e) if e.is_connect() || e.is_timeout() || e.is_request())
    }
}

/// Bounded fixed-interval retry on rate limiting.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Fixed delay between attempts after a 429.
    pub backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(60),
        }
    }
}

/// Resolve the bearer credential: an explicitly supplied token is captured
/// into the store (first run); otherwise it is sourced from the store.
pub fn resolve_token(store: &Store, explicit: Option<String>) -> Result<String, StoreError> {
    match explicit {
        Some(token) => {
            store.set_meta(API_KEY_META, &token)?;
            Ok(token)
        }
        None => store
            .get_meta(API_KEY_META)?
            .ok_or(StoreError::MissingApiKey),
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    retry: RetryConfig,
}

enum Outcome {
    Ok(Value),
    RateLimited,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, retry: RetryConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            retry,
        }
    }

    /// GET a paginated resource, following `pages.next_url` until absent,
    /// and concatenate all item arrays.
    pub async fn fetch_paged(
        &self,
        resource: &str,
        updated_after: Option<&str>,
    ) -> Result<Vec<Value>, ApiError> {
        let mut items = Vec::new();
        let mut url = Some(match updated_after {
            Some(cursor) => format!("{}/{}?updated_after={}", self.base_url, resource, cursor),
            None => format!("{}/{}", self.base_url, resource),
        });

        while let Some(page_url) = url {
            let body = self.execute(|| self.http.get(&page_url)).await?;
            let page: Collection =
                serde_json::from_value(body).map_err(|e| ApiError::Parse(e.to_string()))?;
            items.extend(page.data);
            url = page.pages.and_then(|p| p.next_url);
        }

        tracing::debug!(resource, count = items.len(), "fetched collection");
        Ok(items)
    }

    pub async fn fetch_user(&self) -> Result<UserResource, ApiError> {
        let url = format!("{}/user", self.base_url);
        let body = self.execute(|| self.http.get(&url)).await?;
        serde_json::from_value(body).map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// POST a completed review upstream.
    pub async fn submit_review(&self, submission: &ReviewSubmission) -> Result<Value, ApiError> {
        let url = format!("{}/reviews", self.base_url);
        self.execute(|| self.http.post(&url).json(submission)).await
    }

    /// PUT the lesson-taken marker for an assignment.
    pub async fn start_assignment(
        &self,
        assignment_id: i64,
        payload: &StartAssignmentPayload,
    ) -> Result<Value, ApiError> {
        let url = format!("{}/assignments/{}/start", self.base_url, assignment_id);
        self.execute(|| self.http.put(&url).json(payload)).await
    }

    /// Send a request, classifying the response and retrying on 429 up to
    /// the configured budget.
    async fn execute<F>(&self, build: F) -> Result<Value, ApiError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        for attempt in 1..=self.retry.max_attempts {
            let response = build()
                .bearer_auth(&self.token)
                .header(REVISION_HEADER.0, REVISION_HEADER.1)
                .send()
                .await?;

            match self.classify(response).await? {
                Outcome::Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(attempt, "request succeeded after rate-limit backoff");
                    }
                    return Ok(value);
                }
                Outcome::RateLimited => {
                    if attempt < self.retry.max_attempts {
                        tracing::warn!(
                            attempt,
                            max = self.retry.max_attempts,
                            backoff_secs = self.retry.backoff.as_secs_f64(),
                            "rate limited, backing off"
                        );
                        tokio::time::sleep(self.retry.backoff).await;
                    }
                }
            }
        }

        Err(ApiError::RetriesExhausted {
            attempts: self.retry.max_attempts,
        })
    }

    async fn classify(&self, response: reqwest::Response) -> Result<Outcome, ApiError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::InvalidApiKey);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Ok(Outcome::RateLimited);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        let value = response
            .json::<Value>()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        Ok(Outcome::Ok(value))
    }
}
