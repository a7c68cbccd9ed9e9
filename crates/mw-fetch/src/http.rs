//! reqwest-backed fetcher.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mw_config::secrets::Secrets;
use mw_config::CycleConfig;
use mw_schemas::{FetchFailure, FetchResult, FetchSuccess, Resource};
use mw_sources::{resolve_headers, SourceDescriptor};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use tracing::{info, warn};

use crate::pacing::Sleeper;
use crate::{shapes, FetchError, Fetcher};

/// Error-body snippet length carried into failure messages.
const ERROR_SNIPPET_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPolicy {
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub user_agent: String,
}

impl FetchPolicy {
    pub fn from_config(cfg: &CycleConfig) -> Self {
        Self {
            request_timeout: cfg.request_timeout(),
            max_retries: cfg.max_retries,
            retry_delay: cfg.retry_delay(),
            user_agent: cfg.user_agent.clone(),
        }
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self::from_config(&CycleConfig::default())
    }
}

pub struct HttpFetcher {
    http: reqwest::Client,
    policy: FetchPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl HttpFetcher {
    pub fn new(policy: FetchPolicy, sleeper: Arc<dyn Sleeper>) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| FetchError::Transport(format!("http client init failed: {e}")))?;
        Ok(Self {
            http,
            policy,
            sleeper,
        })
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Fetch with an explicit retry budget. Each failed attempt with budget
    /// left waits `retry_delay`, then tries again with one less retry.
    pub async fn fetch_with_retries(
        &self,
        source: &SourceDescriptor,
        secrets: &Secrets,
        max_retries: u32,
    ) -> FetchResult {
        let mut retries_left = max_retries;
        loop {
            // Header building is part of each attempt.
            let attempt = match self.build_headers(source, secrets) {
                Ok(headers) => self.attempt(source, &headers).await,
                Err(e) => Err(e),
            };
            match attempt {
                Ok(resources) => {
                    return FetchResult::Success(FetchSuccess {
                        source_id: source.id.clone(),
                        resources,
                        observed_at: Utc::now(),
                    });
                }
                Err(e) if retries_left > 0 => {
                    retries_left -= 1;
                    info!(source = %source.id, error = %e, retries_left, "retrying fetch");
                    self.sleeper.sleep(self.policy.retry_delay).await;
                }
                Err(e) => {
                    warn!(source = %source.id, error = %e, "fetch failed");
                    return failure(source, &e);
                }
            }
        }
    }

    /// Base headers merged with resolved secret headers; secret headers win.
    fn build_headers(
        &self,
        source: &SourceDescriptor,
        secrets: &Secrets,
    ) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();
        let ua = HeaderValue::from_str(&self.policy.user_agent)
            .map_err(|_| FetchError::InvalidHeader(USER_AGENT.to_string()))?;
        headers.insert(USER_AGENT, ua);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (name, value) in resolve_headers(source, secrets) {
            let hn = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| FetchError::InvalidHeader(name.clone()))?;
            let hv = HeaderValue::from_str(&value).map_err(|_| FetchError::InvalidHeader(name))?;
            headers.insert(hn, hv);
        }
        Ok(headers)
    }

    async fn attempt(
        &self,
        source: &SourceDescriptor,
        headers: &HeaderMap,
    ) -> Result<Vec<Resource>, FetchError> {
        let resp = self
            .http
            .get(&source.endpoint)
            .headers(headers.clone())
            .timeout(self.policy.request_timeout)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        if !status.is_success() {
            // Best effort: an unreadable body just drops the snippet.
            let snippet = resp
                .text()
                .await
                .ok()
                .map(|b| b.chars().take(ERROR_SNIPPET_CHARS).collect::<String>())
                .filter(|s| !s.is_empty());
            return Err(FetchError::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
                snippet,
            });
        }

        let body = resp.bytes().await.map_err(|e| self.classify(e))?;
        let value: serde_json::Value =
            serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))?;

        Ok(shapes::normalize(&value, &source.display_name))
    }

    fn classify(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.policy.request_timeout.as_millis() as u64)
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, source: &SourceDescriptor, secrets: &Secrets) -> FetchResult {
        self.fetch_with_retries(source, secrets, self.policy.max_retries)
            .await
    }
}

fn failure(source: &SourceDescriptor, e: &FetchError) -> FetchResult {
    FetchResult::Failure(FetchFailure {
        source_id: source.id.clone(),
        message: e.to_string(),
        observed_at: Utc::now(),
    })
}
