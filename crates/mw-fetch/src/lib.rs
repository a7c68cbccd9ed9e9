//! mw-fetch
//!
//! Fetcher boundary: one bounded-time GET per source, normalised to canonical
//! resources, with a fixed-delay retry budget.
//!
//! This crate does **not** touch the snapshot store or send notifications;
//! callers (the orchestrator) decide what a result means.

mod http;
pub mod pacing;
pub mod shapes;

use mw_config::secrets::Secrets;
use mw_schemas::FetchResult;
use mw_sources::SourceDescriptor;
use thiserror::Error;

pub use http::{FetchPolicy, HttpFetcher};
pub use pacing::{Sleeper, TokioSleeper};

/// Why one fetch attempt failed. `Display` is the operator-facing message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out after {0}ms")]
    Timeout(u64),
    #[error("{0}")]
    Transport(String),
    #[error("HTTP {code}: {reason}{}", .snippet.as_deref().map(|s| format!(" - {s}")).unwrap_or_default())]
    Status {
        code: u16,
        reason: String,
        /// First 200 chars of the error body, when it could be read.
        snippet: Option<String>,
    },
    #[error("invalid JSON body: {0}")]
    Decode(String),
    #[error("invalid header '{0}'")]
    InvalidHeader(String),
}

/// Polls one source.
///
/// Implementations never fail the caller: every problem becomes a
/// [`FetchResult::Failure`] carrying a readable message.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, source: &SourceDescriptor, secrets: &Secrets) -> FetchResult;
}
