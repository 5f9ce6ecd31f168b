///! Typed access to the remote entry service.
use async_trait::async_trait;
use optrack_common::{
    DuplicateCheck, DuplicateQuery, Entry, EntryFilters, EntryPayload, EntryStatus, StatsBundle,
    StatsFilters,
};
use serde::Deserialize;
use thiserror::Error;

pub mod client;

pub use client::EntryServiceClient;

/// Errors surfaced by the service client. Callers decide recovery; nothing
/// here panics or escapes uncaught.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("service returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("response envelope carried no data")]
    MissingData,

    /// The service answered with `success: false` or an error body; the
    /// message is passed through verbatim
    #[error("{0}")]
    Service(String),
}

impl ApiError {
    /// Whether the service itself rejected the request (as opposed to the
    /// request never completing)
    pub fn is_service_rejection(&self) -> bool {
        matches!(self, ApiError::Service(_))
    }
}

/// Uniform `{success, data|error}` response envelope used by every endpoint.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    pub success: bool,

    #[serde(default)]
    pub data: Option<T>,

    #[serde(default)]
    pub error: Option<String>,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub count: Option<u64>,
}

/// Port over the remote entry service. The submission workflow and the
/// managers depend on this trait, never on the HTTP client directly.
#[async_trait]
pub trait EntryApi: Send + Sync {
    async fn list_entries(&self, filters: &EntryFilters) -> Result<Vec<Entry>, ApiError>;

    async fn get_entry(&self, id: &str) -> Result<Entry, ApiError>;

    async fn create_entry(&self, payload: &EntryPayload) -> Result<Entry, ApiError>;

    async fn update_entry(&self, id: &str, payload: &EntryPayload) -> Result<Entry, ApiError>;

    async fn patch_status(
        &self,
        id: &str,
        status: EntryStatus,
        notes: Option<&str>,
    ) -> Result<Entry, ApiError>;

    async fn check_duplicate(&self, query: &DuplicateQuery) -> Result<DuplicateCheck, ApiError>;

    async fn suggest_companies(&self, q: &str) -> Result<Vec<String>, ApiError>;

    async fn suggest_contacts(&self, q: &str) -> Result<Vec<String>, ApiError>;

    async fn get_stats(&self, filters: &StatsFilters) -> Result<StatsBundle, ApiError>;
}
