///! HTTP client for the entry service REST API.
use async_trait::async_trait;
use optrack_common::{
    DuplicateCheck, DuplicateQuery, Entry, EntryFilters, EntryPayload, EntryStatus, StatsBundle,
    StatsFilters,
};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::{ApiError, Envelope, EntryApi};

/// Thin typed wrapper over the service's REST endpoints. One instance is
/// shared across the whole client; reqwest multiplexes connections
/// internally.
pub struct EntryServiceClient {
    http: reqwest::Client,
    base_url: String,
}

impl EntryServiceClient {
    /// Build a client for the given base URL (including the `/api` path).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Best-effort startup probe against `/health`.
    pub async fn health(&self) -> bool {
        match self.http.get(self.endpoint("/health")).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("Health probe failed: {}", e);
                false
            }
        }
    }

    async fn get_enveloped<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let response = self
            .http
            .get(self.endpoint(path))
            .query(query)
            .send()
            .await?;
        unwrap_envelope(response).await
    }
}

/// Check status, then unwrap the `{success, data|error}` envelope.
async fn unwrap_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(ApiError::Service(service_error_message(status, &body)));
    }

    let envelope: Envelope<T> = serde_json::from_str(&body)?;
    if !envelope.success {
        let message = envelope
            .error
            .or(envelope.message)
            .unwrap_or_else(|| "Service reported failure".to_string());
        return Err(ApiError::Service(message));
    }

    envelope.data.ok_or(ApiError::MissingData)
}

/// Extract a user-facing message from an error body. The service wraps
/// business-rule rejections as `{"detail": {"error": ..., "keywords": [..]}}`
/// and plain failures as `{"detail": "..."}` or `{"error": "..."}`.
fn service_error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(msg) = value.get("error").and_then(|v| v.as_str()) {
            return msg.to_string();
        }
        match value.get("detail") {
            Some(serde_json::Value::String(s)) => return s.clone(),
            Some(detail) => {
                if let Some(msg) = detail.get("error").and_then(|v| v.as_str()) {
                    let keywords: Vec<&str> = detail
                        .get("keywords")
                        .and_then(|v| v.as_array())
                        .map(|terms| terms.iter().filter_map(|t| t.as_str()).collect())
                        .unwrap_or_default();
                    if keywords.is_empty() {
                        return msg.to_string();
                    }
                    return format!("{} ({})", msg, keywords.join(", "));
                }
            }
            None => {}
        }
    }
    format!("Service returned HTTP {status}")
}

#[async_trait]
impl EntryApi for EntryServiceClient {
    async fn list_entries(&self, filters: &EntryFilters) -> Result<Vec<Entry>, ApiError> {
        let entries: Vec<Entry> = self
            .get_enveloped("/entries", &filters.query_pairs())
            .await?;
        tracing::debug!("Fetched {} entries", entries.len());
        Ok(entries)
    }

    async fn get_entry(&self, id: &str) -> Result<Entry, ApiError> {
        self.get_enveloped(&format!("/entries/{id}"), &[]).await
    }

    async fn create_entry(&self, payload: &EntryPayload) -> Result<Entry, ApiError> {
        let response = self
            .http
            .post(self.endpoint("/entries"))
            .json(payload)
            .send()
            .await?;
        let entry: Entry = unwrap_envelope(response).await?;
        tracing::info!("Created entry {} for {}", entry.id, entry.company);
        Ok(entry)
    }

    async fn update_entry(&self, id: &str, payload: &EntryPayload) -> Result<Entry, ApiError> {
        let response = self
            .http
            .put(self.endpoint(&format!("/entries/{id}")))
            .json(payload)
            .send()
            .await?;
        let entry: Entry = unwrap_envelope(response).await?;
        tracing::info!("Updated entry {}", entry.id);
        Ok(entry)
    }

    async fn patch_status(
        &self,
        id: &str,
        status: EntryStatus,
        notes: Option<&str>,
    ) -> Result<Entry, ApiError> {
        let mut query = vec![("status", status.as_str().to_string())];
        if let Some(notes) = notes {
            query.push(("status_notes", notes.to_string()));
        }

        let response = self
            .http
            .patch(self.endpoint(&format!("/entries/{id}/status")))
            .query(&query)
            .send()
            .await?;
        unwrap_envelope(response).await
    }

    async fn check_duplicate(&self, query: &DuplicateQuery) -> Result<DuplicateCheck, ApiError> {
        self.get_enveloped("/check-duplicate", &query.query_pairs())
            .await
    }

    async fn suggest_companies(&self, q: &str) -> Result<Vec<String>, ApiError> {
        self.get_enveloped("/suggestions/companies", &[("q", q.to_string())])
            .await
    }

    async fn suggest_contacts(&self, q: &str) -> Result<Vec<String>, ApiError> {
        self.get_enveloped("/suggestions/contacts", &[("q", q.to_string())])
            .await
    }

    async fn get_stats(&self, filters: &StatsFilters) -> Result<StatsBundle, ApiError> {
        self.get_enveloped("/stats", &filters.query_pairs()).await
    }
}
