///! File-backed recovery snapshots of the entry form.
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::module::workflow::EntryForm;

const DRAFT_FILE: &str = "draft.json";

/// Drafts older than this are discarded unread.
pub const DRAFT_MAX_AGE_HOURS: i64 = 24;

/// An unsaved entry-form snapshot kept for crash/reload recovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    pub fields: EntryForm,
    pub saved_at: DateTime<Utc>,
}

impl Draft {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.saved_at) <= Duration::hours(DRAFT_MAX_AGE_HOURS)
    }
}

/// Persists drafts as JSON under the data directory.
pub struct DraftStore {
    data_dir: PathBuf,
}

impl DraftStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    fn draft_path(&self) -> PathBuf {
        self.data_dir.join(DRAFT_FILE)
    }

    /// Snapshot the form. Skipped (returns false) when every meaningful
    /// field is blank, so an empty form never overwrites a real draft.
    pub async fn save(&self, fields: &EntryForm) -> Result<bool> {
        if !fields.has_meaningful_content() {
            return Ok(false);
        }

        fs::create_dir_all(&self.data_dir)
            .await
            .context("Failed to create data directory")?;

        let draft = Draft {
            fields: fields.clone(),
            saved_at: Utc::now(),
        };
        let content = serde_json::to_string_pretty(&draft).context("Failed to serialize draft")?;

        fs::write(self.draft_path(), content)
            .await
            .context("Failed to write draft file")?;

        debug!("Draft saved for company '{}'", fields.company.trim());
        Ok(true)
    }

    /// Load the stored draft if it is younger than 24 hours. Stale or
    /// corrupt drafts are deleted and reported as absent.
    pub async fn load_if_fresh(&self) -> Result<Option<Draft>> {
        let path = self.draft_path();
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .await
            .context("Failed to read draft file")?;

        let draft: Draft = match serde_json::from_str(&content) {
            Ok(draft) => draft,
            Err(e) => {
                warn!("Discarding corrupt draft file: {}", e);
                fs::remove_file(&path).await.ok();
                return Ok(None);
            }
        };

        if !draft.is_fresh(Utc::now()) {
            info!("Discarding stale draft from {}", draft.saved_at);
            fs::remove_file(&path).await.ok();
            return Ok(None);
        }

        Ok(Some(draft))
    }

    pub async fn clear(&self) -> Result<()> {
        let path = self.draft_path();
        if path.exists() {
            fs::remove_file(&path)
                .await
                .context("Failed to remove draft file")?;
            debug!("Draft cleared");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn form_with_company(company: &str) -> EntryForm {
        EntryForm {
            company: company.to_string(),
            email: "a@b.test".to_string(),
            ..EntryForm::default()
        }
    }

    #[test]
    fn freshness_boundary_is_24_hours() {
        let saved_at = Utc::now();
        let draft = Draft {
            fields: EntryForm::default(),
            saved_at,
        };

        let just_inside = saved_at + Duration::hours(23) + Duration::minutes(59);
        let just_outside = saved_at + Duration::hours(24) + Duration::minutes(1);
        assert!(draft.is_fresh(just_inside));
        assert!(!draft.is_fresh(just_outside));
    }

    #[tokio::test]
    async fn save_and_reload_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = DraftStore::new(temp_dir.path());

        assert!(store.save(&form_with_company("Acme Robotics")).await.unwrap());

        let draft = store.load_if_fresh().await.unwrap().unwrap();
        assert_eq!(draft.fields.company, "Acme Robotics");

        store.clear().await.unwrap();
        assert!(store.load_if_fresh().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn blank_form_is_not_persisted() {
        let temp_dir = TempDir::new().unwrap();
        let store = DraftStore::new(temp_dir.path());

        let blank = EntryForm {
            status_notes: "notes alone do not count".to_string(),
            ..EntryForm::default()
        };
        assert!(!store.save(&blank).await.unwrap());
        assert!(store.load_if_fresh().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stale_draft_is_discarded_unread() {
        let temp_dir = TempDir::new().unwrap();
        let store = DraftStore::new(temp_dir.path());

        let stale = Draft {
            fields: form_with_company("Acme"),
            saved_at: Utc::now() - Duration::hours(25),
        };
        tokio::fs::write(
            store.draft_path(),
            serde_json::to_string(&stale).unwrap(),
        )
        .await
        .unwrap();

        assert!(store.load_if_fresh().await.unwrap().is_none());
        assert!(!store.draft_path().exists());
    }

    #[tokio::test]
    async fn corrupt_draft_is_deleted() {
        let temp_dir = TempDir::new().unwrap();
        let store = DraftStore::new(temp_dir.path());
        tokio::fs::write(store.draft_path(), "{oops").await.unwrap();

        assert!(store.load_if_fresh().await.unwrap().is_none());
        assert!(!store.draft_path().exists());
    }
}
