///! Persisted session context: the current user and the in-progress edit target.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub club: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionState {
    #[serde(default)]
    user: Option<UserProfile>,

    /// Id of the entry currently loaded into the form for editing
    #[serde(default)]
    editing_id: Option<String>,
}

/// Owns the client-side session state and keeps it synchronized with a JSON
/// file under the data directory.
pub struct SessionStore {
    path: PathBuf,
    state: RwLock<SessionState>,
}

impl SessionStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            path: data_dir.as_ref().join(SESSION_FILE),
            state: RwLock::new(SessionState::default()),
        }
    }

    /// Load persisted state, if any. A corrupt file is discarded.
    pub async fn hydrate(&self) -> Result<()> {
        if !self.path.exists() {
            debug!("Session file does not exist: {:?}", self.path);
            return Ok(());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .context("Failed to read session file")?;

        match serde_json::from_str::<SessionState>(&content) {
            Ok(loaded) => {
                if let Some(user) = &loaded.user {
                    info!("Restored session for {} ({})", user.name, user.club);
                }
                *self.state.write().await = loaded;
            }
            Err(e) => {
                warn!("Discarding corrupt session file: {}", e);
                fs::remove_file(&self.path).await.ok();
            }
        }
        Ok(())
    }

    async fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create data directory")?;
        }

        let state = self.state.read().await;
        let content =
            serde_json::to_string_pretty(&*state).context("Failed to serialize session")?;
        fs::write(&self.path, content)
            .await
            .context("Failed to write session file")?;
        Ok(())
    }

    pub async fn user(&self) -> Option<UserProfile> {
        self.state.read().await.user.clone()
    }

    pub async fn login(&self, name: &str, club: &str) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.user = Some(UserProfile {
                name: name.trim().to_string(),
                club: club.trim().to_string(),
            });
        }
        self.persist().await?;
        info!("Logged in as {} ({})", name.trim(), club.trim());
        Ok(())
    }

    /// Clears the user and any edit-in-progress marker.
    pub async fn logout(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.user = None;
            state.editing_id = None;
        }
        self.persist().await?;
        info!("Logged out");
        Ok(())
    }

    pub async fn editing_id(&self) -> Option<String> {
        self.state.read().await.editing_id.clone()
    }

    pub async fn set_editing(&self, id: &str) -> Result<()> {
        self.state.write().await.editing_id = Some(id.to_string());
        self.persist().await?;
        debug!("Editing entry {}", id);
        Ok(())
    }

    pub async fn clear_editing(&self) -> Result<()> {
        let had = {
            let mut state = self.state.write().await;
            state.editing_id.take()
        };
        if had.is_some() {
            self.persist().await?;
        }
        Ok(())
    }
}
