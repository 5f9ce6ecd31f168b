///! Scheduled background tasks - Centralize the client's periodic work
///!
///! Currently one task: periodic draft autosave while an entry form is
///! active. Future tasks can be added here.
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::module::draft::DraftStore;
use crate::module::workflow::EntryForm;

/// Live snapshot of the entry form being edited. None while no entry view
/// is active, which pauses autosave.
pub type FormBuffer = Arc<RwLock<Option<EntryForm>>>;

pub fn new_form_buffer() -> FormBuffer {
    Arc::new(RwLock::new(None))
}

/// Configuration for scheduled tasks
#[derive(Debug, Clone)]
pub struct ScheduledTaskConfig {
    /// Interval between draft snapshots (in seconds)
    pub autosave_interval_secs: u64,
}

impl Default for ScheduledTaskConfig {
    fn default() -> Self {
        Self {
            autosave_interval_secs: 15,
        }
    }
}

/// Owns the spawned task handles so they can be aborted on shutdown.
pub struct ScheduledTaskManager {
    config: ScheduledTaskConfig,
    task_handles: Vec<JoinHandle<()>>,
}

impl ScheduledTaskManager {
    pub fn new(config: ScheduledTaskConfig) -> Self {
        Self {
            config,
            task_handles: Vec::new(),
        }
    }

    /// Start the draft autosave task.
    pub fn start_draft_autosave(&mut self, drafts: Arc<DraftStore>, buffer: FormBuffer) {
        let interval = Duration::from_secs(self.config.autosave_interval_secs.max(1));
        tracing::info!(
            "Scheduling draft autosave task (interval: {}s)",
            interval.as_secs()
        );

        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                autosave_tick(&drafts, &buffer).await;
            }
        });
        self.task_handles.push(handle);
    }

    /// Abort all scheduled tasks.
    pub fn shutdown(self) {
        tracing::info!("Shutting down scheduled tasks...");
        for handle in self.task_handles {
            handle.abort();
        }
    }
}

/// One autosave pass: snapshot the live form, if any, into the draft store.
async fn autosave_tick(drafts: &DraftStore, buffer: &FormBuffer) {
    let snapshot = buffer.read().await.clone();
    let Some(form) = snapshot else {
        return;
    };

    match drafts.save(&form).await {
        Ok(true) => tracing::debug!("Draft autosaved"),
        Ok(false) => {}
        Err(e) => tracing::warn!("Draft autosave failed: {}", e),
    }
}
