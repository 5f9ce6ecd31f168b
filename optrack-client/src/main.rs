use optrack_client::api::{EntryApi, EntryServiceClient};
use optrack_client::config;
use optrack_client::logging;
use optrack_client::module::draft::DraftStore;
use optrack_client::module::handler::{CommandHandler, ConsoleConfirmation};
use optrack_client::module::scheduled::{ScheduledTaskConfig, ScheduledTaskManager, new_form_buffer};
use optrack_client::module::stats::StatsManager;
use optrack_client::module::suggest::SuggestionProvider;
use optrack_client::module::workflow::{ConfirmationPort, SubmissionWorkflow};
use optrack_client::session::SessionStore;

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    config::read_config()?;
    let config = config::CONFIG.get().unwrap();

    // Initialize logging
    let _logging_guard = logging::init_logging("logs", "optrack-client", &config.log_level);

    tracing::info!("optrack client starting...");
    tracing::info!("Entry service: {}", config.api_base_url);

    // Service client (shared by everything below)
    let client = EntryServiceClient::new(
        &config.api_base_url,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    if client.health().await {
        tracing::info!("✓ Entry service reachable");
    } else {
        tracing::warn!(
            "Entry service at {} is not responding; commands will fail until it is up",
            config.api_base_url
        );
    }
    let api: Arc<dyn EntryApi> = Arc::new(client);

    // Hydrate client-side state
    let data_dir = Path::new(&config.data_dir);
    let session = Arc::new(SessionStore::new(data_dir));
    session.hydrate().await?;
    let drafts = Arc::new(DraftStore::new(data_dir));

    let stats = Arc::new(StatsManager::new(api.clone(), config.stats_cache_secs));
    let suggestions = Arc::new(SuggestionProvider::new(
        api.clone(),
        Duration::from_millis(config.suggest_debounce_ms),
        config.suggest_min_chars,
    ));

    let confirmations: Arc<dyn ConfirmationPort> = Arc::new(ConsoleConfirmation);
    let workflow = Arc::new(SubmissionWorkflow::new(
        api.clone(),
        confirmations.clone(),
        drafts.clone(),
        stats.clone(),
        session.clone(),
    ));

    // Offer to restore a fresh draft before any autosave can overwrite it
    let form_buffer = new_form_buffer();
    match drafts.load_if_fresh().await {
        Ok(Some(draft)) => {
            if confirmations
                .confirm("You have an unsaved draft. Would you like to restore it?")
                .await
            {
                tracing::info!("Draft restored into the entry form");
                *form_buffer.write().await = Some(draft.fields);
            } else {
                drafts.clear().await.ok();
            }
        }
        Ok(None) => {}
        Err(e) => tracing::warn!("Failed to read draft: {}", e),
    }

    // Start background tasks
    let mut tasks = ScheduledTaskManager::new(ScheduledTaskConfig {
        autosave_interval_secs: config.autosave_interval_secs,
    });
    tasks.start_draft_autosave(drafts.clone(), form_buffer.clone());

    // Run the console front end until quit
    let handler = CommandHandler::new(
        api,
        workflow,
        stats,
        suggestions,
        session,
        drafts,
        form_buffer,
        data_dir.join("exports"),
    );
    handler.run().await;

    tasks.shutdown();
    tracing::info!("optrack client stopped.");

    Ok(())
}
