///! Autocomplete over the suggestion endpoints. Best-effort: failures
///! degrade to no suggestions, never to an error the user sees.
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::api::EntryApi;

/// Fixed-delay, trailing-call-wins scheduler. Scheduling a new call aborts
/// the previously scheduled one if it has not fired yet; an already running
/// call is not interrupted.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Run `fut` after the configured delay unless superseded first.
    pub async fn schedule<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut pending = self.pending.lock().await;
        if let Some(previous) = pending.take() {
            previous.abort();
        }

        let delay = self.delay;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fut.await;
        }));
    }

    /// Drop whatever is scheduled without running it.
    pub async fn cancel(&self) {
        if let Some(previous) = self.pending.lock().await.take() {
            previous.abort();
        }
    }
}

/// Debounced company/contact-person autocomplete.
pub struct SuggestionProvider {
    api: Arc<dyn EntryApi>,
    debouncer: Debouncer,
    min_chars: usize,
}

#[derive(Debug, Clone, Copy)]
pub enum SuggestionKind {
    Company,
    ContactPerson,
}

impl SuggestionProvider {
    pub fn new(api: Arc<dyn EntryApi>, debounce: Duration, min_chars: usize) -> Self {
        Self {
            api,
            debouncer: Debouncer::new(debounce),
            min_chars,
        }
    }

    /// Immediate lookup, no debounce. Returns None for short queries,
    /// failures, and empty result sets alike.
    pub async fn fetch(&self, kind: SuggestionKind, query: &str) -> Option<Vec<String>> {
        let query = query.trim();
        if query.chars().count() < self.min_chars {
            return None;
        }

        let result = match kind {
            SuggestionKind::Company => self.api.suggest_companies(query).await,
            SuggestionKind::ContactPerson => self.api.suggest_contacts(query).await,
        };

        match result {
            Ok(suggestions) if !suggestions.is_empty() => Some(suggestions),
            Ok(_) => None,
            Err(e) => {
                debug!("Suggestion lookup failed: {}", e);
                None
            }
        }
    }

    /// Debounced lookup for live typing: results (possibly stale by the
    /// time they land) are delivered through `tx`.
    pub async fn fetch_debounced(
        &self,
        kind: SuggestionKind,
        query: String,
        tx: tokio::sync::mpsc::Sender<Vec<String>>,
    ) {
        let query_trimmed = query.trim().to_string();
        if query_trimmed.chars().count() < self.min_chars {
            self.debouncer.cancel().await;
            return;
        }

        let api = self.api.clone();
        self.debouncer
            .schedule(async move {
                let result = match kind {
                    SuggestionKind::Company => api.suggest_companies(&query_trimmed).await,
                    SuggestionKind::ContactPerson => api.suggest_contacts(&query_trimmed).await,
                };
                if let Ok(suggestions) = result {
                    if !suggestions.is_empty() {
                        tx.send(suggestions).await.ok();
                    }
                }
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockApi;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn trailing_call_wins() {
        let debouncer = Debouncer::new(Duration::from_millis(40));
        let fired = Arc::new(AtomicUsize::new(0));
        let last_value = Arc::new(AtomicUsize::new(0));

        for value in 1..=3 {
            let fired = fired.clone();
            let last_value = last_value.clone();
            debouncer
                .schedule(async move {
                    fired.fetch_add(1, Ordering::SeqCst);
                    last_value.store(value, Ordering::SeqCst);
                })
                .await;
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(last_value.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancel_drops_the_pending_call() {
        let debouncer = Debouncer::new(Duration::from_millis(30));
        let fired = Arc::new(AtomicUsize::new(0));

        let fired_clone = fired.clone();
        debouncer
            .schedule(async move {
                fired_clone.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        debouncer.cancel().await;

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn short_queries_are_not_sent() {
        let api = Arc::new(MockApi::default());
        api.suggestions.lock().unwrap().push("Acme Robotics".to_string());
        let provider = SuggestionProvider::new(api.clone(), Duration::from_millis(10), 2);

        assert!(provider.fetch(SuggestionKind::Company, "a").await.is_none());
        assert!(provider.fetch(SuggestionKind::Company, " ").await.is_none());

        let hits = provider.fetch(SuggestionKind::Company, "ac").await.unwrap();
        assert_eq!(hits, vec!["Acme Robotics".to_string()]);
    }

    #[tokio::test]
    async fn lookup_failures_degrade_silently() {
        let api = Arc::new(MockApi::default());
        api.suggest_fails.store(true, Ordering::SeqCst);
        let provider = SuggestionProvider::new(api, Duration::from_millis(10), 2);

        assert!(provider.fetch(SuggestionKind::Company, "acme").await.is_none());
    }

    #[tokio::test]
    async fn debounced_lookup_delivers_through_the_channel() {
        let api = Arc::new(MockApi::default());
        api.suggestions.lock().unwrap().push("Acme Robotics".to_string());
        let provider = SuggestionProvider::new(api, Duration::from_millis(10), 2);

        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        provider
            .fetch_debounced(SuggestionKind::Company, "acm".to_string(), tx)
            .await;

        let delivered = tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(delivered, vec!["Acme Robotics".to_string()]);
    }
}
