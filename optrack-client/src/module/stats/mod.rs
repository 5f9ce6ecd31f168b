///! Time-boxed caching over the statistics endpoint, plus the small
///! entry-tab summary derived from it.
use chrono::{DateTime, Duration, Utc};
use optrack_common::{EntryFilters, StatsBundle, StatsFilters};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::api::{ApiError, EntryApi};
use crate::session::UserProfile;

struct CachedBundle {
    key: String,
    bundle: StatsBundle,
    fetched_at: DateTime<Utc>,
}

/// Serves statistics from a short-lived cache and exposes the explicit
/// invalidation hook every mutation must call.
pub struct StatsManager {
    api: Arc<dyn EntryApi>,
    ttl: Duration,
    cache: RwLock<Option<CachedBundle>>,
}

/// Entry-tab summary for the logged-in user.
#[derive(Debug, Clone, PartialEq)]
pub struct MiniStats {
    pub total: usize,
    pub this_week: usize,
    /// (position, member count) within the user's club, when known
    pub rank: Option<(usize, usize)>,
}

fn cache_key(filters: &StatsFilters) -> String {
    filters
        .query_pairs()
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

impl StatsManager {
    pub fn new(api: Arc<dyn EntryApi>, ttl_secs: u64) -> Self {
        Self {
            api,
            ttl: Duration::seconds(ttl_secs as i64),
            cache: RwLock::new(None),
        }
    }

    /// Fetch the bundle for `filters`, reusing a cached copy when the same
    /// filter set was fetched within the TTL.
    pub async fn get(&self, filters: &StatsFilters) -> Result<StatsBundle, ApiError> {
        let key = cache_key(filters);

        {
            let cache = self.cache.read().await;
            if let Some(cached) = &*cache {
                if cached.key == key
                    && Utc::now().signed_duration_since(cached.fetched_at) <= self.ttl
                {
                    debug!("Statistics served from cache");
                    return Ok(cached.bundle.clone());
                }
            }
        }

        let bundle = self.api.get_stats(filters).await?;
        *self.cache.write().await = Some(CachedBundle {
            key,
            bundle: bundle.clone(),
            fetched_at: Utc::now(),
        });
        Ok(bundle)
    }

    /// Drop the cached bundle. Called after every create, update, or status
    /// patch so a later fetch never reflects pre-mutation data.
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        if cache.take().is_some() {
            debug!("Statistics cache invalidated");
        }
    }

    /// Best-effort entry-tab summary. Any failure degrades to None.
    pub async fn mini_stats(&self, user: &UserProfile) -> Option<MiniStats> {
        let entries = self
            .api
            .list_entries(&EntryFilters::for_member(&user.name))
            .await
            .ok()?;

        let week_ago = Utc::now().date_naive() - Duration::days(7);
        let this_week = entries
            .iter()
            .filter(|entry| entry.entry_date >= week_ago)
            .count();

        let rank = match self.get(&StatsFilters::for_club(&user.club)).await {
            Ok(bundle) => {
                let members = &bundle.member_contributions;
                members
                    .iter()
                    .position(|m| m.member_name == user.name)
                    .map(|index| (index + 1, members.len()))
            }
            Err(e) => {
                debug!("Mini-stats ranking unavailable: {}", e);
                None
            }
        };

        Some(MiniStats {
            total: entries.len(),
            this_week,
            rank,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{MockApi, sample_entry};
    use optrack_common::MemberContribution;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn repeated_fetch_within_ttl_hits_cache() {
        let api = Arc::new(MockApi::default());
        let manager = StatsManager::new(api.clone(), 60);

        manager.get(&StatsFilters::default()).await.unwrap();
        manager.get(&StatsFilters::default()).await.unwrap();
        assert_eq!(api.stats_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_filters_bypass_the_cache() {
        let api = Arc::new(MockApi::default());
        let manager = StatsManager::new(api.clone(), 60);

        manager.get(&StatsFilters::default()).await.unwrap();
        manager.get(&StatsFilters::for_club("8x8")).await.unwrap();
        assert_eq!(api.stats_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidation_forces_a_refetch() {
        let api = Arc::new(MockApi::default());
        let manager = StatsManager::new(api.clone(), 60);

        manager.get(&StatsFilters::default()).await.unwrap();
        manager.invalidate().await;
        manager.get(&StatsFilters::default()).await.unwrap();
        assert_eq!(api.stats_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn zero_ttl_never_serves_from_cache() {
        let api = Arc::new(MockApi::default());
        let manager = StatsManager::new(api.clone(), 0);

        manager.get(&StatsFilters::default()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        manager.get(&StatsFilters::default()).await.unwrap();
        assert_eq!(api.stats_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn mini_stats_compute_rank_from_contributions() {
        let api = Arc::new(MockApi::default());
        api.entries
            .lock()
            .unwrap()
            .push(sample_entry("e1", "Acme Robotics"));
        api.stats_bundle.lock().unwrap().member_contributions = vec![
            MemberContribution {
                member_name: "Ravi".to_string(),
                count: 9,
                ..MemberContribution::default()
            },
            MemberContribution {
                member_name: "Asha".to_string(),
                count: 7,
                ..MemberContribution::default()
            },
        ];

        let manager = StatsManager::new(api.clone(), 60);
        let user = UserProfile {
            name: "Asha".to_string(),
            club: "8x8".to_string(),
        };

        let mini = manager.mini_stats(&user).await.unwrap();
        assert_eq!(mini.total, 1);
        assert_eq!(mini.rank, Some((2, 2)));
    }

    #[tokio::test]
    async fn mini_stats_swallow_list_failures() {
        // list_entries has no failure switch in the mock, but a failing
        // stats call must still leave totals usable
        let api = Arc::new(MockApi::default());
        let manager = StatsManager::new(api.clone(), 60);
        let user = UserProfile {
            name: "Nobody".to_string(),
            club: "8x8".to_string(),
        };

        let mini = manager.mini_stats(&user).await.unwrap();
        assert_eq!(mini.total, 0);
        assert_eq!(mini.rank, None);
    }
}
