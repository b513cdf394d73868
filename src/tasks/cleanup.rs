//! TTL Cleanup Task
//!
//! Periodically reaps expired entries from an [`ExpirableCache`] shared behind
//! a tokio `RwLock`. The cache itself stays single-threaded; each sweep holds
//! the write lock only for the duration of one `cleanup_expired` call.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::cache::{ExpirableCache, IndexSet};

/// Spawns a task that sweeps `cache` for expired entries every `period`.
///
/// The first sweep runs one `period` after spawning. Sweeps that fall behind
/// are delayed rather than bunched together. Abort the returned handle to stop
/// the task.
///
/// ```ignore
/// let shared = Arc::new(RwLock::new(ExpirableCache::from_config(&config, indices)?));
/// let sweeper = spawn_cleanup_task(shared.clone(), config.cleanup_interval());
/// // on shutdown
/// sweeper.abort();
/// ```
pub fn spawn_cleanup_task<T, I>(
    cache: Arc<RwLock<ExpirableCache<T, I>>>,
    period: Duration,
) -> JoinHandle<()>
where
    T: Send + Sync + 'static,
    I: IndexSet<T> + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(?period, "expired-entry sweeper started");

        loop {
            ticker.tick().await;

            let (removed, remaining) = {
                let mut guard = cache.write().await;
                (guard.cleanup_expired(), guard.len())
            };

            if removed > 0 {
                info!(removed, remaining, "swept expired entries");
            } else {
                debug!(remaining, "sweep found nothing expired");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{HashedIndex, Index};

    type Pair = (u32, &'static str);
    type Shared = Arc<RwLock<ExpirableCache<Pair, (HashedIndex<Pair, u32>,)>>>;

    fn shared(ttl: Duration) -> Shared {
        let cache = ExpirableCache::new(100, ttl, (Index::hashed_unique(|p: &Pair| p.0),)).unwrap();
        Arc::new(RwLock::new(cache))
    }

    #[tokio::test]
    async fn test_sweeper_reaps_stale_entries() {
        let cache = shared(Duration::from_millis(50));
        cache.write().await.insert((1, "stale"));

        let sweeper = spawn_cleanup_task(cache.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(150)).await;

        {
            let guard = cache.read().await;
            assert!(guard.is_empty(), "stale entry should have been swept");
            assert_eq!(guard.index_lens(), vec![0]);
            assert_eq!(guard.stats().expirations, 1);
        }

        sweeper.abort();
    }

    #[tokio::test]
    async fn test_sweeper_leaves_live_entries() {
        let cache = shared(Duration::from_secs(3600));
        cache.write().await.insert((7, "fresh"));

        let sweeper = spawn_cleanup_task(cache.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(cache.write().await.find::<0>(&7), Some(&(7, "fresh")));
        assert_eq!(cache.read().await.stats().expirations, 0);

        sweeper.abort();
    }

    #[tokio::test]
    async fn test_sweeper_stops_when_aborted() {
        let sweeper = spawn_cleanup_task(shared(Duration::from_secs(1)), Duration::from_secs(1));

        sweeper.abort();
        let outcome = sweeper.await;

        assert!(outcome.is_err_and(|err| err.is_cancelled()));
    }
}
