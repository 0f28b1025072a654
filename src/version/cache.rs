//! Per-run fetch cache
//!
//! Remote catalogs are fetched at most once per key for the lifetime of the
//! cache. Concurrent callers asking for the same key wait for the single
//! in-flight fetch instead of starting their own. Failures are stored like
//! values: an unreachable catalog costs one request per run.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;

pub struct FetchCache<V, E> {
    cells: Mutex<HashMap<String, Arc<OnceCell<Result<V, E>>>>>,
}

impl<V: Clone, E: Clone> FetchCache<V, E> {
    pub fn new() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached outcome for `key`, running `fetch` if there is none yet
    pub async fn get_or_try_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let cell = {
            let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
            cells.entry(key.to_string()).or_default().clone()
        };

        cell.get_or_init(fetch).await.clone()
    }

    /// Number of keys holding a fetched value
    pub fn len(&self) -> usize {
        self.cells
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|cell| matches!(cell.get(), Some(Ok(_))))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone, E: Clone> Default for FetchCache<V, E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn get_or_try_fetch_runs_fetch_once_per_key() {
        let cache: FetchCache<u32, ()> = FetchCache::new();
        let calls = AtomicUsize::new(0);
        let calls = &calls;

        for _ in 0..3 {
            let value = cache
                .get_or_try_fetch("a", || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>(7)
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_fetch() {
        let cache: FetchCache<u32, ()> = FetchCache::new();
        let calls = AtomicUsize::new(0);
        let calls = &calls;

        let fetch = || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok::<_, ()>(1)
        };
        let (a, b, c) = tokio::join!(
            cache.get_or_try_fetch("k", fetch),
            cache.get_or_try_fetch("k", fetch),
            cache.get_or_try_fetch("k", fetch),
        );

        assert_eq!((a, b, c), (Ok(1), Ok(1), Ok(1)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_fetch_is_cached_for_later_callers() {
        let cache: FetchCache<u32, &str> = FetchCache::new();

        let first = cache
            .get_or_try_fetch("k", || async { Err::<u32, _>("boom") })
            .await;
        let second = cache
            .get_or_try_fetch("k", || async { Ok::<_, &str>(2) })
            .await;

        assert_eq!(first, Err("boom"));
        assert_eq!(second, Err("boom"));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_failed_fetch() {
        let cache: FetchCache<u32, &str> = FetchCache::new();
        let calls = AtomicUsize::new(0);
        let calls = &calls;

        let fetch = || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Err::<u32, _>("unavailable")
        };
        let (a, b, c) = tokio::join!(
            cache.get_or_try_fetch("k", fetch),
            cache.get_or_try_fetch("k", fetch),
            cache.get_or_try_fetch("k", fetch),
        );

        assert_eq!((a, b, c), (Err("unavailable"), Err("unavailable"), Err("unavailable")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let cache: FetchCache<&'static str, ()> = FetchCache::new();

        let a = cache.get_or_try_fetch("a", || async { Ok::<_, ()>("A") }).await;
        let b = cache.get_or_try_fetch("b", || async { Ok::<_, ()>("B") }).await;

        assert_eq!((a, b), (Ok("A"), Ok("B")));
        assert_eq!(cache.len(), 2);
    }
}
