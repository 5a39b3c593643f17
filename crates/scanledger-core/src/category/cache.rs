//! Read-through cache of the category list.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::error::Result;
use crate::models::Category;
use crate::repository::CategoryRepository;

/// Lower bound on the cache lifetime.
pub const MIN_CACHE_TTL: Duration = Duration::from_secs(30);

/// Source of the current category list.
#[async_trait]
pub trait CategoryCatalog: Send + Sync {
    async fn get(&self) -> Result<Arc<Vec<Category>>>;

    /// Drop the cached list. The next `get` reloads.
    fn invalidate(&self);
}

#[derive(Clone)]
struct Loaded {
    categories: Arc<Vec<Category>>,
    at: Instant,
}

/// Category list cached for a fixed lifetime.
///
/// Only one refresh runs at a time. While it runs, callers that already
/// hold an expired list get that list back immediately; a caller with
/// nothing cached waits for the refresh.
pub struct CategoryCatalogCache {
    repository: Arc<dyn CategoryRepository>,
    ttl: Duration,
    state: RwLock<Option<Loaded>>,
    refresh: Mutex<()>,
}

impl CategoryCatalogCache {
    pub fn new(repository: Arc<dyn CategoryRepository>, ttl: Duration) -> Self {
        Self {
            repository,
            ttl: ttl.max(MIN_CACHE_TTL),
            state: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn current(&self) -> Option<Loaded> {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn is_fresh(&self, loaded: &Loaded) -> bool {
        loaded.at.elapsed() < self.ttl
    }

    async fn reload(&self) -> Result<Arc<Vec<Category>>> {
        let categories = Arc::new(self.repository.list().await?);
        debug!("Loaded {} categories", categories.len());
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Some(Loaded {
            categories: Arc::clone(&categories),
            at: Instant::now(),
        });
        Ok(categories)
    }
}

#[async_trait]
impl CategoryCatalog for CategoryCatalogCache {
    async fn get(&self) -> Result<Arc<Vec<Category>>> {
        let cached = self.current();
        if let Some(loaded) = &cached {
            if self.is_fresh(loaded) {
                return Ok(Arc::clone(&loaded.categories));
            }
        }

        let _guard = match self.refresh.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                if let Some(stale) = cached {
                    trace!("Refresh in flight, serving stale categories");
                    return Ok(stale.categories);
                }
                self.refresh.lock().await
            }
        };

        // Another caller may have refreshed while we waited.
        if let Some(loaded) = self.current() {
            if self.is_fresh(&loaded) {
                return Ok(loaded.categories);
            }
        }

        self.reload().await
    }

    fn invalidate(&self) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepositories;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    /// Counts list calls and can hold them until released.
    struct CountingRepository {
        inner: MemoryRepositories,
        lists: AtomicUsize,
        gate: Mutex<()>,
    }

    impl CountingRepository {
        fn new() -> Self {
            Self {
                inner: MemoryRepositories::new(),
                lists: AtomicUsize::new(0),
                gate: Mutex::new(()),
            }
        }
    }

    #[async_trait]
    impl CategoryRepository for CountingRepository {
        async fn list(&self) -> Result<Vec<Category>> {
            self.lists.fetch_add(1, Ordering::SeqCst);
            let _open = self.gate.lock().await;
            CategoryRepository::list(&self.inner).await
        }

        async fn get(&self, id: Uuid) -> Result<Option<Category>> {
            CategoryRepository::get(&self.inner, id).await
        }

        async fn insert(&self, category: Category) -> Result<()> {
            CategoryRepository::insert(&self.inner, category).await
        }
    }

    #[test]
    fn test_ttl_floor() {
        let repo = Arc::new(CountingRepository::new());
        assert_eq!(CategoryCatalogCache::new(repo.clone(), Duration::from_secs(1)).ttl(), MIN_CACHE_TTL);
        assert_eq!(
            CategoryCatalogCache::new(repo, Duration::from_secs(300)).ttl(),
            Duration::from_secs(300)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reads_through_and_expires() {
        let repo = Arc::new(CountingRepository::new());
        repo.insert(Category::new("Food")).await.unwrap();
        let cache = CategoryCatalogCache::new(repo.clone(), Duration::from_secs(60));

        assert_eq!(cache.get().await.unwrap().len(), 1);
        repo.insert(Category::new("Travel")).await.unwrap();
        assert_eq!(cache.get().await.unwrap().len(), 1);
        assert_eq!(repo.lists.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.get().await.unwrap().len(), 2);
        assert_eq!(repo.lists.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let repo = Arc::new(CountingRepository::new());
        let cache = CategoryCatalogCache::new(repo.clone(), Duration::from_secs(300));

        assert!(cache.get().await.unwrap().is_empty());
        repo.insert(Category::new("Health")).await.unwrap();
        cache.invalidate();
        assert_eq!(cache.get().await.unwrap()[0].name, "Health");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_value_served_during_refresh() {
        let repo = Arc::new(CountingRepository::new());
        repo.insert(Category::new("Food")).await.unwrap();
        let cache = Arc::new(CategoryCatalogCache::new(repo.clone(), Duration::from_secs(30)));
        cache.get().await.unwrap();

        tokio::time::advance(Duration::from_secs(31)).await;
        repo.insert(Category::new("Travel")).await.unwrap();

        // Hold the repository so the refresh stays in flight.
        let gate = repo.gate.lock().await;
        let refreshing = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.get().await.map(|c| c.len()) }
        });
        while repo.lists.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }

        assert_eq!(cache.get().await.unwrap().len(), 1);

        drop(gate);
        assert_eq!(refreshing.await.unwrap().unwrap(), 2);
        assert_eq!(cache.get().await.unwrap().len(), 2);
        assert_eq!(repo.lists.load(Ordering::SeqCst), 2);
    }
}
