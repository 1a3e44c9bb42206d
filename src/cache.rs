//! TTL-based sales cache.
//!
//! The sales list is cached under an "all" key plus one key per client, each
//! stamped with the time it was stored. Reads return nothing once the TTL
//! has elapsed, and every mutating sale operation invalidates the affected
//! keys. Time is obtained through the [`Clock`] trait so expiry is testable
//! with a fake clock instead of sleeping.

use crate::entities::sale;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::trace;

/// Default time-to-live for cached sale lists.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Source of the current time. Production code uses [`SystemClock`]; tests
/// inject a manual clock to drive expiry deterministically.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct Stamped<T> {
    data: T,
    stored_at: Instant,
}

/// Cache for sale query results, keyed by "all" and by client.
pub struct SalesCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    all: RwLock<Option<Stamped<Vec<sale::Model>>>>,
    by_client: RwLock<HashMap<String, Stamped<Vec<sale::Model>>>>,
}

impl SalesCache {
    /// Creates a cache with the given TTL and clock.
    #[must_use]
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            all: RwLock::new(None),
            by_client: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a cache with the default 5-minute TTL and the system clock.
    #[must_use]
    pub fn with_default_ttl() -> Self {
        Self::new(DEFAULT_TTL, Arc::new(SystemClock))
    }

    fn is_fresh<T>(&self, stamped: &Stamped<T>) -> bool {
        self.clock.now().duration_since(stamped.stored_at) < self.ttl
    }

    /// Returns the cached full sales list, if present and within TTL.
    pub async fn get_all(&self) -> Option<Vec<sale::Model>> {
        let guard = self.all.read().await;
        match guard.as_ref() {
            Some(stamped) if self.is_fresh(stamped) => {
                trace!("Sales cache hit for `all`");
                Some(stamped.data.clone())
            }
            _ => None,
        }
    }

    /// Stores the full sales list.
    pub async fn store_all(&self, data: Vec<sale::Model>) {
        let mut guard = self.all.write().await;
        *guard = Some(Stamped {
            data,
            stored_at: self.clock.now(),
        });
    }

    /// Returns one client's cached sales, if present and within TTL.
    pub async fn get_client(&self, client: &str) -> Option<Vec<sale::Model>> {
        let guard = self.by_client.read().await;
        match guard.get(client) {
            Some(stamped) if self.is_fresh(stamped) => {
                trace!(client, "Sales cache hit");
                Some(stamped.data.clone())
            }
            _ => None,
        }
    }

    /// Stores one client's sales.
    pub async fn store_client(&self, client: &str, data: Vec<sale::Model>) {
        let mut guard = self.by_client.write().await;
        guard.insert(
            client.to_string(),
            Stamped {
                data,
                stored_at: self.clock.now(),
            },
        );
    }

    /// Drops the "all" key.
    pub async fn invalidate_all(&self) {
        let mut guard = self.all.write().await;
        *guard = None;
    }

    /// Drops one client's key.
    pub async fn invalidate_client(&self, client: &str) {
        let mut guard = self.by_client.write().await;
        guard.remove(client);
    }

    /// Drops everything.
    pub async fn clear(&self) {
        self.invalidate_all().await;
        let mut guard = self.by_client.write().await;
        guard.clear();
    }
}
