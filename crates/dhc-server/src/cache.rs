//! In-memory session store.
//!
//! Entries expire by wall-clock deadline. Expiry is enforced lazily on
//! lookup, with a periodic sweeper reclaiming entries nobody asks for
//! again. The store is capacity-bounded; when full, the entry closest to
//! expiring is evicted to make room.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use dhc_core::SharedSecret;

pub const DEFAULT_CAPACITY: usize = 4096;

struct SessionEntry {
    secret: SharedSecret,
    expires_at: Instant,
}

/// Serial-keyed store of negotiated session secrets.
pub struct SessionCache {
    entries: Mutex<HashMap<String, SessionEntry>>,
    capacity: usize,
}

impl SessionCache {
    pub fn new(capacity: usize) -> Self {
        SessionCache {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Store a session under `serial`. Evicts the earliest-expiring entry
    /// if the cache is at capacity.
    pub fn insert(&self, serial: String, secret: SharedSecret, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity && !entries.contains_key(&serial) {
            if let Some(victim) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(serial, _)| serial.clone())
            {
                entries.remove(&victim);
                debug!(serial = %victim, "evicted session to make room");
            }
        }
        entries.insert(
            serial,
            SessionEntry {
                secret,
                expires_at: now + ttl,
            },
        );
    }

    /// Fetch the secret for `serial`. An entry past its deadline behaves as
    /// absent and is removed on the spot.
    pub fn lookup(&self, serial: &str) -> Option<SharedSecret> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get(serial) {
            Some(entry) if entry.expires_at > now => Some(entry.secret.clone()),
            Some(_) => {
                entries.remove(serial);
                debug!(%serial, "dropped expired session on lookup");
                None
            }
            None => None,
        }
    }

    pub fn remove(&self, serial: &str) -> bool {
        self.entries.lock().remove(serial).is_some()
    }

    /// Drop every session. Outstanding serials all become unknown.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Run [`SessionCache::sweep`] on a fixed interval until the handle is
/// aborted or the cache is dropped by every other holder.
pub fn spawn_sweeper(cache: Arc<SessionCache>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = cache.sweep();
            if removed > 0 {
                debug!(removed, remaining = cache.len(), "swept expired sessions");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(byte: u8) -> SharedSecret {
        SharedSecret::from_bytes(vec![byte; 32])
    }

    #[test]
    fn lookup_returns_live_entries() {
        let cache = SessionCache::new(8);
        cache.insert("abc".to_string(), secret(1), Duration::from_secs(60));
        let found = cache.lookup("abc").expect("entry");
        assert_eq!(found.as_bytes(), secret(1).as_bytes());
        assert!(cache.lookup("missing").is_none());
    }

    #[test]
    fn expired_entry_is_absent_and_removed() {
        let cache = SessionCache::new(8);
        cache.insert("abc".to_string(), secret(1), Duration::from_nanos(1));
        std::thread::sleep(Duration::from_millis(2));
        assert!(cache.lookup("abc").is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn sweep_reclaims_only_expired_entries() {
        let cache = SessionCache::new(8);
        cache.insert("old".to_string(), secret(1), Duration::from_nanos(1));
        cache.insert("live".to_string(), secret(2), Duration::from_secs(60));
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.lookup("live").is_some());
    }

    #[test]
    fn capacity_evicts_earliest_expiring() {
        let cache = SessionCache::new(2);
        cache.insert("short".to_string(), secret(1), Duration::from_secs(10));
        cache.insert("long".to_string(), secret(2), Duration::from_secs(600));
        cache.insert("new".to_string(), secret(3), Duration::from_secs(60));
        assert_eq!(cache.len(), 2);
        assert!(cache.lookup("short").is_none());
        assert!(cache.lookup("long").is_some());
        assert!(cache.lookup("new").is_some());
    }

    #[test]
    fn reinserting_existing_serial_does_not_evict() {
        let cache = SessionCache::new(2);
        cache.insert("a".to_string(), secret(1), Duration::from_secs(60));
        cache.insert("b".to_string(), secret(2), Duration::from_secs(60));
        cache.insert("a".to_string(), secret(3), Duration::from_secs(60));
        assert_eq!(cache.len(), 2);
        assert!(cache.lookup("b").is_some());
    }

    #[tokio::test]
    async fn sweeper_task_reclaims_in_background() {
        let cache = Arc::new(SessionCache::new(8));
        cache.insert("abc".to_string(), secret(1), Duration::from_millis(5));
        let handle = spawn_sweeper(cache.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.len(), 0);
        handle.abort();
    }
}
