use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::debug;
use serde::Serialize;

use crate::model::AnalysisResult;

/// Time source for TTL checks, injectable so expiry can be tested without
/// sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time, used everywhere outside of tests.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct CacheEntry {
    value: AnalysisResult,
    expires_at: Instant,
}

/// Time-bounded memoization of analysis results, keyed by normalized input.
///
/// An entry is never served at or past its expiry; expired entries are
/// treated as absent and removed at read time, so no background sweeper is
/// needed. Concurrent misses for the same key may both compute and both
/// write; last writer wins.
pub struct ResultCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub live_entries: usize,
    pub expired_entries: usize,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        ResultCache {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Look up a live entry, evicting it if it has expired.
    pub fn get(&self, key: &str) -> Option<AnalysisResult> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().expect("cache lock poisoned");

        match entries.get(key) {
            Some(entry) if now < entry.expires_at => {
                debug!("cache hit for key: {}", key);
                Some(entry.value.clone())
            }
            Some(_) => {
                debug!("cache expired for key: {}", key);
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: &str, value: AnalysisResult, ttl: Duration) {
        let expires_at = self.clock.now() + ttl;
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(
            key.to_string(),
            CacheEntry { value, expires_at },
        );
        debug!("cached result for key: {}", key);
    }

    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let entries = self.entries.lock().expect("cache lock poisoned");
        let live = entries.values().filter(|e| now < e.expires_at).count();
        CacheStats {
            total_entries: entries.len(),
            live_entries: live,
            expired_entries: entries.len() - live,
        }
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        let size = entries.len();
        entries.clear();
        debug!("cleared cache with {} entries", size);
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Manually advanced clock for TTL tests.
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        ManualClock {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().expect("clock lock poisoned");
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock().expect("clock lock poisoned")
    }
}
