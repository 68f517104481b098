use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::debug;

use crate::team_stats::{StatsProvider, TeamStats};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    stats: TeamStats,
    fetched_at: Instant,
}

/// Wraps a provider with a per-team TTL cache.
///
/// Only successful lookups are stored. Concurrent misses on the same key may
/// both hit the inner provider; the later write wins.
pub struct CachedStatsProvider<P> {
    inner: P,
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl<P: StatsProvider> CachedStatsProvider<P> {
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop expired entries.
    pub fn purge_expired(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            let ttl = self.ttl;
            entries.retain(|_, e| e.fetched_at.elapsed() < ttl);
        }
    }

    fn cached(&self, key: &str) -> Option<TeamStats> {
        let entries = self.entries.lock().ok()?;
        let entry = entries.get(key)?;
        if entry.fetched_at.elapsed() < self.ttl {
            Some(entry.stats)
        } else {
            None
        }
    }

    fn store(&self, key: String, stats: TeamStats) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                key,
                CacheEntry {
                    stats,
                    fetched_at: Instant::now(),
                },
            );
        }
    }
}

impl<P: StatsProvider> StatsProvider for CachedStatsProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn is_simulated(&self) -> bool {
        self.inner.is_simulated()
    }

    fn team_stats(&self, team_id: &str) -> Result<TeamStats> {
        let key = cache_key(team_id);
        if let Some(stats) = self.cached(&key) {
            debug!(team = %key, "stats cache hit");
            return Ok(stats);
        }
        let stats = self.inner.team_stats(team_id)?;
        self.store(key, stats);
        Ok(stats)
    }
}

fn cache_key(team_id: &str) -> String {
    team_id.trim().to_uppercase()
}
