use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::warn;

use crate::error::StatsError;
use crate::http_client::DEFAULT_TIMEOUT_SECS;
use crate::model::{MatchAnalysis, MatchFixture};
use crate::team_stats::{StatsProvider, TeamStats};
use crate::win_prob::{compute_match_analysis, MatchInputs};

pub const DEFAULT_PARALLELISM: usize = 6;

#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub timeout: Duration,
    // Caller deadline for the whole batch; each fetch gets whatever is left.
    pub deadline: Option<Instant>,
    pub parallelism: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            deadline: None,
            parallelism: DEFAULT_PARALLELISM,
        }
    }
}

impl FetchOptions {
    pub fn effective_timeout(&self) -> Duration {
        match self.deadline {
            Some(deadline) => self
                .timeout
                .min(deadline.saturating_duration_since(Instant::now())),
            None => self.timeout,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchAnalysis {
    pub analyses: Vec<MatchAnalysis>,
    pub errors: Vec<String>,
}

/// Build the batch pool once and reuse it across requests. `None` means the
/// batch runs on the global rayon pool.
pub fn build_fetch_pool(parallelism: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(parallelism.clamp(2, 32))
        .thread_name(|i| format!("stats-fetch-{i}"))
        .build()
        .ok()
}

/// Analyze every fixture concurrently. A failed team lookup degrades only that
/// match to neutral statistics; the batch always returns one analysis per fixture.
pub fn analyze_fixtures(
    fixtures: &[MatchFixture],
    provider: &Arc<dyn StatsProvider>,
    opts: &FetchOptions,
    pool: &Option<rayon::ThreadPool>,
) -> BatchAnalysis {
    let results: Vec<(MatchAnalysis, Vec<String>)> = with_fetch_pool(pool, || {
        fixtures
            .par_iter()
            .map(|fixture| analyze_fixture(fixture, provider, opts))
            .collect()
    });

    let mut batch = BatchAnalysis {
        analyses: Vec::with_capacity(results.len()),
        errors: Vec::new(),
    };
    for (analysis, errors) in results {
        batch.errors.extend(errors);
        batch.analyses.push(analysis);
    }
    batch
}

fn analyze_fixture(
    fixture: &MatchFixture,
    provider: &Arc<dyn StatsProvider>,
    opts: &FetchOptions,
) -> (MatchAnalysis, Vec<String>) {
    let (home, away) = rayon::join(
        || fetch_with_timeout(provider, &fixture.home, opts.effective_timeout()),
        || fetch_with_timeout(provider, &fixture.away, opts.effective_timeout()),
    );

    let mut errors = Vec::new();
    for res in [&home, &away] {
        if let Err(err) = res {
            warn!(match_id = %fixture.id, error = %err, "stats degraded to neutral defaults");
            errors.push(format!("{}: {err}; using neutral stats", fixture.id));
        }
    }

    let analysis = compute_match_analysis(
        fixture,
        MatchInputs {
            home: home.as_ref().ok(),
            away: away.as_ref().ok(),
            head_to_head: fixture.head_to_head.as_ref(),
        },
    );
    (analysis, errors)
}

/// Run one provider lookup on its own thread and stop waiting after `timeout`.
/// A provider that hangs keeps its thread; the caller moves on.
pub fn fetch_with_timeout(
    provider: &Arc<dyn StatsProvider>,
    team_id: &str,
    timeout: Duration,
) -> Result<TeamStats, StatsError> {
    if timeout.is_zero() {
        return Err(StatsError::Timeout {
            team_id: team_id.to_string(),
            timeout,
        });
    }

    let (tx, rx) = mpsc::channel();
    let worker_provider = Arc::clone(provider);
    let worker_team = team_id.to_string();
    thread::spawn(move || {
        let _ = tx.send(worker_provider.team_stats(&worker_team));
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok(stats)) => Ok(stats.sanitized()),
        Ok(Err(err)) => Err(StatsError::Provider {
            provider: provider.name().to_string(),
            team_id: team_id.to_string(),
            message: format!("{err:#}"),
        }),
        Err(RecvTimeoutError::Timeout) => Err(StatsError::Timeout {
            team_id: team_id.to_string(),
            timeout,
        }),
        Err(RecvTimeoutError::Disconnected) => Err(StatsError::Disconnected {
            team_id: team_id.to_string(),
        }),
    }
}

fn with_fetch_pool<T>(pool: &Option<rayon::ThreadPool>, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    if let Some(pool) = pool.as_ref() {
        pool.install(action)
    } else {
        action()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_shrinks_timeout() {
        let opts = FetchOptions {
            timeout: Duration::from_secs(5),
            deadline: Some(Instant::now() + Duration::from_millis(200)),
            parallelism: 2,
        };
        assert!(opts.effective_timeout() <= Duration::from_millis(200));

        let passed = FetchOptions {
            deadline: Some(Instant::now() - Duration::from_millis(1)),
            ..opts
        };
        assert!(passed.effective_timeout().is_zero());
    }

    #[test]
    fn fetch_pool_size_is_clamped() {
        let pool = build_fetch_pool(1).expect("pool");
        assert_eq!(pool.current_num_threads(), 2);
        let pool = build_fetch_pool(6).expect("pool");
        assert_eq!(pool.current_num_threads(), 6);
        assert_eq!(with_fetch_pool(&Some(pool), rayon::current_num_threads), 6);
        assert_eq!(with_fetch_pool(&None, || 7), 7);
    }
}
