use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tracing::{info, warn};

use crate::analysis_fetch::{analyze_fixtures, build_fetch_pool, FetchOptions};
use crate::config::{EngineConfig, ProviderKind};
use crate::error::EngineError;
use crate::fake_stats::SimulatedStatsProvider;
use crate::markets::generate_markets;
use crate::model::{MatchAnalysis, MatchFixture};
use crate::selector::{select_markets, MatchMarkets};
use crate::stats_cache::CachedStatsProvider;
use crate::stats_fetch::HttpStatsProvider;
use crate::strategy::{Strategy, StrategyCatalog};
use crate::team_stats::StatsProvider;
use crate::ticket::{assemble_ticket, StakeConfig, TicketOutcome};

const SIMULATED_NOTE: &str =
    "Simulated statistics: team numbers are random stand-ins, not real data";

/// Fixtures in, ticket out: fetch stats, price markets, select, stake.
pub struct TicketEngine {
    provider: Arc<dyn StatsProvider>,
    catalog: StrategyCatalog,
    fetch: FetchOptions,
    // Built once from `fetch.parallelism` and shared by every request.
    pool: Option<rayon::ThreadPool>,
    stake: StakeConfig,
}

impl TicketEngine {
    pub fn new(
        provider: Arc<dyn StatsProvider>,
        catalog: StrategyCatalog,
        fetch: FetchOptions,
        stake: StakeConfig,
    ) -> Self {
        Self {
            provider,
            catalog,
            pool: build_fetch_pool(fetch.parallelism),
            fetch,
            stake,
        }
    }

    pub fn from_config(cfg: &EngineConfig) -> Result<Self> {
        let provider: Arc<dyn StatsProvider> = match &cfg.provider {
            ProviderKind::Simulated { seed } => Arc::new(CachedStatsProvider::new(
                SimulatedStatsProvider::new(*seed),
                cfg.cache_ttl,
            )),
            ProviderKind::Http { base_url, api_key } => Arc::new(CachedStatsProvider::new(
                HttpStatsProvider::new(base_url, api_key.clone(), cfg.fetch_timeout)?,
                cfg.cache_ttl,
            )),
        };

        let mut catalog = StrategyCatalog::builtin();
        if let Some(path) = cfg.strategy_file.as_ref() {
            let n = catalog.extend_from_file(path)?;
            info!(count = n, path = %path.display(), "loaded strategy profiles");
        }

        if provider.is_simulated() {
            warn!("STATS_PROVIDER is simulated: tickets are priced from random team statistics");
        }
        info!(provider = provider.name(), strategies = ?catalog.names(), "ticket engine ready");
        Ok(Self::new(provider, catalog, cfg.fetch_options(), cfg.stake_config()))
    }

    pub fn catalog(&self) -> &StrategyCatalog {
        &self.catalog
    }

    pub fn stake_config(&self) -> &StakeConfig {
        &self.stake
    }

    pub fn fetch_threads(&self) -> usize {
        self.pool
            .as_ref()
            .map(|p| p.current_num_threads())
            .unwrap_or_else(rayon::current_num_threads)
    }

    pub fn build_ticket(
        &self,
        fixtures: &[MatchFixture],
        strategy_name: &str,
    ) -> Result<TicketOutcome, EngineError> {
        self.build_ticket_with_options(fixtures, strategy_name, &self.fetch)
    }

    /// Same as [`Self::build_ticket`], but no fetch waits past `deadline`.
    pub fn build_ticket_by(
        &self,
        fixtures: &[MatchFixture],
        strategy_name: &str,
        deadline: Instant,
    ) -> Result<TicketOutcome, EngineError> {
        let opts = FetchOptions {
            deadline: Some(deadline),
            ..self.fetch
        };
        self.build_ticket_with_options(fixtures, strategy_name, &opts)
    }

    fn build_ticket_with_options(
        &self,
        fixtures: &[MatchFixture],
        strategy_name: &str,
        opts: &FetchOptions,
    ) -> Result<TicketOutcome, EngineError> {
        let strategy = self.catalog.get(strategy_name)?;

        let batch = analyze_fixtures(fixtures, &self.provider, opts, &self.pool);
        let mut outcome = ticket_from_analyses(&batch.analyses, strategy, &self.stake);
        if self.provider.is_simulated() && !fixtures.is_empty() {
            outcome.extend_rationale([SIMULATED_NOTE.to_string()]);
        }
        outcome.extend_rationale(
            batch
                .errors
                .into_iter()
                .map(|e| format!("Degraded input: {e}")),
        );

        info!(
            strategy = %strategy.name,
            matches = fixtures.len(),
            empty = outcome.is_empty(),
            "ticket request complete"
        );
        Ok(outcome)
    }
}

/// The pure core: markets for every analysis, selection, then staking.
pub fn ticket_from_analyses(
    analyses: &[MatchAnalysis],
    strategy: &Strategy,
    stake: &StakeConfig,
) -> TicketOutcome {
    let matches: Vec<MatchMarkets> = analyses
        .iter()
        .map(|a| MatchMarkets {
            match_id: a.match_id.clone(),
            label: a.label(),
            markets: generate_markets(a),
        })
        .collect();

    let plan = select_markets(&matches, strategy);
    assemble_ticket(plan, strategy, stake)
}
