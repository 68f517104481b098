use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};

use crate::analysis_fetch::{FetchOptions, DEFAULT_PARALLELISM};
use crate::http_client::DEFAULT_TIMEOUT_SECS;
use crate::ticket::{StakeConfig, StakeMode};

const DEFAULT_CACHE_TTL_MIN: u64 = 10;
const DEFAULT_BANKROLL: f64 = 1000.0;
const DEFAULT_STRATEGY: &str = "balanced";
const DEFAULT_SIM_SEED: u64 = 2026;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderKind {
    Simulated { seed: u64 },
    Http { base_url: String, api_key: Option<String> },
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub provider: ProviderKind,
    pub cache_ttl: Duration,
    pub fetch_timeout: Duration,
    pub parallelism: usize,
    pub bankroll: f64,
    pub stake_mode: StakeMode,
    pub user_stake: Option<f64>,
    pub strategy: String,
    pub strategy_file: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Simulated {
                seed: DEFAULT_SIM_SEED,
            },
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_MIN * 60),
            fetch_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            parallelism: DEFAULT_PARALLELISM,
            bankroll: DEFAULT_BANKROLL,
            stake_mode: StakeMode::Combined,
            user_stake: None,
            strategy: DEFAULT_STRATEGY.to_string(),
            strategy_file: None,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Unset, blank, or unparsable numbers use
    /// defaults; a provider that cannot be built is an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let provider = match get("STATS_PROVIDER").map(|v| v.to_ascii_lowercase()).as_deref() {
            Some("http") => match get("STATS_BASE_URL") {
                Some(base_url) => ProviderKind::Http {
                    base_url,
                    api_key: get("STATS_API_KEY"),
                },
                None => bail!("STATS_PROVIDER=http requires STATS_BASE_URL"),
            },
            None | Some("simulated") | Some("sim") => ProviderKind::Simulated {
                seed: get("SIM_SEED")
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(DEFAULT_SIM_SEED),
            },
            Some(other) => bail!("unknown STATS_PROVIDER '{other}' (expected simulated or http)"),
        };

        let cache_ttl_min = get("STATS_CACHE_TTL_MIN")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_CACHE_TTL_MIN)
            .clamp(1, 120);
        let timeout_secs = get("STATS_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .clamp(1, 30);
        let parallelism = get("FETCH_PARALLELISM")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_PARALLELISM)
            .clamp(2, 32);

        let bankroll = get("BANKROLL")
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v >= 0.0)
            .unwrap_or(DEFAULT_BANKROLL);
        let stake_mode = get("STAKE_MODE")
            .and_then(|v| StakeMode::parse(&v))
            .unwrap_or(StakeMode::Combined);
        let user_stake = get("TICKET_STAKE")
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v > 0.0);

        Ok(Self {
            provider,
            cache_ttl: Duration::from_secs(cache_ttl_min * 60),
            fetch_timeout: Duration::from_secs(timeout_secs),
            parallelism,
            bankroll,
            stake_mode,
            user_stake,
            strategy: get("STRATEGY").unwrap_or_else(|| DEFAULT_STRATEGY.to_string()),
            strategy_file: get("STRATEGY_FILE").map(PathBuf::from),
        })
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: self.fetch_timeout,
            deadline: None,
            parallelism: self.parallelism,
        }
    }

    pub fn stake_config(&self) -> StakeConfig {
        StakeConfig {
            bankroll: self.bankroll,
            mode: self.stake_mode,
            user_stake: self.user_stake,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> EngineConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EngineConfig::from_lookup(|key| map.get(key).cloned()).unwrap()
    }

    #[test]
    fn defaults_without_env() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.provider, ProviderKind::Simulated { seed: DEFAULT_SIM_SEED });
        assert_eq!(cfg.cache_ttl, Duration::from_secs(600));
        assert_eq!(cfg.fetch_timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(cfg.stake_mode, StakeMode::Combined);
        assert_eq!(cfg.strategy, "balanced");
        assert_eq!(cfg.user_stake, None);
    }

    #[test]
    fn numeric_values_are_clamped() {
        let cfg = config(&[
            ("STATS_TIMEOUT_SECS", "600"),
            ("STATS_CACHE_TTL_MIN", "0"),
            ("FETCH_PARALLELISM", "1"),
        ]);
        assert_eq!(cfg.fetch_timeout, Duration::from_secs(30));
        assert_eq!(cfg.cache_ttl, Duration::from_secs(60));
        assert_eq!(cfg.parallelism, 2);
    }

    #[test]
    fn http_provider_requires_base_url() {
        let err = EngineConfig::from_lookup(|key| (key == "STATS_PROVIDER").then(|| "HTTP".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("STATS_BASE_URL"));

        let cfg = config(&[
            ("STATS_PROVIDER", "http"),
            ("STATS_BASE_URL", "https://stats.example"),
            ("STATS_API_KEY", " k "),
        ]);
        assert_eq!(
            cfg.provider,
            ProviderKind::Http {
                base_url: "https://stats.example".to_string(),
                api_key: Some("k".to_string()),
            }
        );
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = EngineConfig::from_lookup(|key| (key == "STATS_PROVIDER").then(|| "htpp".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("htpp"));

        let cfg = config(&[("STATS_PROVIDER", "Simulated"), ("SIM_SEED", "42")]);
        assert_eq!(cfg.provider, ProviderKind::Simulated { seed: 42 });
    }

    #[test]
    fn default_matches_empty_environment() {
        let cfg = config(&[]);
        let d = EngineConfig::default();
        assert_eq!(cfg.provider, d.provider);
        assert_eq!(cfg.cache_ttl, d.cache_ttl);
        assert_eq!(cfg.fetch_timeout, d.fetch_timeout);
        assert_eq!(cfg.parallelism, d.parallelism);
        assert_eq!(cfg.strategy, d.strategy);
    }

    #[test]
    fn stake_settings_parse() {
        let cfg = config(&[
            ("STAKE_MODE", "singles"),
            ("TICKET_STAKE", "25"),
            ("BANKROLL", "-5"),
        ]);
        let stake = cfg.stake_config();
        assert_eq!(stake.mode, StakeMode::Independent);
        assert_eq!(stake.user_stake, Some(25.0));
        assert_eq!(stake.bankroll, DEFAULT_BANKROLL);
    }
}
