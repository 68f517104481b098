use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::markets::MarketType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub name: String,
    pub max_odds: f64,
    pub min_confidence: f64,
    #[serde(default)]
    pub preferred_market_types: Vec<MarketType>,
    pub max_selections: usize,
    pub bankroll_percentage_cap: f64,
}

impl Strategy {
    pub fn prefers(&self, market_type: MarketType) -> bool {
        self.preferred_market_types.contains(&market_type)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |reason: &str| EngineError::InvalidStrategy {
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }
        if !(self.max_odds.is_finite() && self.max_odds > 1.0) {
            return Err(invalid("max_odds must be > 1"));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(invalid("min_confidence must be within 0..=1"));
        }
        if self.max_selections == 0 {
            return Err(invalid("max_selections must be >= 1"));
        }
        if !(self.bankroll_percentage_cap > 0.0 && self.bankroll_percentage_cap <= 1.0) {
            return Err(invalid("bankroll_percentage_cap must be within (0, 1]"));
        }
        Ok(())
    }
}

static BUILTIN: Lazy<Vec<Strategy>> = Lazy::new(|| {
    vec![
        Strategy {
            name: "conservative".to_string(),
            max_odds: 2.0,
            min_confidence: 0.6,
            preferred_market_types: vec![
                MarketType::DoubleChance,
                MarketType::DrawNoBet,
                MarketType::Totals,
            ],
            max_selections: 3,
            bankroll_percentage_cap: 0.03,
        },
        Strategy {
            name: "balanced".to_string(),
            max_odds: 3.0,
            min_confidence: 0.4,
            preferred_market_types: vec![
                MarketType::MatchResult,
                MarketType::Totals,
                MarketType::BothTeamsScore,
                MarketType::DoubleChance,
            ],
            max_selections: 4,
            bankroll_percentage_cap: 0.05,
        },
        Strategy {
            name: "value_hunter".to_string(),
            max_odds: 4.5,
            min_confidence: 0.3,
            preferred_market_types: vec![MarketType::AsianHandicap, MarketType::Corners],
            max_selections: 5,
            bankroll_percentage_cap: 0.06,
        },
        Strategy {
            name: "aggressive".to_string(),
            max_odds: 6.0,
            min_confidence: 0.2,
            preferred_market_types: vec![
                MarketType::MatchResult,
                MarketType::AsianHandicap,
                MarketType::FirstGoal,
                MarketType::HalfTimeFullTime,
            ],
            max_selections: 6,
            bankroll_percentage_cap: 0.08,
        },
    ]
});

/// Named strategy profiles: the built-ins plus any loaded from a file.
#[derive(Debug, Clone)]
pub struct StrategyCatalog {
    profiles: Vec<Strategy>,
}

impl Default for StrategyCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl StrategyCatalog {
    pub fn builtin() -> Self {
        Self {
            profiles: BUILTIN.clone(),
        }
    }

    pub fn get(&self, name: &str) -> Result<&Strategy, EngineError> {
        let key = name.trim();
        self.profiles
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(key))
            .ok_or_else(|| EngineError::UnknownStrategy(key.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.profiles.iter().map(|s| s.name.as_str()).collect()
    }

    /// Add or replace a profile (matched by name, case-insensitive).
    pub fn insert(&mut self, strategy: Strategy) -> Result<(), EngineError> {
        strategy.validate()?;
        match self
            .profiles
            .iter_mut()
            .find(|s| s.name.eq_ignore_ascii_case(&strategy.name))
        {
            Some(existing) => *existing = strategy,
            None => self.profiles.push(strategy),
        }
        Ok(())
    }

    pub fn extend_from_json(&mut self, raw: &str) -> Result<usize> {
        let extra: Vec<Strategy> = serde_json::from_str(raw).context("invalid strategy json")?;
        let n = extra.len();
        for s in extra {
            self.insert(s)?;
        }
        Ok(n)
    }

    pub fn extend_from_file(&mut self, path: &Path) -> Result<usize> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read strategy file {}", path.display()))?;
        self.extend_from_json(&raw)
    }
}
