use std::time::Duration;

use thiserror::Error;

use crate::markets::Side;

/// Failure fetching one team's statistics. Always recovered by the batch layer.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("stats fetch for {team_id} timed out after {timeout:?}")]
    Timeout { team_id: String, timeout: Duration },
    #[error("stats provider {provider} failed for {team_id}: {message}")]
    Provider {
        provider: String,
        team_id: String,
        message: String,
    },
    #[error("stats worker for {team_id} exited without a result")]
    Disconnected { team_id: String },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown strategy {0:?}")]
    UnknownStrategy(String),
    #[error("market {market_id} has no side {side:?}")]
    UnknownSide { market_id: String, side: Side },
    #[error("invalid strategy {name:?}: {reason}")]
    InvalidStrategy { name: String, reason: String },
}
