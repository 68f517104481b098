use serde::Serialize;
use tracing::debug;

use crate::error::EngineError;
use crate::markets::{Market, Side};
use crate::strategy::Strategy;

pub const PER_MATCH_PICKS: usize = 2;
const VALUE_OVERRIDE: f64 = 0.05;

/// All generated markets for one match.
#[derive(Debug, Clone, Serialize)]
pub struct MatchMarkets {
    pub match_id: String,
    pub label: String,
    pub markets: Vec<Market>,
}

/// One leg of a ticket. `side` is always explicit and may differ from
/// `market.recommendation`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub match_id: String,
    pub match_label: String,
    pub market: Market,
    pub side: Side,
    pub stake: f64,
}

impl Selection {
    pub fn new(
        match_id: &str,
        match_label: &str,
        market: Market,
        side: Side,
    ) -> Result<Self, EngineError> {
        if !market.has_side(side) {
            return Err(EngineError::UnknownSide {
                market_id: market.id.clone(),
                side,
            });
        }
        Ok(Self {
            match_id: match_id.to_string(),
            match_label: match_label.to_string(),
            market,
            side,
            stake: 0.0,
        })
    }

    pub fn recommended(match_id: &str, match_label: &str, market: Market) -> Self {
        let side = market.recommendation;
        Self {
            match_id: match_id.to_string(),
            match_label: match_label.to_string(),
            market,
            side,
            stake: 0.0,
        }
    }

    /// Odds and probability of the chosen side, looked up by key.
    pub fn priced_side(&self) -> Option<(f64, f64)> {
        let odds = self.market.odds_for(self.side)?;
        let p = self.market.probability_for(self.side)?;
        Some((odds, p))
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SelectionPlan {
    pub selections: Vec<Selection>,
    // Matches where no market passed the strategy filters.
    pub fallback_matches: Vec<String>,
    // Selections dropped by the max_selections cap.
    pub truncated: usize,
}

impl SelectionPlan {
    pub fn from_selections(selections: Vec<Selection>) -> Self {
        Self {
            selections,
            ..Self::default()
        }
    }
}

/// Pick up to two markets per match, then cap the whole ticket.
///
/// The cap is a plain truncation in match order, not a global optimum over
/// all matches.
pub fn select_markets(matches: &[MatchMarkets], strategy: &Strategy) -> SelectionPlan {
    let mut plan = SelectionPlan::default();

    for m in matches {
        if m.markets.is_empty() {
            continue;
        }

        let mut candidates: Vec<&Market> = m
            .markets
            .iter()
            .filter(|market| passes_filters(market, strategy))
            .collect();

        if candidates.is_empty() {
            debug!(match_id = %m.match_id, strategy = %strategy.name, "no market passed filters, using fallback");
            plan.fallback_matches.push(m.label.clone());
            candidates = m.markets.iter().collect();
        }

        rank(&mut candidates);
        for market in candidates.into_iter().take(PER_MATCH_PICKS) {
            plan.selections
                .push(Selection::recommended(&m.match_id, &m.label, market.clone()));
        }
    }

    if plan.selections.len() > strategy.max_selections {
        plan.truncated = plan.selections.len() - strategy.max_selections;
        plan.selections.truncate(strategy.max_selections);
    }
    plan
}

fn passes_filters(market: &Market, strategy: &Strategy) -> bool {
    market.max_odds() <= strategy.max_odds
        && market.confidence / 100.0 >= strategy.min_confidence
        && (strategy.prefers(market.market_type) || market.value > VALUE_OVERRIDE)
}

// Stable: ties keep catalog order.
fn rank(markets: &mut [&Market]) {
    markets.sort_by(|a, b| b.score().total_cmp(&a.score()));
}
