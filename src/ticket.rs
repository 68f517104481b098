use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::kelly::{finite_or_zero, kelly, raw_kelly, round2};
use crate::markets::RiskLevel;
use crate::selector::{PER_MATCH_PICKS, Selection, SelectionPlan};
use crate::strategy::Strategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakeMode {
    /// Every selection is its own single bet.
    Independent,
    /// One parlay: all legs must win, one shared stake.
    Combined,
}

impl StakeMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "independent" | "singles" | "single" => Some(StakeMode::Independent),
            "combined" | "parlay" | "accumulator" | "acca" => Some(StakeMode::Combined),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StakeConfig {
    pub bankroll: f64,
    pub mode: StakeMode,
    // Overrides Kelly sizing when > 0. Per leg in independent mode.
    pub user_stake: Option<f64>,
}

impl Default for StakeConfig {
    fn default() -> Self {
        Self {
            bankroll: 1000.0,
            mode: StakeMode::Combined,
            user_stake: None,
        }
    }
}

impl StakeConfig {
    fn bankroll(&self) -> f64 {
        if self.bankroll.is_finite() && self.bankroll > 0.0 {
            self.bankroll
        } else {
            0.0
        }
    }

    fn user_stake(&self) -> Option<f64> {
        self.user_stake.filter(|s| s.is_finite() && *s > 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAnalysis {
    pub total_risk: RiskLevel,
    pub kelly_total: f64,
    pub expected_roi: f64,
    pub win_probability: f64,
    pub bankroll_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Financial {
    pub total_stake: f64,
    pub total_odds: f64,
    pub potential_return: f64,
    pub potential_profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntelligentTicket {
    pub id: String,
    pub created_at: String,
    pub strategy_name: String,
    pub mode: StakeMode,
    pub selections: Vec<Selection>,
    pub risk_analysis: RiskAnalysis,
    pub financial: Financial,
    pub rationale: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmptyTicket {
    pub strategy_name: String,
    pub reason: String,
    pub rationale: Vec<String>,
}

/// Result of assembly. `Empty` means no recommendation can be made; it is
/// never a ticket with neutral odds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TicketOutcome {
    Ticket(IntelligentTicket),
    Empty(EmptyTicket),
}

impl TicketOutcome {
    pub fn ticket(&self) -> Option<&IntelligentTicket> {
        match self {
            TicketOutcome::Ticket(t) => Some(t),
            TicketOutcome::Empty(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, TicketOutcome::Empty(_))
    }

    pub fn rationale(&self) -> &[String] {
        match self {
            TicketOutcome::Ticket(t) => &t.rationale,
            TicketOutcome::Empty(e) => &e.rationale,
        }
    }

    pub fn extend_rationale(&mut self, notes: impl IntoIterator<Item = String>) {
        match self {
            TicketOutcome::Ticket(t) => t.rationale.extend(notes),
            TicketOutcome::Empty(e) => e.rationale.extend(notes),
        }
    }
}

struct Leg {
    selection: Selection,
    odds: f64,
    p: f64,
}

pub fn assemble_ticket(plan: SelectionPlan, strategy: &Strategy, cfg: &StakeConfig) -> TicketOutcome {
    let mut rationale = vec![strategy_summary(strategy)];
    for label in &plan.fallback_matches {
        rationale.push(format!(
            "Fallback used for {label}: no market met the '{}' filters, took the top {} unfiltered markets",
            strategy.name,
            PER_MATCH_PICKS,
        ));
    }
    if plan.truncated > 0 {
        rationale.push(format!(
            "{} selection(s) dropped by the max_selections cap of {}",
            plan.truncated, strategy.max_selections
        ));
    }

    let mut legs = Vec::with_capacity(plan.selections.len());
    for selection in plan.selections {
        match selection.priced_side() {
            Some((odds, p)) if odds.is_finite() && odds > 1.0 && p.is_finite() && p > 0.0 => {
                legs.push(Leg { selection, odds, p });
            }
            _ => rationale.push(format!(
                "Skipped {}: side {} is not priced in this market",
                selection.market.id, selection.side
            )),
        }
    }

    if legs.is_empty() {
        info!(strategy = %strategy.name, "no viable selections, returning empty ticket");
        return TicketOutcome::Empty(EmptyTicket {
            strategy_name: strategy.name.clone(),
            reason: "no viable selections".to_string(),
            rationale,
        });
    }

    for leg in &legs {
        rationale.push(leg_line(leg));
    }

    if cfg.mode == StakeMode::Combined && !legs.iter().map(|l| l.odds).product::<f64>().is_finite() {
        info!(strategy = %strategy.name, legs = legs.len(), "combined odds overflow, returning empty ticket");
        return TicketOutcome::Empty(EmptyTicket {
            strategy_name: strategy.name.clone(),
            reason: format!("combined odds of {} legs are not representable", legs.len()),
            rationale,
        });
    }

    let total_risk = aggregate_risk(&legs);
    let ticket = match cfg.mode {
        StakeMode::Combined => combined(legs, strategy, cfg, total_risk, rationale),
        StakeMode::Independent => independent(legs, strategy, cfg, total_risk, rationale),
    };
    debug!(
        ticket = %ticket.id,
        stake = ticket.financial.total_stake,
        odds = ticket.financial.total_odds,
        "ticket assembled"
    );
    TicketOutcome::Ticket(ticket)
}

fn combined(
    mut legs: Vec<Leg>,
    strategy: &Strategy,
    cfg: &StakeConfig,
    total_risk: RiskLevel,
    mut rationale: Vec<String>,
) -> IntelligentTicket {
    // Exact chosen-side prices only; never the market's recommendation.
    let combined_odds_raw: f64 = legs.iter().map(|l| l.odds).product();
    let combined_p: f64 = legs.iter().map(|l| l.p).product();
    let combined_odds = round2(combined_odds_raw);

    let cap = strategy.bankroll_percentage_cap;
    let combined_kelly = kelly(combined_p, combined_odds).min(cap);
    if raw_kelly(combined_p, combined_odds) <= 0.0 {
        rationale.push("Combined edge is not positive; stake held at the Kelly floor".to_string());
    }

    let bankroll = cfg.bankroll();
    let stake = round2(finite_or_zero(
        cfg.user_stake().unwrap_or(bankroll * combined_kelly),
    ));
    for leg in &mut legs {
        leg.selection.stake = stake;
    }

    let potential_return = round2(finite_or_zero(stake * combined_odds));
    rationale.push(format!(
        "Combined ticket: {} legs @ {:.2}, win probability {:.1}%",
        legs.len(),
        combined_odds,
        combined_p * 100.0
    ));

    IntelligentTicket {
        id: Uuid::new_v4().to_string(),
        created_at: Utc::now().to_rfc3339(),
        strategy_name: strategy.name.clone(),
        mode: StakeMode::Combined,
        selections: legs.into_iter().map(|l| l.selection).collect(),
        risk_analysis: RiskAnalysis {
            total_risk,
            kelly_total: finite_or_zero(combined_kelly),
            expected_roi: finite_or_zero(combined_p * combined_odds - 1.0),
            win_probability: finite_or_zero(combined_p),
            bankroll_percentage: ratio(stake, bankroll),
        },
        financial: Financial {
            total_stake: stake,
            total_odds: combined_odds,
            potential_return,
            potential_profit: round2(potential_return - stake),
        },
        rationale,
    }
}

fn independent(
    mut legs: Vec<Leg>,
    strategy: &Strategy,
    cfg: &StakeConfig,
    total_risk: RiskLevel,
    mut rationale: Vec<String>,
) -> IntelligentTicket {
    let cap = strategy.bankroll_percentage_cap;
    let bankroll = cfg.bankroll();

    let mut kelly_total = 0.0;
    let mut total_stake = 0.0;
    let mut potential_return = 0.0;
    let mut expected_profit = 0.0;
    let mut win_probability = 1.0;
    for leg in &mut legs {
        let k = kelly(leg.p, leg.odds).min(cap);
        let stake = round2(finite_or_zero(cfg.user_stake().unwrap_or(bankroll * k)));
        leg.selection.stake = stake;

        kelly_total += k;
        total_stake += stake;
        potential_return += stake * leg.odds;
        expected_profit += stake * (leg.p * leg.odds - 1.0);
        win_probability *= leg.p;
    }

    let total_odds = if total_stake > 0.0 {
        potential_return / total_stake
    } else {
        legs.iter().map(|l| l.odds).sum::<f64>() / legs.len() as f64
    };
    let expected_roi = if total_stake > 0.0 {
        expected_profit / total_stake
    } else {
        legs.iter().map(|l| l.p * l.odds - 1.0).sum::<f64>() / legs.len() as f64
    };

    let total_stake = round2(total_stake);
    let potential_return = round2(finite_or_zero(potential_return));
    rationale.push(format!(
        "Independent singles: {} bets, total stake {:.2}",
        legs.len(),
        total_stake
    ));

    IntelligentTicket {
        id: Uuid::new_v4().to_string(),
        created_at: Utc::now().to_rfc3339(),
        strategy_name: strategy.name.clone(),
        mode: StakeMode::Independent,
        selections: legs.into_iter().map(|l| l.selection).collect(),
        risk_analysis: RiskAnalysis {
            total_risk,
            kelly_total: finite_or_zero(kelly_total),
            expected_roi: finite_or_zero(expected_roi),
            win_probability: finite_or_zero(win_probability),
            bankroll_percentage: ratio(total_stake, bankroll),
        },
        financial: Financial {
            total_stake,
            total_odds: round2(finite_or_zero(total_odds)),
            potential_return,
            potential_profit: round2(potential_return - total_stake),
        },
        rationale,
    }
}

fn aggregate_risk(legs: &[Leg]) -> RiskLevel {
    let sum: f64 = legs.iter().map(|l| l.selection.market.risk_level.weight()).sum();
    RiskLevel::from_mean_weight(sum / legs.len() as f64)
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 { finite_or_zero(num / den) } else { 0.0 }
}

fn strategy_summary(s: &Strategy) -> String {
    format!(
        "Strategy '{}': odds <= {:.2}, confidence >= {:.0}%, up to {} selections, stake cap {:.1}% of bankroll",
        s.name,
        s.max_odds,
        s.min_confidence * 100.0,
        s.max_selections,
        s.bankroll_percentage_cap * 100.0
    )
}

fn leg_line(leg: &Leg) -> String {
    let s = &leg.selection;
    let mut line = format!(
        "{}: {} -> {} @ {:.2} (p={:.1}%, risk {:?})",
        s.match_label,
        s.market.name,
        s.side,
        leg.odds,
        leg.p * 100.0,
        s.market.risk_level
    );
    if s.side != s.market.recommendation {
        line.push_str(&format!(", overrides recommendation {}", s.market.recommendation));
    }
    line
}
