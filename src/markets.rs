use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::kelly::{clamp_probability, kelly, poisson_over, priced_odds, MARKET_P_CEIL, MARKET_P_FLOOR};
use crate::model::{MatchAnalysis, TotalsLine};
use crate::win_prob;

const CARDS_LINE: f64 = 4.5;
const CORNERS_LINE: f64 = 9.5;
const FIRST_GOAL_OUTCOME_WEIGHT: f64 = 0.6;
const LOW_RISK_SPREAD: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Home,
    Draw,
    Away,
    Over,
    Under,
    Yes,
    No,
    HomeOrDraw,
    HomeOrAway,
    DrawOrAway,
    NoGoal,
    HomeHome,
    DrawDraw,
    AwayAway,
    Other,
}

impl Side {
    pub fn label(self) -> &'static str {
        match self {
            Side::Home => "Home",
            Side::Draw => "Draw",
            Side::Away => "Away",
            Side::Over => "Over",
            Side::Under => "Under",
            Side::Yes => "Yes",
            Side::No => "No",
            Side::HomeOrDraw => "Home or Draw",
            Side::HomeOrAway => "Home or Away",
            Side::DrawOrAway => "Draw or Away",
            Side::NoGoal => "No Goal",
            Side::HomeHome => "Home/Home",
            Side::DrawDraw => "Draw/Draw",
            Side::AwayAway => "Away/Away",
            Side::Other => "Other",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketType {
    MatchResult,
    Totals,
    BothTeamsScore,
    AsianHandicap,
    DrawNoBet,
    Cards,
    Corners,
    FirstGoal,
    CleanSheet,
    DoubleChance,
    HalfTimeFullTime,
}

impl MarketType {
    pub const ALL: [MarketType; 11] = [
        MarketType::MatchResult,
        MarketType::Totals,
        MarketType::BothTeamsScore,
        MarketType::AsianHandicap,
        MarketType::DrawNoBet,
        MarketType::Cards,
        MarketType::Corners,
        MarketType::FirstGoal,
        MarketType::CleanSheet,
        MarketType::DoubleChance,
        MarketType::HalfTimeFullTime,
    ];

    pub fn margin(self) -> f64 {
        match self {
            MarketType::MatchResult => 1.10,
            MarketType::Totals => 1.08,
            MarketType::BothTeamsScore => 1.05,
            MarketType::AsianHandicap => 1.06,
            MarketType::DrawNoBet => 1.03,
            MarketType::Cards => 1.12,
            MarketType::Corners => 1.10,
            MarketType::FirstGoal => 1.18,
            MarketType::CleanSheet => 1.08,
            MarketType::DoubleChance => 1.04,
            MarketType::HalfTimeFullTime => 1.18,
        }
    }

    // Probability a side must exceed to be recommended ahead of the argmax.
    fn threshold(self) -> f64 {
        match self {
            MarketType::BothTeamsScore | MarketType::CleanSheet => 0.52,
            MarketType::Totals | MarketType::AsianHandicap | MarketType::DrawNoBet => 0.53,
            MarketType::Cards | MarketType::Corners => 0.54,
            MarketType::MatchResult
            | MarketType::FirstGoal
            | MarketType::DoubleChance
            | MarketType::HalfTimeFullTime => 0.55,
        }
    }

    fn fixed_risk(self) -> Option<RiskLevel> {
        match self {
            MarketType::DrawNoBet | MarketType::DoubleChance => Some(RiskLevel::Low),
            MarketType::FirstGoal | MarketType::HalfTimeFullTime => Some(RiskLevel::High),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            MarketType::MatchResult => "match_result",
            MarketType::Totals => "totals",
            MarketType::BothTeamsScore => "both_teams_score",
            MarketType::AsianHandicap => "asian_handicap",
            MarketType::DrawNoBet => "draw_no_bet",
            MarketType::Cards => "cards",
            MarketType::Corners => "corners",
            MarketType::FirstGoal => "first_goal",
            MarketType::CleanSheet => "clean_sheet",
            MarketType::DoubleChance => "double_chance",
            MarketType::HalfTimeFullTime => "half_time_full_time",
        }
    }

    pub fn from_tag(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_ascii_lowercase();
        MarketType::ALL.into_iter().find(|t| t.tag() == raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn weight(self) -> f64 {
        match self {
            RiskLevel::Low => 1.0,
            RiskLevel::Medium => 2.0,
            RiskLevel::High => 3.0,
        }
    }

    /// Bucket a mean risk weight.
    pub fn from_mean_weight(mean: f64) -> Self {
        if mean < 1.5 {
            RiskLevel::Low
        } else if mean < 2.5 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub market_type: MarketType,
    pub name: String,
    pub line: Option<f64>,
    pub margin: f64,
    pub odds: BTreeMap<Side, f64>,
    pub probability: BTreeMap<Side, f64>,
    /// `p * odds - 1` on the recommended side. The odds already carry the
    /// margin, so this tracks `margin - 1` rather than an edge over a book.
    pub value: f64,
    pub confidence: f64,
    pub recommendation: Side,
    pub kelly_percentage: f64,
    pub risk_level: RiskLevel,
}

impl Market {
    pub fn odds_for(&self, side: Side) -> Option<f64> {
        self.odds.get(&side).copied()
    }

    pub fn probability_for(&self, side: Side) -> Option<f64> {
        self.probability.get(&side).copied()
    }

    pub fn has_side(&self, side: Side) -> bool {
        self.odds.contains_key(&side) && self.probability.contains_key(&side)
    }

    pub fn max_odds(&self) -> f64 {
        self.odds.values().copied().fold(0.0, f64::max)
    }

    /// Ranking score used by the selector: `value * confidence / 100`.
    pub fn score(&self) -> f64 {
        self.value * self.confidence / 100.0
    }
}

struct MarketDraft {
    market_type: MarketType,
    suffix: String,
    name: String,
    line: Option<f64>,
    // Sides in recommendation preference order.
    sides: Vec<(Side, f64)>,
}

/// Build the fixed market catalog for one match. Pure and deterministic.
pub fn generate_markets(analysis: &MatchAnalysis) -> Vec<Market> {
    let win = analysis.win_probabilities.normalized();
    let goals = &analysis.goals_analysis;
    let adv = &analysis.advanced_stats;

    let lambda_home = non_negative(goals.expected_home_goals);
    let lambda_away = non_negative(goals.expected_away_goals);
    let lines: Vec<TotalsLine> = if goals.lines.is_empty() {
        win_prob::goals_analysis(lambda_home, lambda_away).lines
    } else {
        goals.lines.clone()
    };

    let head_share = share(win.home, win.away);

    let mut drafts = Vec::with_capacity(12 + lines.len());

    drafts.push(MarketDraft {
        market_type: MarketType::MatchResult,
        suffix: String::new(),
        name: "Match Result".to_string(),
        line: None,
        sides: vec![
            (Side::Home, win.home),
            (Side::Draw, win.draw),
            (Side::Away, win.away),
        ],
    });

    for l in &lines {
        drafts.push(MarketDraft {
            market_type: MarketType::Totals,
            suffix: format!("_{:.1}", l.line),
            name: format!("Total Goals {:.1}", l.line),
            line: Some(l.line),
            sides: two_way(Side::Over, Side::Under, l.over),
        });
    }

    drafts.push(MarketDraft {
        market_type: MarketType::BothTeamsScore,
        suffix: String::new(),
        name: "Both Teams To Score".to_string(),
        line: None,
        sides: two_way(Side::Yes, Side::No, adv.both_teams_score),
    });

    drafts.push(MarketDraft {
        market_type: MarketType::AsianHandicap,
        suffix: "_0.0".to_string(),
        name: "Asian Handicap 0.0".to_string(),
        line: Some(0.0),
        sides: two_way(Side::Home, Side::Away, head_share),
    });

    drafts.push(MarketDraft {
        market_type: MarketType::DrawNoBet,
        suffix: String::new(),
        name: "Draw No Bet".to_string(),
        line: None,
        sides: two_way(Side::Home, Side::Away, head_share),
    });

    drafts.push(MarketDraft {
        market_type: MarketType::Cards,
        suffix: format!("_{CARDS_LINE:.1}"),
        name: format!("Total Cards {CARDS_LINE:.1}"),
        line: Some(CARDS_LINE),
        sides: two_way(
            Side::Over,
            Side::Under,
            poisson_over(non_negative(adv.expected_cards), CARDS_LINE),
        ),
    });

    drafts.push(MarketDraft {
        market_type: MarketType::Corners,
        suffix: format!("_{CORNERS_LINE:.1}"),
        name: format!("Total Corners {CORNERS_LINE:.1}"),
        line: Some(CORNERS_LINE),
        sides: two_way(
            Side::Over,
            Side::Under,
            poisson_over(non_negative(adv.expected_corners), CORNERS_LINE),
        ),
    });

    let no_goal = (-(lambda_home + lambda_away)).exp();
    let first_home_share = FIRST_GOAL_OUTCOME_WEIGHT * head_share
        + (1.0 - FIRST_GOAL_OUTCOME_WEIGHT) * share(lambda_home, lambda_away);
    drafts.push(MarketDraft {
        market_type: MarketType::FirstGoal,
        suffix: String::new(),
        name: "First Team To Score".to_string(),
        line: None,
        sides: vec![
            (Side::Home, (1.0 - no_goal) * first_home_share),
            (Side::NoGoal, no_goal),
            (Side::Away, (1.0 - no_goal) * (1.0 - first_home_share)),
        ],
    });

    drafts.push(MarketDraft {
        market_type: MarketType::CleanSheet,
        suffix: "_home".to_string(),
        name: format!("{} Clean Sheet", analysis.home_team),
        line: None,
        sides: two_way(Side::Yes, Side::No, adv.clean_sheet_home),
    });
    drafts.push(MarketDraft {
        market_type: MarketType::CleanSheet,
        suffix: "_away".to_string(),
        name: format!("{} Clean Sheet", analysis.away_team),
        line: None,
        sides: two_way(Side::Yes, Side::No, adv.clean_sheet_away),
    });

    drafts.push(double_chance(win.home, win.draw, win.away));

    let persistence = 0.5 + 0.5 * unit(adv.first_half_goal_share, 0.45);
    drafts.push(MarketDraft {
        market_type: MarketType::HalfTimeFullTime,
        suffix: String::new(),
        name: "Half Time / Full Time".to_string(),
        line: None,
        sides: vec![
            (Side::HomeHome, win.home * persistence),
            (Side::DrawDraw, win.draw * persistence),
            (Side::AwayAway, win.away * persistence),
            (Side::Other, 1.0 - persistence),
        ],
    });

    drafts
        .into_iter()
        .map(|d| build_market(&analysis.match_id, d))
        .collect()
}

// Double chance covers the two likeliest outcomes against the third.
fn double_chance(home: f64, draw: f64, away: f64) -> MarketDraft {
    let mut outcomes = [(Side::Home, home), (Side::Draw, draw), (Side::Away, away)];
    outcomes.sort_by(|a, b| b.1.total_cmp(&a.1));
    let (first, second, rest) = (outcomes[0], outcomes[1], outcomes[2]);
    let combo = match rest.0 {
        Side::Away => Side::HomeOrDraw,
        Side::Draw => Side::HomeOrAway,
        _ => Side::DrawOrAway,
    };
    MarketDraft {
        market_type: MarketType::DoubleChance,
        suffix: String::new(),
        name: format!("Double Chance {}", combo.label()),
        line: None,
        sides: two_way(combo, rest.0, first.1 + second.1),
    }
}

fn build_market(match_id: &str, draft: MarketDraft) -> Market {
    let market_type = draft.market_type;
    let margin = market_type.margin();
    let sides = clamp_sides(draft.sides);

    let probability: BTreeMap<Side, f64> = sides.iter().copied().collect();
    let odds: BTreeMap<Side, f64> = sides
        .iter()
        .map(|&(side, p)| (side, priced_odds(p, margin)))
        .collect();

    let (recommendation, p_rec) = recommend(&sides, market_type.threshold());
    let odds_rec = odds.get(&recommendation).copied().unwrap_or(1.0);

    let confidence = if sides.len() == 2 {
        ((p_rec - 0.5).abs() * 200.0).min(100.0)
    } else {
        sides.iter().map(|&(_, p)| p).fold(0.0, f64::max) * 100.0
    };

    let risk_level = market_type.fixed_risk().unwrap_or_else(|| {
        if (p_rec - 0.5).abs() > LOW_RISK_SPREAD {
            RiskLevel::Low
        } else {
            RiskLevel::Medium
        }
    });

    Market {
        id: format!("{}:{}{}", match_id, market_type.tag(), draft.suffix),
        market_type,
        name: draft.name,
        line: draft.line,
        margin,
        odds,
        probability,
        value: p_rec * odds_rec - 1.0,
        confidence,
        recommendation,
        kelly_percentage: kelly(p_rec, odds_rec),
        risk_level,
    }
}

/// Keep every side inside [floor, ceil] and the total at exactly one.
fn clamp_sides(sides: Vec<(Side, f64)>) -> Vec<(Side, f64)> {
    if sides.len() == 2 {
        let p = clamp_probability(sides[0].1);
        return vec![(sides[0].0, p), (sides[1].0, 1.0 - p)];
    }
    let clamped: Vec<(Side, f64)> = sides
        .into_iter()
        .map(|(s, p)| {
            let p = if p.is_finite() { p } else { MARKET_P_FLOOR };
            (s, p.clamp(MARKET_P_FLOOR, MARKET_P_CEIL))
        })
        .collect();
    let sum: f64 = clamped.iter().map(|&(_, p)| p).sum();
    clamped.into_iter().map(|(s, p)| (s, p / sum)).collect()
}

fn recommend(sides: &[(Side, f64)], threshold: f64) -> (Side, f64) {
    if let Some(&hit) = sides.iter().find(|&&(_, p)| p > threshold) {
        return hit;
    }
    let mut best = sides[0];
    for &candidate in &sides[1..] {
        if candidate.1 > best.1 {
            best = candidate;
        }
    }
    best
}

fn two_way(first: Side, second: Side, p_first: f64) -> Vec<(Side, f64)> {
    vec![(first, p_first), (second, 1.0 - p_first)]
}

fn share(a: f64, b: f64) -> f64 {
    let sum = a + b;
    if sum > 0.0 && sum.is_finite() { a / sum } else { 0.5 }
}

fn unit(v: f64, fallback: f64) -> f64 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { fallback }
}

fn non_negative(v: f64) -> f64 {
    if v.is_finite() { v.max(0.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AdvancedStats, GoalsAnalysis, OutcomeProbabilities};

    fn analysis(home: f64, draw: f64, away: f64) -> MatchAnalysis {
        MatchAnalysis {
            match_id: "m1".to_string(),
            home_team: "ARS".to_string(),
            away_team: "CHE".to_string(),
            win_probabilities: OutcomeProbabilities { home, draw, away },
            goals_analysis: win_prob::goals_analysis(1.5, 1.1),
            advanced_stats: AdvancedStats::default(),
            degraded: false,
        }
    }

    fn find(markets: &[Market], id: &str) -> Market {
        markets
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .unwrap_or_else(|| panic!("missing market {id}"))
    }

    #[test]
    fn catalog_has_every_market_type() {
        let markets = generate_markets(&analysis(0.5, 0.25, 0.25));
        for t in MarketType::ALL {
            assert!(markets.iter().any(|m| m.market_type == t), "missing {t:?}");
        }
        // 1 result + 5 totals + btts + ah + dnb + cards + corners + first goal + 2 clean sheets + dc + htft
        assert_eq!(markets.len(), 16);
    }

    #[test]
    fn result_market_prices_scenario() {
        let markets = generate_markets(&analysis(0.50, 0.25, 0.25));
        let m = find(&markets, "m1:match_result");
        assert_eq!(m.odds_for(Side::Home), Some(2.20));
        assert_eq!(m.odds_for(Side::Draw), Some(4.40));
        assert_eq!(m.odds_for(Side::Away), Some(4.40));
        assert_eq!(m.recommendation, Side::Home);
        assert!((m.confidence - 50.0).abs() < 1e-9);
        assert_eq!(m.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn totals_line_prices_over_and_under() {
        let mut a = analysis(0.5, 0.25, 0.25);
        a.goals_analysis = GoalsAnalysis {
            expected_home_goals: 1.4,
            expected_away_goals: 1.2,
            lines: vec![TotalsLine { line: 2.5, over: 0.60 }],
        };
        let markets = generate_markets(&a);
        let m = find(&markets, "m1:totals_2.5");
        assert_eq!(m.odds_for(Side::Over), Some(1.80));
        assert_eq!(m.odds_for(Side::Under), Some(2.70));
        assert_eq!(m.recommendation, Side::Over);
        assert!((m.confidence - 20.0).abs() < 1e-9);
    }

    #[test]
    fn fixed_risk_overrides_apply() {
        let markets = generate_markets(&analysis(0.45, 0.30, 0.25));
        assert_eq!(find(&markets, "m1:draw_no_bet").risk_level, RiskLevel::Low);
        assert_eq!(find(&markets, "m1:double_chance").risk_level, RiskLevel::Low);
        assert_eq!(find(&markets, "m1:first_goal").risk_level, RiskLevel::High);
        assert_eq!(find(&markets, "m1:half_time_full_time").risk_level, RiskLevel::High);
    }

    #[test]
    fn double_chance_covers_two_likeliest_outcomes() {
        let markets = generate_markets(&analysis(0.20, 0.30, 0.50));
        let m = find(&markets, "m1:double_chance");
        assert!(m.has_side(Side::DrawOrAway));
        assert!(m.has_side(Side::Home));
        assert_eq!(m.recommendation, Side::DrawOrAway);
        assert!((m.probability_for(Side::DrawOrAway).unwrap() - 0.80).abs() < 1e-12);
    }

    #[test]
    fn degenerate_probabilities_stay_finite() {
        let markets = generate_markets(&analysis(1.0, 0.0, 0.0));
        for m in &markets {
            for (&side, &odds) in &m.odds {
                assert!(odds.is_finite() && odds > 1.0, "{} {side:?} {odds}", m.id);
            }
            assert!(m.value.is_finite());
        }
    }

    #[test]
    fn recommend_prefers_threshold_then_argmax() {
        let sides = vec![(Side::Home, 0.40), (Side::Draw, 0.20), (Side::Away, 0.40)];
        assert_eq!(recommend(&sides, 0.55).0, Side::Home);
        let sides = vec![(Side::Home, 0.30), (Side::Draw, 0.10), (Side::Away, 0.60)];
        assert_eq!(recommend(&sides, 0.55).0, Side::Away);
    }

    #[test]
    fn market_type_tags_round_trip() {
        for t in MarketType::ALL {
            assert_eq!(MarketType::from_tag(t.tag()), Some(t));
        }
        assert_eq!(MarketType::from_tag("nope"), None);
    }
}
