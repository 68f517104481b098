use matchday_tickets::kelly::{KELLY_CEIL, KELLY_FLOOR};
use matchday_tickets::markets::{generate_markets, Market, MarketType, RiskLevel, Side};
use matchday_tickets::model::{
    AdvancedStats, GoalsAnalysis, MatchAnalysis, OutcomeProbabilities, TotalsLine,
};
use matchday_tickets::win_prob;

fn analysis(home: f64, draw: f64, away: f64) -> MatchAnalysis {
    MatchAnalysis {
        match_id: "m1".to_string(),
        home_team: "ARS".to_string(),
        away_team: "CHE".to_string(),
        win_probabilities: OutcomeProbabilities { home, draw, away },
        goals_analysis: win_prob::goals_analysis(1.45, 1.15),
        advanced_stats: AdvancedStats::default(),
        degraded: false,
    }
}

fn market<'a>(markets: &'a [Market], id: &str) -> &'a Market {
    markets
        .iter()
        .find(|m| m.id == id)
        .unwrap_or_else(|| panic!("missing market {id}"))
}

fn sample_inputs() -> Vec<MatchAnalysis> {
    let mut out = Vec::new();
    for (h, d, a) in [
        (0.50, 0.25, 0.25),
        (0.33, 0.34, 0.33),
        (0.70, 0.20, 0.10),
        (0.08, 0.12, 0.80),
        (0.999, 0.0005, 0.0005),
        (0.0, 0.0, 0.0),
    ] {
        out.push(analysis(h, d, a));
    }
    let mut skewed = analysis(0.6, 0.25, 0.15);
    skewed.goals_analysis = win_prob::goals_analysis(3.6, 0.2);
    skewed.advanced_stats = AdvancedStats {
        both_teams_score: 0.999,
        clean_sheet_home: 0.0,
        clean_sheet_away: 1.0,
        expected_cards: 9.0,
        expected_corners: 2.0,
        first_half_goal_share: 0.9,
    };
    out.push(skewed);
    out
}

#[test]
fn probabilities_sum_to_one_for_every_market() {
    for a in sample_inputs() {
        for m in generate_markets(&a) {
            let sum: f64 = m.probability.values().sum();
            assert!((sum - 1.0).abs() < 1e-6, "{} sums to {sum}", m.id);
            assert!(m.probability.values().all(|p| *p > 0.0 && *p < 1.0), "{}", m.id);
        }
    }
}

#[test]
fn odds_follow_fair_odds_identity() {
    for a in sample_inputs() {
        for m in generate_markets(&a) {
            assert_eq!(m.margin, m.market_type.margin());
            assert!(m.margin >= 1.03);
            for (side, odds) in &m.odds {
                let p = m.probability[side];
                let ratio = odds * p / m.margin;
                assert!((ratio - 1.0).abs() < 0.006, "{} {side:?}: ratio {ratio}", m.id);
            }
        }
    }
}

#[test]
fn scores_and_kelly_stay_in_bounds() {
    for a in sample_inputs() {
        for m in generate_markets(&a) {
            assert!((0.0..=100.0).contains(&m.confidence), "{}", m.id);
            assert!((KELLY_FLOOR..=KELLY_CEIL).contains(&m.kelly_percentage), "{}", m.id);
            assert!(m.value.is_finite());
            assert!(m.has_side(m.recommendation));
        }
    }
}

#[test]
fn generation_is_deterministic() {
    let a = analysis(0.47, 0.28, 0.25);
    let first = serde_json::to_string(&generate_markets(&a)).unwrap();
    for _ in 0..5 {
        assert_eq!(serde_json::to_string(&generate_markets(&a)).unwrap(), first);
    }
    assert_eq!(generate_markets(&a), generate_markets(&a));
}

#[test]
fn result_market_matches_scenario_a() {
    let markets = generate_markets(&analysis(0.50, 0.25, 0.25));
    let m = market(&markets, "m1:match_result");
    assert_eq!(m.odds[&Side::Home], 2.20);
    assert_eq!(m.odds[&Side::Draw], 4.40);
    assert_eq!(m.odds[&Side::Away], 4.40);
}

#[test]
fn totals_line_matches_scenario_b() {
    let mut a = analysis(0.50, 0.25, 0.25);
    a.goals_analysis = GoalsAnalysis {
        expected_home_goals: 1.4,
        expected_away_goals: 1.2,
        lines: vec![TotalsLine {
            line: 2.5,
            over: 0.60,
        }],
    };
    let markets = generate_markets(&a);
    let m = market(&markets, "m1:totals_2.5");
    assert_eq!(m.odds[&Side::Over], 1.80);
    assert_eq!(m.odds[&Side::Under], 2.70);
}

#[test]
fn value_is_margin_driven() {
    // The value formula prices against the market's own odds, so it tracks the margin.
    let markets = generate_markets(&analysis(0.45, 0.30, 0.25));
    for m in &markets {
        assert!((m.value - (m.margin - 1.0)).abs() < 0.01, "{} value {}", m.id, m.value);
    }
}

#[test]
fn speculative_markets_are_high_risk() {
    let markets = generate_markets(&analysis(0.80, 0.15, 0.05));
    for m in &markets {
        match m.market_type {
            MarketType::FirstGoal | MarketType::HalfTimeFullTime => {
                assert_eq!(m.risk_level, RiskLevel::High)
            }
            MarketType::DrawNoBet | MarketType::DoubleChance => {
                assert_eq!(m.risk_level, RiskLevel::Low)
            }
            _ => assert_ne!(m.risk_level, RiskLevel::High),
        }
    }
}

#[test]
fn missing_totals_lines_are_derived_from_expected_goals() {
    let mut a = analysis(0.5, 0.25, 0.25);
    a.goals_analysis.lines.clear();
    let markets = generate_markets(&a);
    let totals = markets
        .iter()
        .filter(|m| m.market_type == MarketType::Totals)
        .count();
    assert_eq!(totals, 5);
}
