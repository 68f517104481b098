use crate::kelly::{poisson_over, poisson_pmf};
use crate::model::{
    AdvancedStats, GoalsAnalysis, MatchAnalysis, MatchFixture, OutcomeProbabilities, TotalsLine,
    STANDARD_TOTALS_LINES,
};
use crate::team_stats::{HeadToHead, TeamStats};

const GOALS_TOTAL_BASE: f64 = 2.60;
pub const HOME_ADVANTAGE: f64 = 0.10;
// Goals per unit of strength difference.
const K_STRENGTH: f64 = 2.0;
const STATS_BLEND: f64 = 0.5;
const H2H_WEIGHT: f64 = 0.15;
const H2H_FULL_SAMPLE: f64 = 10.0;
const FIRST_HALF_GOAL_SHARE: f64 = 0.45;
const MAX_GOALS: u32 = 10;

/// Inputs for one match. Missing team stats fall back to neutral values.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchInputs<'a> {
    pub home: Option<&'a TeamStats>,
    pub away: Option<&'a TeamStats>,
    pub head_to_head: Option<&'a HeadToHead>,
}

pub fn compute_match_analysis(fixture: &MatchFixture, inputs: MatchInputs<'_>) -> MatchAnalysis {
    let degraded = inputs.home.is_none() || inputs.away.is_none();
    let home = inputs.home.copied().unwrap_or_else(TeamStats::neutral).sanitized();
    let away = inputs.away.copied().unwrap_or_else(TeamStats::neutral).sanitized();

    let (lambda_home, lambda_away) = expected_goals(&home, &away);

    let (p_home, p_draw, p_away) = outcome_probs_poisson(lambda_home, lambda_away, MAX_GOALS);
    let mut win = OutcomeProbabilities {
        home: p_home,
        draw: p_draw,
        away: p_away,
    };
    if let Some(h2h) = inputs.head_to_head {
        win = blend_head_to_head(win, h2h);
    }

    MatchAnalysis {
        match_id: fixture.id.clone(),
        home_team: fixture.home.clone(),
        away_team: fixture.away.clone(),
        win_probabilities: win.normalized(),
        goals_analysis: goals_analysis(lambda_home, lambda_away),
        advanced_stats: advanced_stats(lambda_home, lambda_away, &home, &away),
        degraded,
    }
}

/// Expected goals per side from strength (with home advantage) and scoring rates.
pub fn expected_goals(home: &TeamStats, away: &TeamStats) -> (f64, f64) {
    let diff = K_STRENGTH * ((home.effective_strength() + HOME_ADVANTAGE) - away.effective_strength());
    let strength_home = GOALS_TOTAL_BASE / 2.0 + diff / 2.0;
    let strength_away = GOALS_TOTAL_BASE / 2.0 - diff / 2.0;

    let stats_home = (home.avg_goals_scored + away.avg_goals_conceded) / 2.0;
    let stats_away = (away.avg_goals_scored + home.avg_goals_conceded) / 2.0;

    let lambda_home = (1.0 - STATS_BLEND) * strength_home + STATS_BLEND * stats_home;
    let lambda_away = (1.0 - STATS_BLEND) * strength_away + STATS_BLEND * stats_away;
    (lambda_home.clamp(0.20, 3.80), lambda_away.clamp(0.20, 3.80))
}

pub fn goals_analysis(lambda_home: f64, lambda_away: f64) -> GoalsAnalysis {
    let total = lambda_home + lambda_away;
    GoalsAnalysis {
        expected_home_goals: lambda_home,
        expected_away_goals: lambda_away,
        lines: STANDARD_TOTALS_LINES
            .iter()
            .map(|&line| TotalsLine {
                line,
                over: poisson_over(total, line),
            })
            .collect(),
    }
}

fn advanced_stats(
    lambda_home: f64,
    lambda_away: f64,
    home: &TeamStats,
    away: &TeamStats,
) -> AdvancedStats {
    let home_blank = (-lambda_home).exp();
    let away_blank = (-lambda_away).exp();
    AdvancedStats {
        both_teams_score: (1.0 - home_blank) * (1.0 - away_blank),
        clean_sheet_home: away_blank,
        clean_sheet_away: home_blank,
        expected_cards: home.avg_cards + away.avg_cards,
        expected_corners: home.avg_corners + away.avg_corners,
        first_half_goal_share: FIRST_HALF_GOAL_SHARE,
    }
}

fn blend_head_to_head(win: OutcomeProbabilities, h2h: &HeadToHead) -> OutcomeProbabilities {
    let n = h2h.matches();
    if n == 0 {
        return win;
    }
    let n_f = n as f64;
    let w = H2H_WEIGHT * (n_f / H2H_FULL_SAMPLE).min(1.0);
    OutcomeProbabilities {
        home: (1.0 - w) * win.home + w * (h2h.home_wins as f64 / n_f),
        draw: (1.0 - w) * win.draw + w * (h2h.draws as f64 / n_f),
        away: (1.0 - w) * win.away + w * (h2h.away_wins as f64 / n_f),
    }
}

fn outcome_probs_poisson(lambda_home: f64, lambda_away: f64, max_goals: u32) -> (f64, f64, f64) {
    let pmf_h = poisson_pmf(lambda_home, max_goals);
    let pmf_a = poisson_pmf(lambda_away, max_goals);

    let mut p_home = 0.0;
    let mut p_draw = 0.0;
    let mut p_away = 0.0;

    for (i, p_i) in pmf_h.iter().enumerate() {
        for (j, p_j) in pmf_a.iter().enumerate() {
            let p = p_i * p_j;
            if i > j {
                p_home += p;
            } else if i < j {
                p_away += p;
            } else {
                p_draw += p;
            }
        }
    }

    // Guard against tiny float drift.
    let sum = p_home + p_draw + p_away;
    if sum > 0.0 {
        (p_home / sum, p_draw / sum, p_away / sum)
    } else {
        (1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> MatchFixture {
        MatchFixture::new("m1", "ARS", "CHE")
    }

    fn stats(strength: f64) -> TeamStats {
        TeamStats {
            strength,
            form: strength,
            ..TeamStats::neutral()
        }
    }

    #[test]
    fn probabilities_sum_to_one() {
        let h = stats(0.7);
        let a = stats(0.4);
        let out = compute_match_analysis(
            &fixture(),
            MatchInputs {
                home: Some(&h),
                away: Some(&a),
                head_to_head: None,
            },
        );
        assert!((out.win_probabilities.sum() - 1.0).abs() < 1e-9);
        assert!(out.win_probabilities.home > out.win_probabilities.away);
        assert!(!out.degraded);
    }

    #[test]
    fn missing_strength_uses_neutral_default_and_home_edge() {
        let out = compute_match_analysis(&fixture(), MatchInputs::default());
        assert!(out.degraded);
        // Equal teams: home advantage is the only asymmetry.
        assert!(out.win_probabilities.home > out.win_probabilities.away);
        assert!((out.win_probabilities.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn head_to_head_pulls_toward_history() {
        let h = stats(0.5);
        let a = stats(0.5);
        let base = compute_match_analysis(
            &fixture(),
            MatchInputs {
                home: Some(&h),
                away: Some(&a),
                head_to_head: None,
            },
        );
        let h2h = HeadToHead {
            home_wins: 0,
            draws: 0,
            away_wins: 10,
        };
        let adjusted = compute_match_analysis(
            &fixture(),
            MatchInputs {
                home: Some(&h),
                away: Some(&a),
                head_to_head: Some(&h2h),
            },
        );
        assert!(adjusted.win_probabilities.away > base.win_probabilities.away);
        assert!((adjusted.win_probabilities.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn goals_lines_cover_standard_set() {
        let g = goals_analysis(1.5, 1.1);
        let lines: Vec<f64> = g.lines.iter().map(|l| l.line).collect();
        assert_eq!(lines, STANDARD_TOTALS_LINES.to_vec());
        assert!(g.lines.windows(2).all(|w| w[0].over > w[1].over));
    }

    #[test]
    fn clean_sheets_mirror_opponent_blank() {
        let h = stats(0.5);
        let out = compute_match_analysis(
            &fixture(),
            MatchInputs {
                home: Some(&h),
                away: Some(&h),
                head_to_head: None,
            },
        );
        let g = &out.goals_analysis;
        let adv = &out.advanced_stats;
        assert!((adv.clean_sheet_home - (-g.expected_away_goals).exp()).abs() < 1e-12);
        assert!(adv.both_teams_score > 0.0 && adv.both_teams_score < 1.0);
    }
}
