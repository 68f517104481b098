use serde::{Deserialize, Serialize};

use crate::team_stats::HeadToHead;

pub const STANDARD_TOTALS_LINES: [f64; 5] = [0.5, 1.5, 2.5, 3.5, 4.5];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutcomeProbabilities {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl Default for OutcomeProbabilities {
    fn default() -> Self {
        Self::uniform()
    }
}

impl OutcomeProbabilities {
    pub fn uniform() -> Self {
        Self {
            home: 1.0 / 3.0,
            draw: 1.0 / 3.0,
            away: 1.0 / 3.0,
        }
    }

    /// Rescale to sum to 1. Negative or non-finite parts count as zero; an
    /// all-zero triple becomes uniform.
    pub fn normalized(self) -> Self {
        let clean = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
        let (h, d, a) = (clean(self.home), clean(self.draw), clean(self.away));
        let sum = h + d + a;
        if sum <= 0.0 {
            return Self::uniform();
        }
        Self {
            home: h / sum,
            draw: d / sum,
            away: a / sum,
        }
    }

    pub fn sum(&self) -> f64 {
        self.home + self.draw + self.away
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TotalsLine {
    pub line: f64,
    pub over: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalsAnalysis {
    pub expected_home_goals: f64,
    pub expected_away_goals: f64,
    pub lines: Vec<TotalsLine>,
}

impl Default for GoalsAnalysis {
    fn default() -> Self {
        Self {
            expected_home_goals: 1.30,
            expected_away_goals: 1.30,
            lines: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedStats {
    pub both_teams_score: f64,
    pub clean_sheet_home: f64,
    pub clean_sheet_away: f64,
    pub expected_cards: f64,
    pub expected_corners: f64,
    pub first_half_goal_share: f64,
}

impl Default for AdvancedStats {
    fn default() -> Self {
        Self {
            both_teams_score: 0.5,
            clean_sheet_home: 0.27,
            clean_sheet_away: 0.27,
            expected_cards: 4.2,
            expected_corners: 10.0,
            first_half_goal_share: 0.45,
        }
    }
}

/// Everything the market generator needs for one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchAnalysis {
    pub match_id: String,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub win_probabilities: OutcomeProbabilities,
    #[serde(default)]
    pub goals_analysis: GoalsAnalysis,
    #[serde(default)]
    pub advanced_stats: AdvancedStats,
    // True when any input was replaced by neutral defaults.
    #[serde(default)]
    pub degraded: bool,
}

impl MatchAnalysis {
    pub fn label(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchFixture {
    pub id: String,
    pub home: String,
    pub away: String,
    #[serde(default)]
    pub head_to_head: Option<HeadToHead>,
}

impl MatchFixture {
    pub fn new(id: &str, home: &str, away: &str) -> Self {
        Self {
            id: id.to_string(),
            home: home.to_string(),
            away: away.to_string(),
            head_to_head: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_rescales_and_repairs() {
        let p = OutcomeProbabilities {
            home: 2.0,
            draw: 1.0,
            away: f64::NAN,
        }
        .normalized();
        assert!((p.sum() - 1.0).abs() < 1e-12);
        assert!((p.home - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(p.away, 0.0);

        let z = OutcomeProbabilities {
            home: 0.0,
            draw: -1.0,
            away: 0.0,
        }
        .normalized();
        assert_eq!(z, OutcomeProbabilities::uniform());
    }

    #[test]
    fn analysis_json_with_missing_sections_uses_defaults() {
        let a: MatchAnalysis = serde_json::from_str(
            r#"{"match_id":"m1","home_team":"ARS","away_team":"CHE","win_probabilities":{"home":0.5,"draw":0.25}}"#,
        )
        .unwrap();
        assert_eq!(a.win_probabilities.away, 1.0 / 3.0);
        assert_eq!(a.advanced_stats, AdvancedStats::default());
        assert!(a.goals_analysis.lines.is_empty());
    }
}
