use anyhow::Result;
use serde::{Deserialize, Serialize};

pub const NEUTRAL_STRENGTH: f64 = 0.5;
const NEUTRAL_GOALS: f64 = 1.30;
const NEUTRAL_CARDS: f64 = 2.10;
const NEUTRAL_CORNERS: f64 = 5.00;

/// Per-team inputs consumed by the probability model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamStats {
    pub strength: f64,
    pub avg_goals_scored: f64,
    pub avg_goals_conceded: f64,
    pub avg_cards: f64,
    pub avg_corners: f64,
    pub form: f64,
}

impl TeamStats {
    pub fn neutral() -> Self {
        Self {
            strength: NEUTRAL_STRENGTH,
            avg_goals_scored: NEUTRAL_GOALS,
            avg_goals_conceded: NEUTRAL_GOALS,
            avg_cards: NEUTRAL_CARDS,
            avg_corners: NEUTRAL_CORNERS,
            form: NEUTRAL_STRENGTH,
        }
    }

    /// Replace out-of-range or non-finite fields with neutral values.
    pub fn sanitized(self) -> Self {
        let d = Self::neutral();
        Self {
            strength: unit_or(self.strength, d.strength),
            avg_goals_scored: rate_or(self.avg_goals_scored, d.avg_goals_scored, 6.0),
            avg_goals_conceded: rate_or(self.avg_goals_conceded, d.avg_goals_conceded, 6.0),
            avg_cards: rate_or(self.avg_cards, d.avg_cards, 10.0),
            avg_corners: rate_or(self.avg_corners, d.avg_corners, 20.0),
            form: unit_or(self.form, d.form),
        }
    }

    /// Strength nudged by recent form.
    pub fn effective_strength(&self) -> f64 {
        0.8 * self.strength + 0.2 * self.form
    }
}

impl Default for TeamStats {
    fn default() -> Self {
        Self::neutral()
    }
}

fn unit_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() && (0.0..=1.0).contains(&v) {
        v
    } else {
        fallback
    }
}

fn rate_or(v: f64, fallback: f64, max: f64) -> f64 {
    if v.is_finite() && v >= 0.0 {
        v.min(max)
    } else {
        fallback
    }
}

/// Head-to-head record from the home side's perspective.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadToHead {
    pub home_wins: u32,
    pub draws: u32,
    pub away_wins: u32,
}

impl HeadToHead {
    pub fn matches(&self) -> u32 {
        self.home_wins + self.draws + self.away_wins
    }
}

/// Source of team statistics. Implementations may fail; the batch layer
/// substitutes [`TeamStats::neutral`] for that team.
pub trait StatsProvider: Send + Sync {
    fn name(&self) -> &str;

    fn team_stats(&self, team_id: &str) -> Result<TeamStats>;

    /// True when the numbers are random stand-ins rather than real data.
    fn is_simulated(&self) -> bool {
        false
    }
}

impl<P: StatsProvider + ?Sized> StatsProvider for std::sync::Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn team_stats(&self, team_id: &str) -> Result<TeamStats> {
        (**self).team_stats(team_id)
    }

    fn is_simulated(&self) -> bool {
        (**self).is_simulated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitized_replaces_garbage_with_neutral() {
        let raw = TeamStats {
            strength: 1.7,
            avg_goals_scored: f64::NAN,
            avg_goals_conceded: -1.0,
            avg_cards: 3.0,
            avg_corners: 99.0,
            form: 0.9,
        };
        let s = raw.sanitized();
        assert_eq!(s.strength, NEUTRAL_STRENGTH);
        assert_eq!(s.avg_goals_scored, NEUTRAL_GOALS);
        assert_eq!(s.avg_goals_conceded, NEUTRAL_GOALS);
        assert_eq!(s.avg_cards, 3.0);
        assert_eq!(s.avg_corners, 20.0);
        assert_eq!(s.form, 0.9);
    }

    #[test]
    fn missing_json_fields_default_to_neutral() {
        let s: TeamStats = serde_json::from_str(r#"{"strength":0.7}"#).unwrap();
        assert_eq!(s.strength, 0.7);
        assert_eq!(s.avg_cards, NEUTRAL_CARDS);
    }
}
