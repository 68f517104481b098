use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::team_stats::{StatsProvider, TeamStats};

/// Random team statistics for demos and offline runs.
///
/// Values are derived from `seed` and the team id only, so the same team always
/// gets the same numbers for a given seed.
#[derive(Debug, Clone)]
pub struct SimulatedStatsProvider {
    seed: u64,
}

impl SimulatedStatsProvider {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl StatsProvider for SimulatedStatsProvider {
    fn name(&self) -> &str {
        "simulated"
    }

    fn is_simulated(&self) -> bool {
        true
    }

    fn team_stats(&self, team_id: &str) -> Result<TeamStats> {
        let mut rng = StdRng::seed_from_u64(self.seed ^ fnv1a(team_id.trim().to_uppercase().as_bytes()));

        let strength: f64 = rng.gen_range(0.25..0.85);
        // Stronger sides score more and concede less, with some jitter.
        let scored = (0.7 + 1.4 * strength + rng.gen_range(-0.25..0.25)).max(0.3);
        let conceded = (2.0 - 1.3 * strength + rng.gen_range(-0.25..0.25)).max(0.3);
        let form = (strength + rng.gen_range(-0.2..0.2)).clamp(0.0, 1.0);

        Ok(TeamStats {
            strength,
            avg_goals_scored: scored,
            avg_goals_conceded: conceded,
            avg_cards: rng.gen_range(1.4..2.9),
            avg_corners: rng.gen_range(3.5..6.8),
            form,
        })
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}
