use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use matchday_tickets::config::EngineConfig;
use matchday_tickets::engine::TicketEngine;
use matchday_tickets::model::MatchFixture;
use matchday_tickets::ticket::TicketOutcome;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let fixtures = match args.next().map(PathBuf::from) {
        Some(path) => load_fixtures(&path)?,
        None => demo_fixtures(),
    };

    let cfg = EngineConfig::from_env().context("invalid configuration")?;
    let strategy = args.next().unwrap_or_else(|| cfg.strategy.clone());
    let engine = TicketEngine::from_config(&cfg)?;
    let outcome = engine.build_ticket(&fixtures, &strategy)?;

    print_summary(&outcome);
    println!(
        "{}",
        serde_json::to_string_pretty(&outcome).context("serialize ticket")?
    );
    Ok(())
}

fn load_fixtures(path: &Path) -> Result<Vec<MatchFixture>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read fixtures {}", path.display()))?;
    serde_json::from_str(&raw).context("invalid fixtures json")
}

fn demo_fixtures() -> Vec<MatchFixture> {
    vec![
        MatchFixture::new("demo-1", "ARS", "CHE"),
        MatchFixture::new("demo-2", "LIV", "MCI"),
        MatchFixture::new("demo-3", "NEW", "TOT"),
    ]
}

fn print_summary(outcome: &TicketOutcome) {
    match outcome {
        TicketOutcome::Ticket(t) => {
            println!("Ticket {} ({:?}, strategy {})", t.id, t.mode, t.strategy_name);
            for s in &t.selections {
                println!(
                    "  {:<22} {:<26} {:<14} stake {:.2}",
                    s.match_label, s.market.name, s.side, s.stake
                );
            }
            println!(
                "Stake {:.2} @ {:.2} -> return {:.2} (profit {:.2})",
                t.financial.total_stake,
                t.financial.total_odds,
                t.financial.potential_return,
                t.financial.potential_profit
            );
            println!(
                "Risk {:?}, win probability {:.1}%, expected ROI {:.1}%",
                t.risk_analysis.total_risk,
                t.risk_analysis.win_probability * 100.0,
                t.risk_analysis.expected_roi * 100.0
            );
        }
        TicketOutcome::Empty(e) => {
            println!("No viable ticket for strategy {}: {}", e.strategy_name, e.reason);
        }
    }
    for line in outcome.rationale() {
        println!("  - {line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_fixture_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/fixtures.json");
        let fixtures = load_fixtures(&path).unwrap();
        assert_eq!(fixtures.len(), 2);
        assert_eq!(fixtures[0].home, "ARS");
        assert!(fixtures[0].head_to_head.is_some());
        assert!(fixtures[1].head_to_head.is_none());

        assert!(load_fixtures(Path::new("does/not/exist.json")).is_err());
    }
}
