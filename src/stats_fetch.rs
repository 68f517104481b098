use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use reqwest::Url;
use serde::Deserialize;

use crate::http_client::build_http_client;
use crate::team_stats::{StatsProvider, TeamStats};

/// Team statistics from a JSON HTTP endpoint: `GET {base_url}/teams/{id}/stats`.
pub struct HttpStatsProvider {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

// Providers disagree on field names; accept the common aliases.
#[derive(Debug, Deserialize)]
struct TeamStatsPayload {
    #[serde(default, alias = "rating")]
    strength: Option<f64>,
    #[serde(default, alias = "avgGoalsScored", alias = "goals_for")]
    avg_goals_scored: Option<f64>,
    #[serde(default, alias = "avgGoalsConceded", alias = "goals_against")]
    avg_goals_conceded: Option<f64>,
    #[serde(default, alias = "avgCards")]
    avg_cards: Option<f64>,
    #[serde(default, alias = "avgCorners")]
    avg_corners: Option<f64>,
    #[serde(default)]
    form: Option<f64>,
}

impl HttpStatsProvider {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim();
        if base_url.is_empty() {
            return Err(anyhow!("STATS_BASE_URL missing"));
        }
        let base_url = Url::parse(base_url)
            .with_context(|| format!("invalid STATS_BASE_URL '{base_url}'"))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("STATS_BASE_URL '{base_url}' cannot hold a path"));
        }
        Ok(Self {
            client: build_http_client(timeout)?,
            base_url,
            api_key,
        })
    }

    // The team id is one percent-encoded path segment.
    fn stats_url(&self, team_id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("STATS_BASE_URL cannot hold a path"))?
            .pop_if_empty()
            .extend(["teams", team_id.trim(), "stats"]);
        Ok(url)
    }
}

impl StatsProvider for HttpStatsProvider {
    fn name(&self) -> &str {
        "http"
    }

    fn team_stats(&self, team_id: &str) -> Result<TeamStats> {
        let url = self.stats_url(team_id)?;
        let mut req = self
            .client
            .get(url)
            .header(USER_AGENT, "matchday-tickets/0.1");
        if let Some(key) = self.api_key.as_ref() {
            req = req.header(AUTHORIZATION, format!("Bearer {key}"));
        }

        let resp = req.send().context("stats request failed")?;
        let status = resp.status();
        let body = resp.text().context("failed reading stats body")?;
        if !status.is_success() {
            let snippet = body
                .trim()
                .replace(['\n', '\r'], " ")
                .chars()
                .take(220)
                .collect::<String>();
            return Err(anyhow!("stats http {}: {}", status, snippet));
        }

        parse_team_stats_json(&body)
    }
}

pub fn parse_team_stats_json(raw: &str) -> Result<TeamStats> {
    let payload: TeamStatsPayload = serde_json::from_str(raw).context("invalid stats json")?;
    let d = TeamStats::neutral();
    let stats = TeamStats {
        strength: payload.strength.unwrap_or(d.strength),
        avg_goals_scored: payload.avg_goals_scored.unwrap_or(d.avg_goals_scored),
        avg_goals_conceded: payload.avg_goals_conceded.unwrap_or(d.avg_goals_conceded),
        avg_cards: payload.avg_cards.unwrap_or(d.avg_cards),
        avg_corners: payload.avg_corners.unwrap_or(d.avg_corners),
        form: payload.form.unwrap_or(d.form),
    };
    Ok(stats.sanitized())
}
