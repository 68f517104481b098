pub mod analysis_fetch;
pub mod config;
pub mod engine;
pub mod error;
pub mod fake_stats;
pub mod http_client;
pub mod kelly;
pub mod markets;
pub mod model;
pub mod selector;
pub mod stats_cache;
pub mod stats_fetch;
pub mod strategy;
pub mod team_stats;
pub mod ticket;
pub mod win_prob;
