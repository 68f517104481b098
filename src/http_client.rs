use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;

pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build http client")
}
