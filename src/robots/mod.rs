//! Robots.txt handling module
//!
//! This module fetches and parses robots.txt files and answers per-path
//! allow/disallow and crawl-delay questions. A policy is fetched once per
//! crawl session, at coordinator start.

mod policy;

pub use policy::RobotsPolicy;

use std::time::Duration;
use url::Url;

/// Connect and read timeout for the robots.txt request.
const ROBOTS_TIMEOUT: Duration = Duration::from_secs(5);

/// Fetches and parses robots.txt for the host behind `base`.
///
/// Any non-200 response or transport failure yields a permissive policy;
/// an unreadable robots.txt never blocks a crawl.
///
/// # Arguments
///
/// * `base` - A URL on the target host; scheme, host, and port are reused
/// * `user_agent` - The User-Agent header value for the request
pub async fn fetch_policy(base: &Url, user_agent: &str) -> RobotsPolicy {
    let robots_url = match base.join("/robots.txt") {
        Ok(url) => url,
        Err(_) => return RobotsPolicy::permissive(),
    };

    tracing::debug!("Fetching robots.txt from {robots_url}");

    let client = match reqwest::Client::builder()
        .user_agent(user_agent)
        .connect_timeout(ROBOTS_TIMEOUT)
        .timeout(ROBOTS_TIMEOUT)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!("Failed to build robots.txt client: {e}");
            return RobotsPolicy::permissive();
        }
    };

    match client.get(robots_url.clone()).send().await {
        Ok(response) if response.status() == reqwest::StatusCode::OK => {
            match response.text().await {
                Ok(content) => RobotsPolicy::from_content(&content),
                Err(e) => {
                    tracing::warn!("Failed to read robots.txt body from {robots_url}: {e}");
                    RobotsPolicy::permissive()
                }
            }
        }
        Ok(response) => {
            tracing::debug!(
                "robots.txt at {robots_url} returned {}, allowing all",
                response.status()
            );
            RobotsPolicy::permissive()
        }
        Err(e) => {
            tracing::debug!("Could not fetch robots.txt from {robots_url}: {e}, allowing all");
            RobotsPolicy::permissive()
        }
    }
}
