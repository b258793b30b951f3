//! HTTP fetch pipeline
//!
//! Every page request runs through three nested concerns: retry with
//! exponential backoff, manual redirect following with loop detection,
//! and a content gate (status check, Content-Type check, capped body
//! read). Redirects are disabled at the transport layer so the pipeline
//! can canonicalize each hop and detect loops itself.

use crate::url::canonicalize;
use crate::CrawlError;
use rand::Rng;
use reqwest::{redirect::Policy, Client, Response};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Base connect timeout for page fetches.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Base read timeout; retries stretch it per attempt.
const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Cap on fetched body bytes; anything beyond is dropped.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Redirect hops followed before giving up.
const MAX_REDIRECTS: usize = 5;

/// Total request attempts, including the first.
const MAX_ATTEMPTS: u32 = 3;

/// Upper bound on the random backoff jitter between attempts.
const BACKOFF_JITTER_MS: u64 = 1000;

/// Content types the extractor can work with (prefix match).
const ALLOWED_CONTENT_TYPES: [&str; 4] = [
    "text/html",
    "application/xhtml+xml",
    "application/xml",
    "text/xml",
];

/// Result of a successful trip through the fetch pipeline.
#[derive(Debug)]
pub enum FetchOutcome {
    /// A parseable page.
    Page {
        /// Final URL after redirects.
        final_url: Url,
        /// HTTP status of the final response.
        status: u16,
        /// Body text, capped at [`MAX_BODY_BYTES`].
        body: String,
    },

    /// The response was fine but not a document we parse.
    Skipped {
        /// The Content-Type that was rejected (may be empty).
        content_type: String,
    },
}

/// Builds the HTTP client used for page fetches.
pub fn build_http_client(user_agent: &str) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(READ_TIMEOUT)
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches `url`, retrying transient failures and following redirects.
///
/// Transport errors and 5xx responses are retried up to three attempts
/// with exponential backoff and jitter; each retry stretches the request
/// timeout. A final status of 400 or above is an error; a non-HTML
/// Content-Type is a skip, not an error.
pub async fn fetch_page(client: &Client, url: &Url) -> Result<FetchOutcome, CrawlError> {
    let mut attempt = 0;

    loop {
        attempt += 1;
        if attempt > 1 {
            let backoff = backoff_for_retry(attempt - 1)
                + Duration::from_millis(rand::thread_rng().gen_range(0..BACKOFF_JITTER_MS));
            tracing::debug!("Retrying {url} (attempt {attempt}/{MAX_ATTEMPTS}) after {backoff:?}");
            tokio::time::sleep(backoff).await;
        }

        match execute_with_redirects(client, url, timeout_for_attempt(attempt)).await {
            Ok(response) => {
                let status = response.status();
                if status.is_server_error() && attempt < MAX_ATTEMPTS {
                    tracing::warn!(
                        "Server error {status} for {url} (attempt {attempt}/{MAX_ATTEMPTS})"
                    );
                    continue;
                }
                return gate_response(response).await;
            }
            Err(e) if is_retryable(&e) && attempt < MAX_ATTEMPTS => {
                tracing::warn!("Request failed (attempt {attempt}/{MAX_ATTEMPTS}) for {url}: {e}");
            }
            Err(e) => return Err(e),
        }
    }
}

/// Exponential backoff before retry `retry` (1-based), capped at 10s.
fn backoff_for_retry(retry: u32) -> Duration {
    let ms = 1000u64.saturating_mul(1 << (retry - 1)).min(10_000);
    Duration::from_millis(ms)
}

/// Request timeout for an attempt: the base timeout first, then stretched.
fn timeout_for_attempt(attempt: u32) -> Duration {
    if attempt <= 1 {
        READ_TIMEOUT
    } else {
        READ_TIMEOUT * (attempt + 1)
    }
}

fn is_retryable(err: &CrawlError) -> bool {
    matches!(err, CrawlError::Http { .. })
}

/// Issues the request, chasing `Location` headers by hand.
///
/// Each hop is canonicalized and recorded in a per-fetch trail; revisiting
/// a trail entry means a loop, which ends the chase with the last response
/// rather than an error. Hops are paced progressively.
async fn execute_with_redirects(
    client: &Client,
    start: &Url,
    timeout: Duration,
) -> Result<Response, CrawlError> {
    let mut current = start.clone();
    let mut trail: HashSet<String> = HashSet::new();
    if let Ok(canonical) = canonicalize(start.as_str()) {
        trail.insert(canonical.to_string());
    }

    for hop in 0..MAX_REDIRECTS {
        let response = client
            .get(current.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|source| CrawlError::Http {
                url: current.to_string(),
                source,
            })?;

        if !response.status().is_redirection() {
            return Ok(response);
        }

        let Some(location) = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
        else {
            // A redirect without a usable Location is as final as it gets
            return Ok(response);
        };

        let next = current
            .join(location)
            .map_err(|_| CrawlError::InvalidRedirect {
                url: current.to_string(),
                location: location.to_string(),
            })?;

        let marker = canonicalize(next.as_str())
            .map(|u| u.to_string())
            .unwrap_or_else(|_| next.to_string());
        if !trail.insert(marker) {
            tracing::debug!("Redirect loop detected at {next}, keeping last response");
            return Ok(response);
        }

        tracing::debug!("Following redirect {current} -> {next}");
        tokio::time::sleep(redirect_pause(hop)).await;
        current = next;
    }

    Err(CrawlError::RedirectLimit {
        url: current.to_string(),
    })
}

/// Progressive pause between redirect hops, capped at 2s.
fn redirect_pause(hop: usize) -> Duration {
    Duration::from_millis((200 * (hop as u64 + 1)).min(2000))
}

/// Applies the content gate to the final response.
async fn gate_response(response: Response) -> Result<FetchOutcome, CrawlError> {
    let status = response.status();
    let final_url = response.url().clone();

    if status.as_u16() >= 400 {
        return Err(CrawlError::HttpStatus {
            url: final_url.to_string(),
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !is_allowed_content_type(&content_type) {
        return Ok(FetchOutcome::Skipped { content_type });
    }

    let body = read_body_capped(response, MAX_BODY_BYTES)
        .await
        .map_err(|source| CrawlError::Http {
            url: final_url.to_string(),
            source,
        })?;

    Ok(FetchOutcome::Page {
        final_url,
        status: status.as_u16(),
        body,
    })
}

/// Prefix-matches the media type against the parseable set, ignoring any
/// `;`-delimited parameters.
fn is_allowed_content_type(content_type: &str) -> bool {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase();
    ALLOWED_CONTENT_TYPES
        .iter()
        .any(|allowed| media_type.starts_with(allowed))
}

/// Streams the body in, stopping at `cap` bytes.
async fn read_body_capped(mut response: Response, cap: usize) -> reqwest::Result<String> {
    let mut buf: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let remaining = cap - buf.len();
        if chunk.len() >= remaining {
            buf.extend_from_slice(&chunk[..remaining]);
            break;
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
