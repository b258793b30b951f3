//! Crawler module
//!
//! The core crawling machinery: the HTTP fetch pipeline, HTML extraction,
//! and the coordinator that ties them to the shared session state.

mod coordinator;
mod extractor;
mod fetcher;

pub use coordinator::{CrawlResult, Crawler};
pub use extractor::{extract_page, has_image_extension, ExtractedPage, ImageCandidate};
pub use fetcher::{build_http_client, fetch_page, FetchOutcome, MAX_BODY_BYTES};

use crate::config::Config;
use crate::Result;

/// Convenience entry point: runs one crawl session for `seed`.
///
/// # Arguments
///
/// * `seed` - The starting URL; its host bounds the crawl
/// * `config` - Crawl budget, user agent, and logo tuning
pub async fn crawl(seed: &str, config: Config) -> Result<CrawlResult> {
    let crawler = Crawler::new(seed, config)?;
    Ok(crawler.crawl().await)
}
