//! Crawl coordination
//!
//! Owns one crawl session: the worker pool, the admission rules, the
//! shared visited set and image store, the stop signal, and completion
//! detection. Per-URL failures are logged and skipped; only the caller's
//! own cancellation ends a session early.

use crate::config::Config;
use crate::crawler::extractor::{self, ImageCandidate};
use crate::crawler::fetcher::{self, FetchOutcome};
use crate::logo::LogoDetector;
use crate::robots::{self, RobotsPolicy};
use crate::state::{CrawlState, ImageRecord};
use crate::url::{canonicalize, url_depth, Site};
use crate::Result;
use rand::Rng;
use reqwest::Client;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use url::Url;

/// Paths deeper than this are never admitted.
const MAX_URL_DEPTH: usize = 20;

/// How long an idle worker waits before rechecking for completion.
const IDLE_WAIT: Duration = Duration::from_secs(1);

/// Upper bound on the random politeness jitter after each page.
const POLITENESS_JITTER_MS: u64 = 200;

/// The accumulated output of one crawl session.
#[derive(Debug)]
pub struct CrawlResult {
    /// Canonical image URLs in first-sighting order.
    pub images: Vec<String>,
    /// Metadata per image URL.
    pub metadata: HashMap<String, ImageRecord>,
}

/// A single-site crawl session.
///
/// Observers ([`pages_processed`](Self::pages_processed),
/// [`visited_snapshot`](Self::visited_snapshot),
/// [`is_running`](Self::is_running)) and [`stop`](Self::stop) may be called
/// from other tasks while [`crawl`](Self::crawl) runs.
pub struct Crawler {
    inner: Arc<Inner>,
}

struct Inner {
    config: Config,
    seed: Url,
    site: Site,
    client: Client,
    logo: LogoDetector,
    robots: OnceCell<Arc<RobotsPolicy>>,
    state: CrawlState,
}

impl Crawler {
    /// Creates a session for `seed` with the given configuration.
    ///
    /// The seed is canonicalized immediately; the canonical form's scheme
    /// and host bound the whole crawl.
    pub fn new(seed: &str, config: Config) -> Result<Self> {
        let seed = canonicalize(seed)?;
        let site = Site::from_url(&seed)?;
        let client = fetcher::build_http_client(&config.user_agent.header())?;
        let logo = LogoDetector::new(config.logo.clone());

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                seed,
                site,
                client,
                logo,
                robots: OnceCell::new(),
                state: CrawlState::new(),
            }),
        })
    }

    /// Runs the crawl to completion and returns the image set.
    ///
    /// Blocks until the page budget is spent, the frontier drains, or a
    /// [`stop`](Self::stop) has been observed by every worker. If a crawl
    /// is already in flight on this session, returns the images it has
    /// accumulated so far instead of starting another.
    pub async fn crawl(&self) -> CrawlResult {
        let inner = &self.inner;

        if !inner.state.try_start() {
            let (images, metadata) = inner.state.image_results();
            return CrawlResult { images, metadata };
        }

        inner.state.reset();

        // One robots fetch per session, before anything is admitted
        let policy = inner
            .robots
            .get_or_init(|| async {
                Arc::new(robots::fetch_policy(&inner.seed, &inner.config.user_agent.header()).await)
            })
            .await
            .clone();

        inner.admit(&policy, inner.seed.as_str());

        tracing::info!(
            "Starting crawl of {} (max_pages={}, workers={}, delay={}ms)",
            inner.seed,
            inner.config.crawler.max_pages,
            inner.config.crawler.workers,
            inner.config.crawler.crawl_delay_ms
        );

        let mut handles = Vec::with_capacity(inner.config.crawler.workers);
        for worker_id in 0..inner.config.crawler.workers {
            let inner = Arc::clone(inner);
            let policy = Arc::clone(&policy);
            handles.push(tokio::spawn(async move {
                inner.worker_loop(worker_id, &policy).await;
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!("Worker task failed: {e}");
            }
        }

        inner.state.set_running(false);

        let (images, metadata) = inner.state.image_results();
        tracing::info!(
            "Crawl finished: {} pages processed, {} images found",
            inner.state.pages_processed(),
            images.len()
        );
        CrawlResult { images, metadata }
    }

    /// Requests cooperative termination; in-flight fetches may complete.
    pub fn stop(&self) {
        self.inner.state.set_running(false);
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.is_running()
    }

    /// Pages counted against the budget so far.
    pub fn pages_processed(&self) -> usize {
        self.inner.state.pages_processed()
    }

    /// A copy of the visited set at this moment.
    pub fn visited_snapshot(&self) -> HashSet<String> {
        self.inner.state.visited_snapshot()
    }

    /// The session's logo classifier, also usable standalone.
    pub fn logo_detector(&self) -> &LogoDetector {
        &self.inner.logo
    }
}

impl Inner {
    async fn worker_loop(&self, worker_id: usize, policy: &RobotsPolicy) {
        let max_pages = self.config.crawler.max_pages;

        while self.state.is_running() && self.state.pages_processed() < max_pages {
            let Some(url) = self.state.next_url() else {
                // Nothing queued; wait a beat, then exit once no peer can
                // still enqueue new work
                tokio::time::sleep(IDLE_WAIT).await;
                if self.state.is_drained() {
                    break;
                }
                continue;
            };

            // The ceiling is best-effort: this page is processed even when
            // the increment lands past it
            self.state.begin_page();
            self.process_page(policy, &url).await;
            self.state.finish_url();

            let delay = policy.crawl_delay_ms(
                self.config.user_agent.robots_token(),
                self.config.crawler.crawl_delay_ms,
            ) + rand::thread_rng().gen_range(0..POLITENESS_JITTER_MS);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        tracing::debug!("Worker {worker_id} exiting");
    }

    async fn process_page(&self, policy: &RobotsPolicy, url_str: &str) {
        let Ok(url) = Url::parse(url_str) else {
            return;
        };

        let outcome = match fetcher::fetch_page(&self.client, &url).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("Error processing {url}: {e}");
                return;
            }
        };

        let (final_url, body) = match outcome {
            FetchOutcome::Page {
                final_url, body, ..
            } => (final_url, body),
            FetchOutcome::Skipped { content_type } => {
                tracing::debug!("Skipping {url} (content type: {content_type:?})");
                return;
            }
        };

        let Ok(canonical_final) = canonicalize(final_url.as_str()) else {
            return;
        };

        if canonical_final.as_str() != url_str {
            // The fetch was redirected; the target counts as visited too
            self.state.mark_visited(canonical_final.as_str());
            if !self.site.contains(&canonical_final) {
                tracing::debug!("Skipping {url} (redirected off-site to {canonical_final})");
                return;
            }
        }

        let page = extractor::extract_page(&body, &final_url);

        for candidate in page.images {
            self.insert_image(candidate, canonical_final.as_str());
        }
        for link in page.links {
            self.admit(policy, &link);
        }
    }

    /// Decides whether a discovered URL joins the frontier.
    ///
    /// Order matters: scheme gate, depth cap, canonicalization, site
    /// scope, robots policy, then the locked check-and-enqueue.
    fn admit(&self, policy: &RobotsPolicy, raw: &str) {
        if raw.is_empty() {
            return;
        }

        let Ok(parsed) = Url::parse(raw) else {
            return;
        };
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return;
        }

        if url_depth(&parsed) > MAX_URL_DEPTH {
            tracing::debug!("Skipping {raw} (path too deep)");
            return;
        }

        let Ok(canonical) = canonicalize(raw) else {
            return;
        };

        if !self.site.contains(&canonical) {
            return;
        }

        if !policy.is_allowed(canonical.path(), self.config.user_agent.robots_token()) {
            tracing::debug!("Skipping {canonical} (disallowed by robots.txt)");
            return;
        }

        self.state
            .try_admit(canonical.as_str(), self.config.crawler.max_pages);
    }

    /// Records an image candidate, classifying it on first sighting only.
    fn insert_image(&self, candidate: ImageCandidate, page_url: &str) {
        if candidate.url.is_empty() || candidate.url.starts_with("data:") {
            return;
        }

        let Ok(canonical) = canonicalize(&candidate.url) else {
            return;
        };
        let canonical = canonical.to_string();

        self.state.record_image(&canonical, || {
            let is_logo = self.logo.classify(
                &canonical,
                candidate.width,
                candidate.height,
                candidate.alt.as_deref(),
                page_url,
            );
            ImageRecord {
                url: canonical.clone(),
                page_found: page_url.to_string(),
                alt_text: candidate.alt.clone(),
                width: candidate.width,
                height: candidate.height,
                is_logo,
            }
        });
    }
}
