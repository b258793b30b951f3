use crate::state::ImageRecord;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Admission bookkeeping: the visited set and the work queue.
///
/// Both live under one mutex so "not yet visited implies enqueue" is a
/// single critical section; a URL can never be queued or fetched twice.
#[derive(Debug, Default)]
struct Frontier {
    visited: HashSet<String>,
    queue: VecDeque<String>,
}

/// Image results, insertion-ordered.
#[derive(Debug, Default)]
struct ImageStore {
    order: Vec<String>,
    records: HashMap<String, ImageRecord>,
}

/// State shared by every worker of one crawl session.
#[derive(Debug, Default)]
pub struct CrawlState {
    frontier: Mutex<Frontier>,
    images: Mutex<ImageStore>,
    pages_processed: AtomicUsize,
    in_flight: AtomicUsize,
    running: AtomicBool,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all session data ahead of a fresh crawl.
    pub fn reset(&self) {
        {
            let mut frontier = self.frontier.lock();
            frontier.visited.clear();
            frontier.queue.clear();
        }
        {
            let mut images = self.images.lock();
            images.order.clear();
            images.records.clear();
        }
        self.pages_processed.store(0, Ordering::SeqCst);
        self.in_flight.store(0, Ordering::SeqCst);
    }

    /// Admits a canonical URL: inserts it into the visited set and the
    /// queue, unless it was already admitted or the page budget is spent.
    pub fn try_admit(&self, canonical: &str, max_pages: usize) -> bool {
        let mut frontier = self.frontier.lock();
        if self.pages_processed.load(Ordering::SeqCst) >= max_pages {
            return false;
        }
        if frontier.visited.contains(canonical) {
            return false;
        }
        frontier.visited.insert(canonical.to_string());
        frontier.queue.push_back(canonical.to_string());
        true
    }

    /// Takes the next queued URL, marking it in flight.
    pub fn next_url(&self) -> Option<String> {
        let mut frontier = self.frontier.lock();
        let url = frontier.queue.pop_front();
        if url.is_some() {
            self.in_flight.fetch_add(1, Ordering::SeqCst);
        }
        url
    }

    /// Marks a dequeued URL's processing as finished.
    pub fn finish_url(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    /// Whether the session has drained: nothing queued, nothing in flight.
    pub fn is_drained(&self) -> bool {
        let frontier = self.frontier.lock();
        frontier.queue.is_empty() && self.in_flight.load(Ordering::SeqCst) == 0
    }

    /// Adds a redirect target to the visited set outside of admission.
    pub fn mark_visited(&self, canonical: &str) {
        self.frontier.lock().visited.insert(canonical.to_string());
    }

    pub fn is_visited(&self, canonical: &str) -> bool {
        self.frontier.lock().visited.contains(canonical)
    }

    pub fn visited_snapshot(&self) -> HashSet<String> {
        self.frontier.lock().visited.clone()
    }

    pub fn queue_len(&self) -> usize {
        self.frontier.lock().queue.len()
    }

    /// Records an image on first sighting.
    ///
    /// The record is built only when the URL is new; later sightings leave
    /// the stored record untouched. Returns whether the image was new.
    pub fn record_image<F>(&self, canonical: &str, build: F) -> bool
    where
        F: FnOnce() -> ImageRecord,
    {
        let mut images = self.images.lock();
        if images.records.contains_key(canonical) {
            return false;
        }
        images.order.push(canonical.to_string());
        let record = build();
        images.records.insert(canonical.to_string(), record);
        true
    }

    pub fn image_count(&self) -> usize {
        self.images.lock().order.len()
    }

    /// Image URLs in first-sighting order plus their records.
    pub fn image_results(&self) -> (Vec<String>, HashMap<String, ImageRecord>) {
        let images = self.images.lock();
        (images.order.clone(), images.records.clone())
    }

    /// Counts a page against the budget; returns the new total.
    ///
    /// The ceiling is best-effort: concurrent workers may push the count
    /// past the maximum by at most the worker count.
    pub fn begin_page(&self) -> usize {
        self.pages_processed.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn pages_processed(&self) -> usize {
        self.pages_processed.load(Ordering::SeqCst)
    }

    /// Flips the running flag on; returns false when a crawl already runs.
    pub fn try_start(&self) -> bool {
        !self.running.swap(true, Ordering::SeqCst)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
