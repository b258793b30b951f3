//! Shared crawl-session state
//!
//! Everything here is shared by all workers of one crawl session and must
//! tolerate concurrent access.

mod crawl_state;
mod image_record;

pub use crawl_state::CrawlState;
pub use image_record::ImageRecord;
