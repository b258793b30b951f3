//! Heuristic logo classification
//!
//! A stateless scorer that weighs several cues about an image (URL shape,
//! site-name juxtaposition, declared dimensions, alt text, page context)
//! and flags the image as a logo when the total reaches a threshold. The
//! threshold and cue lists come from [`LogoConfig`].

use crate::config::LogoConfig;
use crate::url::site_name;
use regex::Regex;
use url::Url;

/// File extensions that suggest vector or icon artwork.
const LOGO_EXTENSIONS: [&str; 3] = [".ico", ".svg", ".png"];

/// Layout hints that pair with a site name in an image URL.
const SITE_CONTEXT_HINTS: [&str; 5] = ["header", "footer", "navbar", ".svg", ".ico"];

/// Page paths where branding imagery concentrates.
const BRANDED_PAGE_HINTS: [&str; 4] = ["/about", "/contact", "/home", "/index"];

/// Matches filenames like `logo.svg`, `brand-dark.png`, `icon_32.ico`.
const FILENAME_PATTERN: &str =
    r"^.*/(brand|logo|icon|symbol|badge)[-_]?[a-z0-9]*\.(png|jpg|jpeg|gif|svg|ico|webp)$";

/// Matches alt text of the form "<name> logo".
const ALT_PATTERN: &str = r"\b[a-z0-9]+ logo\b";

/// Scores image metadata against logo cues.
#[derive(Debug)]
pub struct LogoDetector {
    config: LogoConfig,
    filename_re: Regex,
    alt_re: Regex,
}

impl LogoDetector {
    pub fn new(config: LogoConfig) -> Self {
        Self {
            config,
            filename_re: Regex::new(FILENAME_PATTERN).expect("static filename pattern"),
            alt_re: Regex::new(ALT_PATTERN).expect("static alt pattern"),
        }
    }

    /// Classifies an image as a probable logo.
    ///
    /// Deterministic and stateless: the same inputs always produce the
    /// same answer. Unknown dimensions are passed as -1 and contribute
    /// nothing. All string comparisons are case-insensitive.
    pub fn classify(
        &self,
        image_url: &str,
        width: i32,
        height: i32,
        alt: Option<&str>,
        page_url: &str,
    ) -> bool {
        let url_lower = image_url.to_ascii_lowercase();
        let page_lower = page_url.to_ascii_lowercase();

        let score = self.url_score(&url_lower)
            + self.site_name_score(&url_lower, page_url)
            + self.dimension_score(width, height)
            + self.alt_score(alt)
            + self.context_score(&url_lower, &page_lower);

        score >= self.config.threshold
    }

    /// Textual cues in the image URL itself, capped at 3.
    fn url_score(&self, url: &str) -> u32 {
        let mut score = 0;
        if self.config.url_tokens.iter().any(|t| url.contains(t.as_str())) {
            score += 1;
        }
        if LOGO_EXTENSIONS.iter().any(|ext| url.ends_with(ext)) {
            score += 1;
        }
        if self
            .config
            .path_segments
            .iter()
            .any(|s| url.contains(s.as_str()))
        {
            score += 1;
        }
        if self.filename_re.is_match(url) {
            score += 2;
        }
        score.min(3)
    }

    /// Juxtaposition of the page's site name with a logo token.
    fn site_name_score(&self, url: &str, page_url: &str) -> u32 {
        let Some(site) = Url::parse(page_url)
            .ok()
            .and_then(|u| u.host_str().map(site_name))
        else {
            return 0;
        };
        let site = site.to_ascii_lowercase();
        if site.len() <= 3 {
            return 0;
        }

        for term in &self.config.url_tokens {
            let joined = [
                format!("{site}-{term}"),
                format!("{site}_{term}"),
                format!("{site}{term}"),
                format!("{term}-{site}"),
                format!("{term}_{site}"),
                format!("{term}{site}"),
            ];
            if joined.iter().any(|j| url.contains(j.as_str())) {
                return 3;
            }
        }

        if url.contains(&site) && SITE_CONTEXT_HINTS.iter().any(|h| url.contains(h)) {
            return 2;
        }

        0
    }

    /// Dimension cues, capped at 2; nothing when either side is unknown.
    fn dimension_score(&self, width: i32, height: i32) -> u32 {
        if width <= 0 || height <= 0 {
            return 0;
        }

        let mut score = 0;
        let long = f64::from(width.max(height));
        let short = f64::from(width.min(height));
        if long / short <= 1.5 {
            score += 1;
        }
        if self.config.icon_sizes.contains(&width) || self.config.icon_sizes.contains(&height) {
            score += 1;
        }
        if width < 300 && height < 300 {
            score += 1;
        }
        score.min(2)
    }

    fn alt_score(&self, alt: Option<&str>) -> u32 {
        let Some(alt) = alt else {
            return 0;
        };
        let alt = alt.to_ascii_lowercase();

        let mut score = 0;
        if self.config.url_tokens.iter().any(|t| alt.contains(t.as_str())) {
            score += 2;
        }
        if self.alt_re.is_match(&alt) {
            score += 3;
        }
        score
    }

    fn context_score(&self, url: &str, page_url: &str) -> u32 {
        let mut score = 0;
        if url.contains("/header/") || url.contains("/footer/") {
            score += 1;
        }
        if BRANDED_PAGE_HINTS.iter().any(|h| page_url.contains(h)) {
            score += 1;
        }
        score
    }
}

impl Default for LogoDetector {
    fn default() -> Self {
        Self::new(LogoConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "https://example.com/";

    #[test]
    fn test_named_logo_with_dimensions_and_alt() {
        let detector = LogoDetector::default();
        assert!(detector.classify(
            "https://example.com/logo.svg",
            64,
            64,
            Some("Example logo"),
            PAGE
        ));
    }

    #[test]
    fn test_brand_path_alone_suffices() {
        // Path segment, extension, and token cues already clear the threshold
        let detector = LogoDetector::default();
        assert!(detector.classify(
            "https://cdn.foo.com/assets/brand/foo-logo.svg",
            -1,
            -1,
            None,
            PAGE
        ));
    }

    #[test]
    fn test_photo_is_not_a_logo() {
        let detector = LogoDetector::default();
        assert!(!detector.classify(
            "https://example.com/photos/vacation.jpg",
            1600,
            900,
            Some("Beach at sunset"),
            PAGE
        ));
    }

    #[test]
    fn test_filename_pattern_bonus() {
        let detector = LogoDetector::default();
        // `/logo-dark.png` matches the filename pattern on top of token and
        // extension cues
        assert!(detector.classify("https://example.com/logo-dark.png", -1, -1, None, PAGE));
    }

    #[test]
    fn test_site_name_juxtaposition() {
        let detector = LogoDetector::default();
        // No logo-ish path or extension, but "acme-logo" pairs the site name
        // with a token
        assert!(detector.classify(
            "https://cdn.example.net/f/acme-logo.jpeg",
            -1,
            -1,
            None,
            "https://www.acme.com/about"
        ));
    }

    #[test]
    fn test_site_name_with_layout_hint() {
        let detector = LogoDetector::default();
        // "acmecorp" + "header" scores 2
        assert!(detector.classify(
            "https://example.com/header/acmecorp.jpeg",
            -1,
            -1,
            None,
            "https://acmecorp.com/"
        ));
    }

    #[test]
    fn test_unknown_dimensions_contribute_nothing() {
        let detector = LogoDetector::default();
        // Dimension cues alone would score 2; with unknowns the total is 0
        assert!(!detector.classify("https://example.com/mystery.jpeg", -1, -1, None, PAGE));
        assert!(!detector.classify("https://example.com/mystery.jpeg", 64, -1, None, PAGE));
        assert!(detector.classify("https://example.com/mystery.jpeg", 64, 64, None, PAGE));
    }

    #[test]
    fn test_alt_text_phrase() {
        let detector = LogoDetector::default();
        // "acme logo" matches the alt phrase pattern (+3) and contains the
        // token (+2)
        assert!(detector.classify(
            "https://example.com/img/a.jpeg",
            -1,
            -1,
            Some("The Acme logo"),
            PAGE
        ));
    }

    #[test]
    fn test_page_context_cues() {
        let detector = LogoDetector::default();
        // /footer/ in the image URL plus /about in the page URL
        assert!(detector.classify(
            "https://example.com/footer/mark.jpeg",
            -1,
            -1,
            None,
            "https://example.com/about"
        ));
    }

    #[test]
    fn test_deterministic() {
        let detector = LogoDetector::default();
        let first = detector.classify("https://example.com/logo.png", 32, 32, None, PAGE);
        for _ in 0..10 {
            assert_eq!(
                first,
                detector.classify("https://example.com/logo.png", 32, 32, None, PAGE)
            );
        }
    }

    #[test]
    fn test_threshold_is_configurable() {
        let strict = LogoDetector::new(LogoConfig {
            threshold: 6,
            ..LogoConfig::default()
        });
        // URL cues alone cap at 3 and no longer clear a threshold of 6
        assert!(!strict.classify(
            "https://cdn.foo.com/assets/brand/foo-logo.svg",
            -1,
            -1,
            None,
            PAGE
        ));
    }
}
