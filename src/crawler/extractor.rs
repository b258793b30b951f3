//! HTML extraction
//!
//! Pulls image candidates and outbound links out of a fetched page in one
//! synchronous pass. The parse is tolerant of malformed markup; whatever
//! the parser can recover is inspected. Deduplication is the
//! coordinator's job.

use scraper::{Html, Selector};
use url::Url;

/// Attributes lazy-loading schemes stash image URLs in.
const LAZY_ATTRS: [&str; 5] = [
    "data-src",
    "data-original",
    "data-lazy-src",
    "data-srcset",
    "data-lazy",
];

/// File extensions treated as direct image references.
const IMAGE_EXTENSIONS: [&str; 8] = [
    ".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg", ".bmp", ".ico",
];

/// An image reference found on a page, with whatever metadata the source
/// element declared.
#[derive(Debug, Clone)]
pub struct ImageCandidate {
    /// Absolute (not yet canonical) image URL.
    pub url: String,
    /// Alt text, when present and non-empty.
    pub alt: Option<String>,
    /// Declared width, -1 when absent or non-numeric.
    pub width: i32,
    /// Declared height, -1 when absent or non-numeric.
    pub height: i32,
}

impl ImageCandidate {
    /// A candidate from a source that carries no element metadata.
    fn bare(url: String) -> Self {
        Self {
            url,
            alt: None,
            width: -1,
            height: -1,
        }
    }
}

/// Everything extracted from one page.
#[derive(Debug, Default)]
pub struct ExtractedPage {
    pub images: Vec<ImageCandidate>,
    pub links: Vec<String>,
}

/// Parses `html` and extracts image candidates and outbound links,
/// resolving relative references against `base`.
pub fn extract_page(html: &str, base: &Url) -> ExtractedPage {
    let document = Html::parse_document(html);
    let mut page = ExtractedPage::default();

    collect_img_elements(&document, base, &mut page.images);
    collect_style_backgrounds(&document, base, &mut page.images);
    collect_linked_images(&document, base, &mut page.images);
    collect_links(&document, base, &mut page.links);

    page
}

/// `<img>` elements: `src`, lazy-loading attributes, then `srcset`.
fn collect_img_elements(document: &Html, base: &Url, images: &mut Vec<ImageCandidate>) {
    let Ok(selector) = Selector::parse("img") else {
        return;
    };

    for element in document.select(&selector) {
        let value = element.value();
        let alt = value
            .attr("alt")
            .filter(|alt| !alt.is_empty())
            .map(str::to_string);
        let width = parse_dimension(value.attr("width"));
        let height = parse_dimension(value.attr("height"));

        let mut candidates: Vec<String> = Vec::new();

        if let Some(src) = value.attr("src") {
            if let Some(resolved) = resolve(base, src) {
                candidates.push(resolved);
            }
        }

        for attr in LAZY_ATTRS {
            if let Some(lazy) = value.attr(attr) {
                if let Some(resolved) = resolve(base, lazy) {
                    candidates.push(resolved);
                }
            }
        }

        if let Some(srcset) = value.attr("srcset") {
            candidates.extend(srcset_urls(srcset, base));
        }

        for url in candidates {
            images.push(ImageCandidate {
                url,
                alt: alt.clone(),
                width,
                height,
            });
        }
    }
}

/// Splits a `srcset` attribute into its URLs, dropping the descriptor
/// after each URL's whitespace.
fn srcset_urls(srcset: &str, base: &Url) -> Vec<String> {
    srcset
        .split(',')
        .filter_map(|part| part.trim().split_whitespace().next())
        .filter_map(|candidate| resolve(base, candidate))
        .collect()
}

/// Elements styled with `background-image: url(...)`.
fn collect_style_backgrounds(document: &Html, base: &Url, images: &mut Vec<ImageCandidate>) {
    let Ok(selector) = Selector::parse("[style]") else {
        return;
    };

    for element in document.select(&selector) {
        let Some(style) = element.value().attr("style") else {
            continue;
        };
        if !style.contains("background-image") {
            continue;
        }
        if let Some(url) = style_background_url(style) {
            if let Some(resolved) = resolve(base, &url) {
                images.push(ImageCandidate::bare(resolved));
            }
        }
    }
}

/// Pulls the first `url(...)` token out of a style attribute, stripping
/// matched surrounding quotes.
fn style_background_url(style: &str) -> Option<String> {
    let start = style.find("url(")? + 4;
    let end = style[start..].find(')')? + start;
    let mut url = style[start..end].trim();

    if url.len() >= 2
        && ((url.starts_with('"') && url.ends_with('"'))
            || (url.starts_with('\'') && url.ends_with('\'')))
    {
        url = &url[1..url.len() - 1];
    }

    if url.is_empty() || url.starts_with("data:") {
        return None;
    }

    // Accept absolute and site-relative forms only
    if url.starts_with("http")
        || url.starts_with('/')
        || url.starts_with("./")
        || url.starts_with("../")
    {
        Some(url.to_string())
    } else {
        None
    }
}

/// `<a>` elements whose target is itself an image file.
fn collect_linked_images(document: &Html, base: &Url, images: &mut Vec<ImageCandidate>) {
    let Ok(selector) = Selector::parse("a[href]") else {
        return;
    };

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(resolved) = resolve(base, href) else {
            continue;
        };
        if has_image_extension(&resolved) {
            images.push(ImageCandidate::bare(resolved));
        }
    }
}

/// Outbound links worth crawling: anchors, iframes, form targets.
fn collect_links(document: &Html, base: &Url, links: &mut Vec<String>) {
    let sources = [
        ("a[href]", "href"),
        ("iframe[src]", "src"),
        ("form[action]", "action"),
    ];

    for (selector_source, attr) in sources {
        let Ok(selector) = Selector::parse(selector_source) else {
            continue;
        };
        for element in document.select(&selector) {
            let Some(value) = element.value().attr(attr) else {
                continue;
            };
            let Some(resolved) = resolve(base, value) else {
                continue;
            };
            if has_image_extension(&resolved) {
                // Image links were already captured as image candidates
                continue;
            }
            links.push(resolved);
        }
    }
}

/// Resolves a reference against the page base, filtering out schemes the
/// crawler never follows.
fn resolve(base: &Url, reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    if reference.starts_with("javascript:")
        || reference.starts_with("mailto:")
        || reference.starts_with("tel:")
        || reference.starts_with("data:")
        || reference.starts_with('#')
    {
        return None;
    }

    let resolved = base.join(reference).ok()?;
    if resolved.scheme() == "http" || resolved.scheme() == "https" {
        Some(resolved.to_string())
    } else {
        None
    }
}

/// Whether a URL ends in a known image extension (case-insensitive).
pub fn has_image_extension(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

fn parse_dimension(value: Option<&str>) -> i32 {
    value
        .and_then(|v| v.trim().parse::<i32>().ok())
        .unwrap_or(-1)
}
