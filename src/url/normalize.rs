use crate::UrlError;
use url::Url;

/// Tracking query parameters removed during canonicalization
/// (matched case-insensitively by name).
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "msclkid",
    "ref",
    "source",
    "session",
    "timestamp",
];

/// Index document basenames collapsed onto their containing directory.
const INDEX_BASENAMES: &[&str] = &["index", "default", "home"];

/// Extensions an index document may carry.
const INDEX_EXTENSIONS: &[&str] = &["html", "php", "asp", "jsp"];

/// Canonicalizes a URL into the form used for equality and deduplication
///
/// # Normalization Steps
///
/// 1. Prefix `https://` when the input has no scheme; reject non-HTTP(S) schemes
/// 2. Lowercase the host and strip a leading `www.`
/// 3. Elide default ports (80/443)
/// 4. Collapse index documents (`index.html`, `default.php`, ...) onto their directory
/// 5. Drop the trailing slash except for the root path
/// 6. Remove the fragment
/// 7. Remove tracking query parameters, keeping the rest in original order
///
/// # Arguments
///
/// * `raw` - The URL string to canonicalize
///
/// # Returns
///
/// * `Ok(Url)` - The canonical URL
/// * `Err(UrlError)` - The input could not be parsed or uses a foreign scheme
///
/// # Examples
///
/// ```
/// use imagefinder::url::canonicalize;
///
/// let url = canonicalize("https://www.example.com/docs/index.html?utm_source=x").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/docs");
/// ```
pub fn canonicalize(raw: &str) -> Result<Url, UrlError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UrlError::Malformed("empty URL".to_string()));
    }

    let mut url = match Url::parse(raw) {
        Ok(url) => url,
        // A bare "host/path" input only parses relative to a base
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("https://{raw}")).map_err(|e| UrlError::Parse(e.to_string()))?
        }
        Err(e) => return Err(UrlError::Parse(e.to_string())),
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = url
        .host_str()
        .ok_or(UrlError::MissingHost)?
        .to_lowercase();
    if let Some(stripped) = host.strip_prefix("www.") {
        let stripped = stripped.to_string();
        url.set_host(Some(&stripped))
            .map_err(|e| UrlError::Malformed(format!("failed to set host: {e}")))?;
    }

    let path = normalize_path(url.path());
    url.set_path(&path);

    url.set_fragment(None);

    let cleaned = url.query().map(clean_query);
    if let Some(cleaned) = cleaned {
        match cleaned {
            Some(kept) => url.set_query(Some(&kept)),
            None => url.set_query(None),
        }
    }

    Ok(url)
}

/// Collapses index documents and trims the trailing slash.
fn normalize_path(path: &str) -> String {
    let mut path = if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    };

    if let Some(slash) = path.rfind('/') {
        if is_index_document(&path[slash + 1..]) {
            path.truncate(slash + 1);
        }
    }

    if path.len() > 1 && path.ends_with('/') {
        path.pop();
    }

    path
}

fn is_index_document(file: &str) -> bool {
    match file.split_once('.') {
        Some((base, ext)) => INDEX_BASENAMES.contains(&base) && INDEX_EXTENSIONS.contains(&ext),
        None => false,
    }
}

/// Drops tracking parameters from a raw query string, preserving the
/// original order and encoding of everything kept.
fn clean_query(query: &str) -> Option<String> {
    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let name = pair.split_once('=').map(|(name, _)| name).unwrap_or(pair);
            !is_tracking_param(name)
        })
        .collect();

    if kept.is_empty() {
        None
    } else {
        Some(kept.join("&"))
    }
}

fn is_tracking_param(name: &str) -> bool {
    TRACKING_PARAMS.iter().any(|p| p.eq_ignore_ascii_case(name))
}
