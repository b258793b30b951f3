use crate::{UrlError, UrlResult};
use url::Url;

/// Strips a leading `www.` label from a host name.
pub fn normalize_host(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Derives the short site name used for brand matching.
///
/// Strips a leading `www.`, removes the terminal TLD label, and if the
/// remaining tail is a 2-3 character label (a `co.uk`-style suffix), strips
/// one more. `www.a.example.co.uk` becomes `a.example`.
pub fn site_name(host: &str) -> String {
    let host = normalize_host(host);
    let mut labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return host.to_string();
    }

    labels.pop();
    if labels.len() > 1 {
        if let Some(last) = labels.last() {
            if (2..=3).contains(&last.len()) {
                labels.pop();
            }
        }
    }

    labels.join(".")
}

/// Identity of a crawl session's site: one scheme and one host.
///
/// Every admitted page must match both; `www.` variants of the host are
/// treated as interchangeable.
#[derive(Debug, Clone)]
pub struct Site {
    scheme: String,
    host: String,
}

impl Site {
    /// Builds the site identity from a canonical seed URL.
    pub fn from_url(url: &Url) -> UrlResult<Self> {
        let host = url.host_str().ok_or(UrlError::MissingHost)?;
        Ok(Self {
            scheme: url.scheme().to_string(),
            host: normalize_host(host).to_string(),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Whether `url` belongs to this site (same scheme, same stripped host).
    pub fn contains(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        url.scheme() == self.scheme && normalize_host(host) == self.host
    }
}

/// Counts the `/` separators in a URL's path; the root counts as zero.
pub fn url_depth(url: &Url) -> usize {
    let path = url.path();
    if path.is_empty() || path == "/" {
        return 0;
    }
    path.chars().filter(|&c| c == '/').count()
}
