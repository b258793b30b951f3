use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub logo: LogoConfig,
}

/// Crawl budget configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Hard ceiling on pages fetched in one session
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: usize,

    /// Number of concurrent workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Politeness delay between a worker's requests (milliseconds),
    /// overridden by a larger robots.txt crawl delay
    #[serde(rename = "crawl-delay-ms", default = "default_crawl_delay_ms")]
    pub crawl_delay_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            workers: default_workers(),
            crawl_delay_ms: default_crawl_delay_ms(),
        }
    }
}

fn default_max_pages() -> usize {
    100
}

fn default_workers() -> usize {
    8
}

fn default_crawl_delay_ms() -> u64 {
    200
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler; doubles as the robots.txt agent token
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,
}

impl UserAgentConfig {
    /// Full User-Agent header value, `name/version`.
    pub fn header(&self) -> String {
        format!("{}/{}", self.crawler_name, self.crawler_version)
    }

    /// The bare agent token robots.txt groups are matched against.
    pub fn robots_token(&self) -> &str {
        &self.crawler_name
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
        }
    }
}

fn default_crawler_name() -> String {
    "Eulerity-Crawler".to_string()
}

fn default_crawler_version() -> String {
    "1.0".to_string()
}

/// Tuning knobs for the logo classifier
#[derive(Debug, Clone, Deserialize)]
pub struct LogoConfig {
    /// Minimum total cue score for an image to count as a logo
    #[serde(default = "default_logo_threshold")]
    pub threshold: u32,

    /// Tokens whose presence in a URL or alt text suggests a logo
    #[serde(rename = "url-tokens", default = "default_url_tokens")]
    pub url_tokens: Vec<String>,

    /// Path fragments where sites keep their branding assets
    #[serde(rename = "path-segments", default = "default_path_segments")]
    pub path_segments: Vec<String>,

    /// Common icon edge lengths in pixels
    #[serde(rename = "icon-sizes", default = "default_icon_sizes")]
    pub icon_sizes: Vec<i32>,
}

impl Default for LogoConfig {
    fn default() -> Self {
        Self {
            threshold: default_logo_threshold(),
            url_tokens: default_url_tokens(),
            path_segments: default_path_segments(),
            icon_sizes: default_icon_sizes(),
        }
    }
}

fn default_logo_threshold() -> u32 {
    2
}

fn default_url_tokens() -> Vec<String> {
    [
        "logo",
        "brand",
        "icon",
        "badge",
        "symbol",
        "emblem",
        "trademark",
        "logotype",
        "identity",
        "branding",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_path_segments() -> Vec<String> {
    [
        "/img/logo",
        "/images/logo",
        "/assets/logo",
        "/static/logo",
        "/assets/brand",
        "/img/brand",
        "/images/brand",
        "/icons/",
        "/logos/",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_icon_sizes() -> Vec<i32> {
    vec![16, 32, 48, 64, 96, 128, 192, 256]
}
