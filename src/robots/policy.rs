//! Robots.txt policy: parsed directives and per-path decisions.

use regex::Regex;
use std::collections::{HashMap, HashSet};

/// The wildcard agent group every crawler falls back to.
const WILDCARD_AGENT: &str = "*";

/// One robots.txt path pattern, compiled for matching.
///
/// `*` matches any run of characters; `?` and `.` are literal. Patterns
/// anchor at the start of the path and match any prefix unless the raw
/// pattern ended with `$`, which anchors to the end.
#[derive(Debug, Clone)]
struct PathPattern {
    regex: Regex,
}

impl PathPattern {
    fn compile(pattern: &str) -> Option<Self> {
        let (body, anchored) = match pattern.strip_suffix('$') {
            Some(stripped) => (stripped, true),
            None => (pattern, false),
        };

        let mut source = String::from("^");
        for ch in body.chars() {
            if ch == '*' {
                source.push_str(".*");
            } else {
                source.push_str(&regex::escape(ch.encode_utf8(&mut [0; 4])));
            }
        }
        if anchored {
            source.push('$');
        }

        Regex::new(&source).ok().map(|regex| Self { regex })
    }

    fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

/// Parsed robots state for one host.
///
/// Immutable after construction. `fetch_failed` means the file could not
/// be retrieved and the host is treated as fully permissive.
#[derive(Debug, Default)]
pub struct RobotsPolicy {
    agents: HashSet<String>,
    disallow: HashMap<String, Vec<PathPattern>>,
    allow: HashMap<String, Vec<PathPattern>>,
    crawl_delays_ms: HashMap<String, u64>,
    fetch_failed: bool,
}

impl RobotsPolicy {
    /// A policy that allows everything, used when robots.txt is unreachable.
    pub fn permissive() -> Self {
        Self {
            fetch_failed: true,
            ..Self::default()
        }
    }

    /// Parses robots.txt content into a policy.
    ///
    /// Lines are trimmed; blanks and `#` comments are skipped. Directives
    /// attach to the most recent `User-agent:` group, and successive
    /// `User-agent:` lines share the directives that follow them.
    pub fn from_content(content: &str) -> Self {
        let mut policy = Self::default();
        let mut group: Vec<String> = Vec::new();
        let mut in_agent_run = false;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    if !in_agent_run {
                        group.clear();
                    }
                    let agent = value.to_ascii_lowercase();
                    policy.agents.insert(agent.clone());
                    group.push(agent);
                    in_agent_run = true;
                }
                "disallow" => {
                    in_agent_run = false;
                    if value.is_empty() {
                        continue;
                    }
                    if let Some(pattern) = PathPattern::compile(value) {
                        for agent in &group {
                            policy
                                .disallow
                                .entry(agent.clone())
                                .or_default()
                                .push(pattern.clone());
                        }
                    }
                }
                "allow" => {
                    in_agent_run = false;
                    if value.is_empty() {
                        continue;
                    }
                    if let Some(pattern) = PathPattern::compile(value) {
                        for agent in &group {
                            policy
                                .allow
                                .entry(agent.clone())
                                .or_default()
                                .push(pattern.clone());
                        }
                    }
                }
                "crawl-delay" => {
                    in_agent_run = false;
                    if let Ok(seconds) = value.parse::<u64>() {
                        for agent in &group {
                            policy.crawl_delays_ms.insert(agent.clone(), seconds * 1000);
                        }
                    }
                }
                _ => {
                    in_agent_run = false;
                }
            }
        }

        policy
    }

    /// Whether the robots.txt fetch failed (policy is fully permissive).
    pub fn fetch_failed(&self) -> bool {
        self.fetch_failed
    }

    /// Decides whether `path` may be fetched on behalf of `agent`.
    ///
    /// Consults the rule group for the agent if one exists, otherwise the
    /// `*` group, otherwise allows. Within a group the path is allowed when
    /// some Allow pattern matches or no Disallow pattern does; Allow wins.
    pub fn is_allowed(&self, path: &str, agent: &str) -> bool {
        if self.fetch_failed {
            return true;
        }

        let agent = agent.to_ascii_lowercase();
        let group = if self.agents.contains(agent.as_str()) {
            agent.as_str()
        } else if self.agents.contains(WILDCARD_AGENT) {
            WILDCARD_AGENT
        } else {
            return true;
        };

        if let Some(allows) = self.allow.get(group) {
            if allows.iter().any(|p| p.matches(path)) {
                return true;
            }
        }

        match self.disallow.get(group) {
            Some(rules) => !rules.iter().any(|p| p.matches(path)),
            None => true,
        }
    }

    /// Crawl delay in milliseconds for `agent`.
    ///
    /// Falls back from the agent's group to the `*` group to `default_ms`.
    pub fn crawl_delay_ms(&self, agent: &str, default_ms: u64) -> u64 {
        let agent = agent.to_ascii_lowercase();
        self.crawl_delays_ms
            .get(agent.as_str())
            .or_else(|| self.crawl_delays_ms.get(WILDCARD_AGENT))
            .copied()
            .unwrap_or(default_ms)
    }
}
