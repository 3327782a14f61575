//! Per-turn source URL aggregation.
//!
//! URLs observed in tool results (search hits, fetched pages) are collected
//! in discovery order, deduplicated by exact string match, and capped. The
//! collector is rebuilt for every user turn.

use std::collections::HashSet;

/// Collects http/https source URLs for one turn. The ordered list is the
/// output; the companion set makes the dedup check O(1).
#[derive(Debug)]
pub struct SourceCollector {
    urls: Vec<String>,
    seen: HashSet<String>,
    cap: usize,
}

impl SourceCollector {
    pub fn new(cap: usize) -> Self {
        Self {
            urls: Vec::new(),
            seen: HashSet::new(),
            cap,
        }
    }

    /// Record a candidate URL. Non-web schemes, duplicates, and anything
    /// past the cap are silently dropped. Returns whether the URL was kept.
    pub fn add(&mut self, url: &str) -> bool {
        if self.is_full() {
            return false;
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return false;
        }
        if !self.seen.insert(url.to_string()) {
            return false;
        }
        self.urls.push(url.to_string());
        true
    }

    pub fn is_full(&self) -> bool {
        self.urls.len() >= self.cap
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// The collected URLs in discovery order.
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn into_urls(self) -> Vec<String> {
        self.urls
    }
}

/// Append a "Sources:" section to an answer. Returns the text unchanged
/// when there are no URLs.
pub fn append_sources(text: &str, urls: &[String]) -> String {
    if urls.is_empty() {
        return text.to_string();
    }
    let mut out = text.trim_end().to_string();
    out.push_str("\n\nSources:\n");
    for url in urls {
        out.push_str("- ");
        out.push_str(url);
        out.push('\n');
    }
    out
}
