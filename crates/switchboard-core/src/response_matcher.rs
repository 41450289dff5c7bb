//! Matches inbound visitor text against curated preloaded replies before
//! any LLM call: first-match-wins across rule classes, insertion order
//! within a class.

use parking_lot::RwLock;
use switchboard_models::{MatchType, PreloadedResponse};

/// Normalizes text the way the exact/prefix/keyword rules expect: lowercase,
/// punctuation stripped, whitespace collapsed.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            last_was_space = false;
        } else if ch.is_whitespace() {
            if !last_was_space && !out.is_empty() {
                out.push(' ');
            }
            last_was_space = true;
        }
        // other punctuation is stripped entirely
    }
    if out.ends_with(' ') {
        out.pop();
    }
    out
}

struct Rule {
    normalized_pattern: String,
    content: String,
}

/// Loaded at start and refreshed on admin change. Only
/// `active=true` entries with a visitor match type participate; first
/// matching rule class wins in the order exact, prefix, keyword.
#[derive(Default)]
struct Rules {
    exact: Vec<Rule>,
    prefix: Vec<Rule>,
    keyword: Vec<Rule>,
}

pub struct ResponseMatcher {
    rules: RwLock<Rules>,
}

impl ResponseMatcher {
    pub fn new() -> Self {
        Self { rules: RwLock::new(Rules::default()) }
    }

    pub fn from_responses(responses: &[PreloadedResponse]) -> Self {
        let matcher = Self::new();
        matcher.refresh(responses);
        matcher
    }

    /// Rebuilds the rule sets from the current canned-response configuration.
    pub fn refresh(&self, responses: &[PreloadedResponse]) {
        let mut rules = Rules::default();
        for response in responses {
            if !response.participates_in_visitor_matching() {
                continue;
            }
            let rule = Rule {
                normalized_pattern: normalize(&response.pattern),
                content: response.content.clone(),
            };
            match response.match_type {
                MatchType::Exact => rules.exact.push(rule),
                MatchType::Prefix => rules.prefix.push(rule),
                MatchType::Keyword => rules.keyword.push(rule),
                MatchType::Shortcut => unreachable!("filtered by participates_in_visitor_matching"),
            }
        }
        *self.rules.write() = rules;
    }

    /// Looks up an exact rule by its configured pattern rather than by
    /// matching visitor text — used for reserved keys such as
    /// [`crate::routing::SYSTEM_CLOSING_KEY`].
    pub fn named(&self, key: &str) -> Option<String> {
        let normalized_key = normalize(key);
        self.rules.read().exact.iter().find(|r| r.normalized_pattern == normalized_key).map(|r| r.content.clone())
    }

    /// First matching rule across exact, prefix, keyword, in that order;
    /// `None` if nothing matches.
    pub fn matches(&self, text: &str) -> Option<String> {
        let normalized = normalize(text);
        let rules = self.rules.read();

        if let Some(rule) = rules.exact.iter().find(|r| r.normalized_pattern == normalized) {
            return Some(rule.content.clone());
        }
        if let Some(rule) = rules.prefix.iter().find(|r| normalized.starts_with(&r.normalized_pattern)) {
            return Some(rule.content.clone());
        }
        if let Some(rule) = rules.keyword.iter().find(|r| normalized.contains(&r.normalized_pattern)) {
            return Some(rule.content.clone());
        }
        None
    }
}

impl Default for ResponseMatcher {
    fn default() -> Self {
        Self::new()
    }
}
