use serde::{Deserialize, Serialize};

/// How a preloaded response's pattern is matched against visitor text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Prefix,
    Keyword,
    /// Agent-only typed shortcut; never participates in visitor matching.
    Shortcut,
}

/// Operator-curated canned reply, configuration data supplied at deployment;
/// exact content and ordering are deployment config, not guessed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreloadedResponse {
    pub pattern: String,
    pub match_type: MatchType,
    pub content: String,
    pub active: bool,
}

impl PreloadedResponse {
    pub fn new(pattern: impl Into<String>, match_type: MatchType, content: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            match_type,
            content: content.into(),
            active: true,
        }
    }

    /// Whether this entry participates in visitor-facing matching: only
    /// `active` entries with a visitor match type.
    pub fn participates_in_visitor_matching(&self) -> bool {
        self.active && !matches!(self.match_type, MatchType::Shortcut)
    }
}
