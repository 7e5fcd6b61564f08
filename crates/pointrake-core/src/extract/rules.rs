//! Declarative inclusion filtering.
//!
//! Each source carries a [`FilterPolicy`]: an ordered table of keyword rules
//! evaluated top-to-bottom against the raw description. The first matching
//! rule decides the record's fate; when no rule matches, the sign rule
//! applies (gains only), except that a cancellation marker admits a negative
//! record so the reversal stays visible for reconciliation.

use super::ScanOptions;

/// What a matching keyword rule does with the record.
#[derive(Debug, Clone, Copy)]
pub enum RuleAction {
    /// Keep the record regardless of sign.
    Include,
    /// Drop the record regardless of sign.
    Exclude,
    /// Keep the record (regardless of sign) only when the named toggle is
    /// enabled; drop it otherwise, even if nominally positive.
    IncludeIfToggle(&'static str),
}

/// One `(markers, action)` entry; any marker substring triggers the action.
#[derive(Debug, Clone, Copy)]
pub struct KeywordRule {
    markers: &'static [&'static str],
    action: RuleAction,
}

impl KeywordRule {
    #[must_use]
    pub const fn new(markers: &'static [&'static str], action: RuleAction) -> Self {
        Self { markers, action }
    }

    fn matches(&self, description: &str) -> bool {
        self.markers.iter().any(|m| description.contains(m))
    }
}

/// A source's full inclusion policy: the keyword rule table plus the markers
/// that flag a cancellation row.
#[derive(Debug, Clone, Copy)]
pub struct FilterPolicy {
    rules: &'static [KeywordRule],
    cancellation_markers: &'static [&'static str],
}

impl FilterPolicy {
    #[must_use]
    pub const fn new(
        rules: &'static [KeywordRule],
        cancellation_markers: &'static [&'static str],
    ) -> Self {
        Self {
            rules,
            cancellation_markers,
        }
    }

    /// Whether a record with this raw description and amount is retained.
    #[must_use]
    pub fn admits(&self, description: &str, amount: i64, options: &ScanOptions) -> bool {
        for rule in self.rules {
            if rule.matches(description) {
                return match rule.action {
                    RuleAction::Include => true,
                    RuleAction::Exclude => false,
                    RuleAction::IncludeIfToggle(toggle) => options.is_enabled(toggle),
                };
            }
        }
        amount > 0 || self.is_cancellation(description, amount)
    }

    /// A negative row carrying one of the source's cancellation markers.
    #[must_use]
    pub fn is_cancellation(&self, description: &str, amount: i64) -> bool {
        amount < 0 && self.cancellation_markers.iter().any(|m| description.contains(m))
    }
}
