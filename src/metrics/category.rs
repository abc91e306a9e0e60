use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Terminal item error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    QuotaExceeded,
    RateLimit,
    Timeout,
    Network,
    Auth,
    Other,
}

impl ErrorCategory {
    /// Every category, in matching priority order.
    pub const ALL: [ErrorCategory; 6] = [
        ErrorCategory::QuotaExceeded,
        ErrorCategory::RateLimit,
        ErrorCategory::Timeout,
        ErrorCategory::Network,
        ErrorCategory::Auth,
        ErrorCategory::Other,
    ];

    /// Heuristic classification of backend error text.
    ///
    /// Case-insensitive substring match, first hit wins: quota, rate limit
    /// (`429`, "too many requests"), timeout ("deadline exceeded"), network
    /// ("connection"), auth ("unauthorized", `401`, "api key"), else other.
    pub fn from_message(message: &str) -> Self {
        let msg = message.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| msg.contains(n));

        if has(&["quota"]) {
            ErrorCategory::QuotaExceeded
        } else if has(&["rate limit", "429", "too many requests"]) {
            ErrorCategory::RateLimit
        } else if has(&["timeout", "deadline exceeded"]) {
            ErrorCategory::Timeout
        } else if has(&["network", "connection"]) {
            ErrorCategory::Network
        } else if has(&["api key", "unauthorized", "401"]) {
            ErrorCategory::Auth
        } else {
            ErrorCategory::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::QuotaExceeded => "quota_exceeded",
            ErrorCategory::RateLimit => "rate_limit",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Network => "network",
            ErrorCategory::Auth => "auth",
            ErrorCategory::Other => "other",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-category error tally. Always carries every category, zero included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorBreakdown(BTreeMap<ErrorCategory, u64>);

impl ErrorBreakdown {
    pub fn new() -> Self {
        Self(ErrorCategory::ALL.iter().map(|c| (*c, 0)).collect())
    }

    pub fn record(&mut self, category: ErrorCategory) {
        *self.0.entry(category).or_insert(0) += 1;
    }

    pub fn get(&self, category: ErrorCategory) -> u64 {
        self.0.get(&category).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Adds every count of `other` into `self`.
    pub fn merge(&mut self, other: &ErrorBreakdown) {
        for (category, count) in &other.0 {
            *self.0.entry(*category).or_insert(0) += count;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ErrorCategory, u64)> + '_ {
        self.0.iter().map(|(c, n)| (*c, *n))
    }
}

impl Default for ErrorBreakdown {
    fn default() -> Self {
        Self::new()
    }
}
