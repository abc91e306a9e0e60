use serde::{Deserialize, Serialize};

/// One live routing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingEntry {
    pub provider: String,
    pub model: String,
    /// Lower is preferred.
    #[serde(default)]
    pub priority: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl RoutingEntry {
    pub fn new(provider: &str, model: &str, priority: u32) -> Self {
        Self {
            provider: provider.to_string(),
            model: model.to_string(),
            priority,
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// What a priority promotion did, entry by entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionReport {
    /// Models whose priority was written.
    pub updated: Vec<String>,
    /// Ranked models without a routing entry.
    pub missing: Vec<String>,
    /// Models whose write failed, with the error text.
    pub failed: Vec<(String, String)>,
}

impl PromotionReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.failed.is_empty()
    }
}
