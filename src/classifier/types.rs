use serde::{Deserialize, Serialize};

use crate::tree::TreeNode;

/// What the backend decided at one level of the walk.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StepChoice {
    /// Descend into the child with this code.
    Child(String),
    /// The current node is specific enough.
    Stop,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepDecision {
    pub choice: StepChoice,
    /// Backend-reported confidence in `[0, 1]`.
    pub confidence: f64,
    pub reasoning: Option<String>,
}

impl StepDecision {
    pub fn child(code: impl Into<String>, confidence: f64) -> Self {
        Self {
            choice: StepChoice::Child(code.into()),
            confidence,
            reasoning: None,
        }
    }

    pub fn stop(confidence: f64) -> Self {
        Self {
            choice: StepChoice::Stop,
            confidence,
            reasoning: None,
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }
}

/// One backend question: pick among `candidates` (the children of `node`) or stop.
#[derive(Debug, Clone)]
pub struct StepRequest<'a> {
    pub item: &'a str,
    pub category: &'a str,
    /// Current node; the synthetic root on the first step.
    pub node: &'a TreeNode,
    /// Codes from the top level down to `node` (empty at the root).
    pub path: Vec<&'a str>,
    pub candidates: Vec<&'a TreeNode>,
}

/// One level of a classification path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationStep {
    pub level: u32,
    pub code: String,
    pub name: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub duration_ms: u64,
    /// Served from the step cache instead of the backend.
    #[serde(default)]
    pub cached: bool,
}

/// Outcome of classifying one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemClassification {
    pub item: String,
    pub category: String,
    pub final_code: String,
    pub final_name: String,
    pub final_confidence: f64,
    pub ai_calls_count: u32,
    pub cache_hits: u32,
    pub steps: Vec<ClassificationStep>,
    pub duration_ms: u64,
}
