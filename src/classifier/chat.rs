//! `genai`-backed classification backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use genai::Client;
use genai::chat::{ChatMessage, ChatRequest};
use genai::resolver::{AuthData, AuthResolver};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use super::backend::{BackendFactory, ClassificationBackend};
use super::error::{ClassificationError, ClassificationResult};
use super::types::{StepChoice, StepDecision, StepRequest};
use crate::metrics::ErrorCategory;

const SYSTEM_PROMPT: &str = "You classify product and service descriptions into a hierarchical \
classification. You are shown the item and the candidate codes at the current level. Reply with \
a single JSON object: {\"selected_code\": <one candidate code, or null to stop here>, \
\"confidence\": <number between 0 and 1>, \"reasoning\": <short explanation>}. Do not add any \
other text.";

/// Spaces calls at least `1 / rps` apart.
#[derive(Debug)]
pub struct RateLimiter {
    period: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            period: Duration::from_secs(1) / requests_per_second.max(1),
            next_slot: Mutex::new(None),
        }
    }

    /// Waits for the next free slot.
    pub async fn acquire(&self) {
        let wait_until = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = next_slot.map_or(now, |s| s.max(now));
            *next_slot = Some(slot + self.period);
            slot
        };
        tokio::time::sleep_until(wait_until).await;
    }
}

#[derive(Debug, Deserialize)]
struct StepReply {
    #[serde(default)]
    selected_code: Option<String>,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Chat-completion backend for one model.
pub struct GenaiBackend {
    client: Client,
    model: String,
    limiter: Arc<RateLimiter>,
}

impl GenaiBackend {
    pub fn new(client: Client, model: impl Into<String>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            client,
            model: model.into(),
            limiter,
        }
    }
}

impl std::fmt::Debug for GenaiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenaiBackend")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ClassificationBackend for GenaiBackend {
    async fn resolve_step(&self, request: &StepRequest<'_>) -> ClassificationResult<StepDecision> {
        self.limiter.acquire().await;

        let chat_req = ChatRequest::new(vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_prompt(request)),
        ]);

        let resp = self
            .client
            .exec_chat(&self.model, chat_req, None)
            .await
            .map_err(|e| ClassificationError::backend(e.to_string()))?;

        let text = resp.first_text().unwrap_or_default();
        debug!(model = %self.model, reply_len = text.len(), "Received step reply");
        parse_reply(text)
    }
}

/// Builds one [`GenaiBackend`] per model, all sharing a client.
pub struct GenaiBackendFactory {
    client: Client,
    has_credentials: bool,
    rate_limit_rps: u32,
}

impl GenaiBackendFactory {
    /// With `api_key` set every provider authenticates with that key; without it
    /// the client falls back to the providers' own environment variables.
    pub fn new(api_key: Option<String>, rate_limit_rps: u32) -> Self {
        let has_credentials = api_key.is_some();
        let client = match api_key {
            Some(key) => {
                let auth_resolver = AuthResolver::from_resolver_fn(
                    move |_model_iden: genai::ModelIden| -> Result<Option<AuthData>, genai::resolver::Error> {
                        Ok(Some(AuthData::from_single(key.clone())))
                    },
                );
                Client::builder().with_auth_resolver(auth_resolver).build()
            }
            None => Client::default(),
        };
        Self {
            client,
            has_credentials,
            rate_limit_rps,
        }
    }
}

impl std::fmt::Debug for GenaiBackendFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenaiBackendFactory")
            .field("has_credentials", &self.has_credentials)
            .field("rate_limit_rps", &self.rate_limit_rps)
            .finish()
    }
}

impl BackendFactory for GenaiBackendFactory {
    fn ensure_ready(&self) -> ClassificationResult<()> {
        if self.has_credentials {
            Ok(())
        } else {
            Err(ClassificationError::MissingCredentials(
                "no API key configured (set VERDICT_API_KEY)".to_string(),
            ))
        }
    }

    fn create(&self, model: &str) -> ClassificationResult<Arc<dyn ClassificationBackend>> {
        Ok(Arc::new(GenaiBackend::new(
            self.client.clone(),
            model,
            Arc::new(RateLimiter::new(self.rate_limit_rps)),
        )))
    }
}

fn build_prompt(request: &StepRequest<'_>) -> String {
    let mut prompt = format!(
        "Item: {}\nCategory: {}\n",
        request.item, request.category
    );
    if request.path.is_empty() {
        prompt.push_str("Current position: top level\n");
    } else {
        prompt.push_str(&format!("Current position: {}\n", request.path.join(" > ")));
    }
    prompt.push_str("Candidates:\n");
    for candidate in &request.candidates {
        prompt.push_str(&format!("{} - {}\n", candidate.code(), candidate.name()));
    }
    if !request.node.is_root() {
        prompt.push_str("Reply with selected_code null if the current position is specific enough.\n");
    }
    prompt
}

/// Parses a model reply into a decision.
///
/// Accepts the JSON object alone or wrapped in a markdown fence or prose.
/// A null, empty or `STOP` code means stop.
pub fn parse_reply(text: &str) -> ClassificationResult<StepDecision> {
    let json = extract_json(text).ok_or_else(|| {
        ClassificationError::backend_with_kind(
            ErrorCategory::Other,
            format!("reply is not a JSON object: {}", truncate(text, 120)),
        )
    })?;

    let reply: StepReply = serde_json::from_str(json).map_err(|e| {
        ClassificationError::backend_with_kind(
            ErrorCategory::Other,
            format!("malformed step reply: {}", e),
        )
    })?;

    let choice = match reply.selected_code.as_deref().map(str::trim) {
        None | Some("") => StepChoice::Stop,
        Some(code) if code.eq_ignore_ascii_case("stop") => StepChoice::Stop,
        Some(code) => StepChoice::Child(code.to_string()),
    };

    Ok(StepDecision {
        choice,
        confidence: reply.confidence.clamp(0.0, 1.0),
        reasoning: reply.reasoning.filter(|r| !r.trim().is_empty()),
    })
}

fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
