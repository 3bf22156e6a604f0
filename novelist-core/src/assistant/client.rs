//! Remote model client with sentinel-encoded failures.
//!
//! Wraps the low-level `gemini` client for the chat loop's needs. Every
//! failure on the chat path is converted into a bracket-tagged text value so
//! the caller always has something to render, and the memory-summarization
//! side call degrades silently to the previous snapshot instead of failing.

use super::memory::{extract_json, ConsistencyMemory};
use crate::message::{Message, Role};
use gemini::{Content, Gemini, Request, SafetySetting};

/// System instruction given to every chat turn.
const SYSTEM_INSTRUCTION: &str = include_str!("prompts/system_instruction.txt");

/// Default endpoint root (a relay in front of the official API).
const DEFAULT_BASE_URL: &str = "https://vip.apiyi.com/";

/// Model for background summarization and connection pings (fast and cheap).
const MEMORY_MODEL: &str = "gemini-3-flash-preview";

/// Maximum tokens for a summarization response.
const MEMORY_MAX_TOKENS: usize = 1024;

/// Sampling temperature for chat turns.
const CHAT_TEMPERATURE: f32 = 0.7;

/// Endpoint configuration for outbound calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Explicit API key; empty means "fall back to the environment".
    pub api_key: String,
    /// Endpoint root, bare host or versioned.
    pub base_url: String,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// The explicit key, or the GEMINI_API_KEY environment variable.
    fn resolve_key(&self) -> Option<String> {
        if !self.api_key.is_empty() {
            return Some(self.api_key.clone());
        }
        std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.is_empty())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Client wrapper used by the conversation controller.
///
/// Holds the current [`ClientConfig`] plus a generation counter; every call
/// builds its connection from an immutable snapshot of the config, so a
/// configuration update never leaks into a call that already started.
pub struct ModelClient {
    config: ClientConfig,
    generation: u64,
    last_failure: Option<String>,
}

impl ModelClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            generation: 0,
            last_failure: None,
        }
    }

    /// Replace the endpoint configuration. The next call picks up the new
    /// values; stale credentials are never reused.
    pub fn update_config(&mut self, api_key: impl Into<String>, base_url: impl Into<String>) {
        self.config = ClientConfig::new(api_key, base_url);
        self.generation += 1;
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// How many times the configuration has been replaced.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The most recent absorbed failure, for diagnostics. Cleared by the next
    /// successful call.
    pub fn last_failure(&self) -> Option<&str> {
        self.last_failure.as_deref()
    }

    /// Send a chat turn and return the reply text.
    ///
    /// Never fails structurally: configuration, transport, API, and block
    /// failures all come back as bracket-tagged sentinel strings. The
    /// consistency reference block is prepended when `memory` has any
    /// non-empty field.
    pub async fn send_message(
        &mut self,
        prompt: &str,
        model: &str,
        history: &[Message],
        memory: Option<&ConsistencyMemory>,
    ) -> String {
        let Some(client) = self.snapshot() else {
            return self.fail("[System Error: API Configuration Missing]".to_string());
        };

        let augmented = match memory {
            Some(memory) => memory.augment_prompt(prompt),
            None => prompt.to_string(),
        };

        let mut contents = convert_history(history);
        contents.push(Content::user(augmented));

        let request = Request::new(contents)
            .with_model(model)
            .with_system(SYSTEM_INSTRUCTION)
            .with_temperature(CHAT_TEMPERATURE)
            .with_safety_settings(SafetySetting::permissive());

        match client.generate(request).await {
            Ok(response) if response.text.is_empty() => self.fail("[Empty Response]".to_string()),
            Ok(response) => {
                self.last_failure = None;
                response.text
            }
            Err(error) => {
                let text = sentinel(&error);
                self.fail(text)
            }
        }
    }

    /// Ask the model to re-summarize the memory bank against new content.
    ///
    /// Returns the merged memory on success. Any failure (no key, transport,
    /// non-2xx, unparseable JSON) returns `current` unchanged; the reason is
    /// kept in [`last_failure`](Self::last_failure) only.
    pub async fn summarize_for_memory(
        &mut self,
        new_content: &str,
        current: &ConsistencyMemory,
    ) -> ConsistencyMemory {
        let Some(client) = self.snapshot() else {
            self.record_failure("memory update skipped: API configuration missing".to_string());
            return current.clone();
        };

        let prompt = format!(
            r#"You are a Consistency Auditor for a novel.
Based on the following NEW content, update the MEMORY BANK.
Keep it extremely concise (bullet points). Focus on facts, character changes, and plot milestones.

NEW CONTENT:
{new_content}

OLD MEMORY:
Plot: {plot}
Characters: {characters}
Rules: {rules}

Output JSON format:
{{
  "plotPoints": ["new point 1", "new point 2"],
  "characterStates": "updated status string",
  "worldRules": ["rule 1", "rule 2"]
}}"#,
            plot = current.plot_points.join("; "),
            characters = current.character_states,
            rules = current.world_rules.join("; "),
        );

        let request = Request::new(vec![Content::user(prompt)])
            .with_model(MEMORY_MODEL)
            .with_max_output_tokens(MEMORY_MAX_TOKENS)
            .with_response_mime_type("application/json");

        let text = match client.generate(request).await {
            Ok(response) => response.text,
            Err(error) => {
                self.record_failure(format!("memory update failed, keeping old memory: {error}"));
                return current.clone();
            }
        };

        match serde_json::from_str::<serde_json::Value>(extract_json(&text)) {
            Ok(update) => {
                self.last_failure = None;
                current.merged_with(&update)
            }
            Err(error) => {
                self.record_failure(format!(
                    "memory update unparseable, keeping old memory: {error}"
                ));
                current.clone()
            }
        }
    }

    /// Probe an endpoint with throwaway credentials.
    ///
    /// Does not touch any client's configuration. An empty key fails fast
    /// with no network activity.
    pub async fn test_connection(api_key: &str, base_url: &str) -> bool {
        if api_key.is_empty() {
            return false;
        }

        let client = Gemini::new(api_key).with_base_url(base_url);
        let request = Request::new(vec![Content::user("ping")]).with_model(MEMORY_MODEL);
        client.generate(request).await.is_ok()
    }

    /// Build a connection from the current config, or None without a key.
    fn snapshot(&self) -> Option<Gemini> {
        let key = self.config.resolve_key()?;
        Some(Gemini::new(key).with_base_url(self.config.base_url.as_str()))
    }

    fn fail(&mut self, text: String) -> String {
        self.record_failure(text.clone());
        text
    }

    fn record_failure(&mut self, detail: String) {
        self.last_failure = Some(detail);
    }
}

impl Default for ModelClient {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

/// Convert transcript messages into wire turns.
///
/// System notices are local bookkeeping; the remote model only accepts
/// user/model turns, so they are dropped. Order and roles of the remaining
/// messages are preserved.
pub fn convert_history(messages: &[Message]) -> Vec<Content> {
    messages
        .iter()
        .filter_map(|message| match message.role {
            Role::User => Some(Content::user(message.content.as_str())),
            Role::Model => Some(Content::model(message.content.as_str())),
            Role::System => None,
        })
        .collect()
}

/// True for the bracket-tagged failure values produced by [`ModelClient`].
pub fn is_sentinel(text: &str) -> bool {
    ["[System Error", "[API Error", "[Blocked:", "[Network Error]", "[Empty Response]"]
        .iter()
        .any(|prefix| text.starts_with(prefix))
}

fn sentinel(error: &gemini::Error) -> String {
    match error {
        gemini::Error::NoApiKey => "[System Error: API Configuration Missing]".to_string(),
        gemini::Error::Api { status, message } => format!("[API Error {status}] {message}"),
        gemini::Error::Blocked { reason } => format!("[Blocked: {reason}]"),
        gemini::Error::Network(detail) => format!("[Network Error] {detail}"),
        gemini::Error::Parse(detail) => format!("[System Error: {detail}]"),
    }
}
