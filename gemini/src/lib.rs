//! Minimal Google Gemini API client.
//!
//! This crate provides a focused client for the `generateContent` API with:
//! - Multi-turn content requests with a system instruction
//! - Generation config (temperature, output cap, JSON response mode)
//! - Safety settings and prompt-block reporting
//! - Typed errors for transport, API, and parse failures

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Errors that can occur when using the Gemini client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("API key not configured")]
    NoApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Prompt blocked: {reason}")]
    Blocked { reason: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

/// Gemini API client.
#[derive(Clone)]
pub struct Gemini {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl Gemini {
    /// Create a new Gemini client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Create a Gemini client from the GEMINI_API_KEY environment variable.
    pub fn from_env() -> Result<Self, Error> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| Error::NoApiKey)?;
        Ok(Self::new(api_key))
    }

    /// Set the default model for this client.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the endpoint base URL.
    ///
    /// Accepts either a bare host (`https://vip.apiyi.com/`) or a fully
    /// versioned root (`https://generativelanguage.googleapis.com/v1beta`);
    /// trailing slashes are trimmed and a `/v1beta` segment is appended when
    /// no version segment is present.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = normalize_base_url(&base_url.into());
        self
    }

    /// Send a content-generation request and return the full response.
    pub async fn generate(&self, request: Request) -> Result<Response, Error> {
        if self.api_key.is_empty() {
            return Err(Error::NoApiKey);
        }

        let model = request.model.clone().unwrap_or_else(|| self.model.clone());
        let api_request = build_api_request(&request);

        let response = self
            .client
            .post(self.request_url(&model))
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: parse_error_body(&body),
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        parse_response(api_response)
    }

    fn request_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        )
    }
}

/// Normalize an endpoint root the way the upstream SDK treats `rootUrl`.
fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    if trimmed.ends_with("/v1beta") || trimmed.ends_with("/v1") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1beta")
    }
}

/// Extract the upstream error message from a non-2xx body, falling back to
/// the raw body text when it is not the standard error JSON.
fn parse_error_body(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) if !parsed.error.message.is_empty() => parsed.error.message,
        _ => body.to_string(),
    }
}

fn build_api_request(request: &Request) -> ApiRequest {
    let contents: Vec<ApiContent> = request
        .contents
        .iter()
        .map(|c| ApiContent {
            role: match c.role {
                Role::User => "user".to_string(),
                Role::Model => "model".to_string(),
            },
            parts: vec![ApiPart {
                text: c.text.clone(),
            }],
        })
        .collect();

    let generation_config = if request.temperature.is_some()
        || request.max_output_tokens.is_some()
        || request.response_mime_type.is_some()
    {
        Some(ApiGenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_output_tokens,
            response_mime_type: request.response_mime_type.clone(),
        })
    } else {
        None
    };

    ApiRequest {
        contents,
        system_instruction: request.system.as_ref().map(|text| ApiSystemInstruction {
            parts: vec![ApiPart { text: text.clone() }],
        }),
        generation_config,
        safety_settings: request.safety_settings.clone(),
    }
}

fn parse_response(api_response: ApiResponse) -> Result<Response, Error> {
    if let Some(feedback) = &api_response.prompt_feedback {
        if let Some(reason) = &feedback.block_reason {
            return Err(Error::Blocked {
                reason: reason.clone(),
            });
        }
    }

    let (text, finish_reason) = match api_response.candidates.first() {
        Some(candidate) => {
            let text = candidate
                .content
                .as_ref()
                .map(|content| {
                    content
                        .parts
                        .iter()
                        .map(|p| p.text.as_str())
                        .collect::<Vec<_>>()
                        .join("")
                })
                .unwrap_or_default();

            let finish_reason = match candidate.finish_reason.as_deref() {
                Some("STOP") | None => FinishReason::Stop,
                Some("MAX_TOKENS") => FinishReason::MaxTokens,
                Some("SAFETY") => FinishReason::Safety,
                Some("RECITATION") => FinishReason::Recitation,
                Some(_) => FinishReason::Other,
            };

            (text, finish_reason)
        }
        None => (String::new(), FinishReason::Stop),
    };

    let usage = api_response
        .usage_metadata
        .map(|u| Usage {
            prompt_tokens: u.prompt_token_count,
            response_tokens: u.candidates_token_count,
        })
        .unwrap_or_default();

    Ok(Response {
        text,
        model_version: api_response.model_version,
        finish_reason,
        usage,
    })
}

// ============================================================================
// Public types
// ============================================================================

/// A content-generation request to send to Gemini.
#[derive(Debug, Clone)]
pub struct Request {
    pub model: Option<String>,
    pub system: Option<String>,
    pub contents: Vec<Content>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<usize>,
    pub response_mime_type: Option<String>,
    pub safety_settings: Option<Vec<SafetySetting>>,
}

impl Request {
    /// Create a new request with the given contents.
    pub fn new(contents: Vec<Content>) -> Self {
        Self {
            model: None,
            system: None,
            contents,
            temperature: None,
            max_output_tokens: None,
            response_mime_type: None,
            safety_settings: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: usize) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    /// Request a specific response MIME type, e.g. `application/json`.
    pub fn with_response_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.response_mime_type = Some(mime_type.into());
        self
    }

    pub fn with_safety_settings(mut self, safety_settings: Vec<SafetySetting>) -> Self {
        self.safety_settings = Some(safety_settings);
        self
    }
}

/// A single turn in the conversation.
#[derive(Debug, Clone)]
pub struct Content {
    pub role: Role,
    pub text: String,
}

impl Content {
    /// Create a user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    /// Create a model turn.
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// The role of a turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

/// A per-category safety threshold.
#[derive(Debug, Clone, Serialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

impl SafetySetting {
    /// All four harm categories set to BLOCK_NONE.
    pub fn permissive() -> Vec<SafetySetting> {
        [
            HarmCategory::Harassment,
            HarmCategory::HateSpeech,
            HarmCategory::SexuallyExplicit,
            HarmCategory::DangerousContent,
        ]
        .into_iter()
        .map(|category| SafetySetting {
            category,
            threshold: HarmBlockThreshold::BlockNone,
        })
        .collect()
    }
}

/// Harm categories recognized by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HarmCategory {
    #[serde(rename = "HARM_CATEGORY_HARASSMENT")]
    Harassment,
    #[serde(rename = "HARM_CATEGORY_HATE_SPEECH")]
    HateSpeech,
    #[serde(rename = "HARM_CATEGORY_SEXUALLY_EXPLICIT")]
    SexuallyExplicit,
    #[serde(rename = "HARM_CATEGORY_DANGEROUS_CONTENT")]
    DangerousContent,
}

/// Block thresholds for a harm category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmBlockThreshold {
    BlockNone,
    BlockOnlyHigh,
    BlockMediumAndAbove,
    BlockLowAndAbove,
}

/// A content-generation response from Gemini.
#[derive(Debug, Clone)]
pub struct Response {
    /// All candidate text parts concatenated; empty when the response carried
    /// no usable candidate.
    pub text: String,
    pub model_version: Option<String>,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Other,
}

/// Token usage information.
#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub response_tokens: usize,
}

// ============================================================================
// Internal API types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest {
    contents: Vec<ApiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<ApiSystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<ApiGenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    safety_settings: Option<Vec<SafetySetting>>,
}

#[derive(Debug, Serialize)]
struct ApiContent {
    role: String,
    parts: Vec<ApiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct ApiSystemInstruction {
    parts: Vec<ApiPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<ApiPromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<ApiUsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCandidate {
    #[serde(default)]
    content: Option<ApiCandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiCandidateContent {
    #[serde(default)]
    parts: Vec<ApiPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiUsageMetadata {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = Gemini::new("test-key");
        assert_eq!(client.model, DEFAULT_MODEL);
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_client_with_model() {
        let client = Gemini::new("test-key").with_model("gemini-2.5-pro");
        assert_eq!(client.model, "gemini-2.5-pro");
    }

    #[test]
    fn test_base_url_normalization() {
        let client = Gemini::new("k").with_base_url("https://vip.apiyi.com/");
        assert_eq!(client.base_url, "https://vip.apiyi.com/v1beta");

        let client = Gemini::new("k").with_base_url("https://vip.apiyi.com");
        assert_eq!(client.base_url, "https://vip.apiyi.com/v1beta");

        let client =
            Gemini::new("k").with_base_url("https://generativelanguage.googleapis.com/v1beta");
        assert_eq!(
            client.base_url,
            "https://generativelanguage.googleapis.com/v1beta"
        );

        let client = Gemini::new("k").with_base_url("https://example.com/v1/");
        assert_eq!(client.base_url, "https://example.com/v1");
    }

    #[test]
    fn test_request_url() {
        let client = Gemini::new("secret").with_base_url("https://vip.apiyi.com/");
        assert_eq!(
            client.request_url("gemini-2.5-flash"),
            "https://vip.apiyi.com/v1beta/models/gemini-2.5-flash:generateContent?key=secret"
        );
    }

    #[test]
    fn test_request_builder() {
        let request = Request::new(vec![Content::user("Hello")])
            .with_system("You are a novelist")
            .with_temperature(0.7)
            .with_max_output_tokens(1024)
            .with_response_mime_type("application/json");

        assert!(request.system.is_some());
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.max_output_tokens, Some(1024));
        assert_eq!(request.response_mime_type.as_deref(), Some("application/json"));
    }

    #[test]
    fn test_content_creation() {
        let user = Content::user("Hello");
        assert!(matches!(user.role, Role::User));
        assert_eq!(user.text, "Hello");

        let model = Content::model("Hi there");
        assert!(matches!(model.role, Role::Model));
    }

    #[test]
    fn test_api_request_shape() {
        let request = Request::new(vec![Content::user("Hi"), Content::model("Hello")])
            .with_system("sys")
            .with_temperature(0.7)
            .with_safety_settings(SafetySetting::permissive());

        let value = serde_json::to_value(build_api_request(&request)).unwrap();

        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "Hi");
        assert_eq!(value["contents"][1]["role"], "model");
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "sys");

        // f32 widens through serde_json, so compare with a tolerance.
        let temperature = value["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.7).abs() < 1e-6);
        assert_eq!(
            value["safetySettings"][0]["category"],
            "HARM_CATEGORY_HARASSMENT"
        );
        assert_eq!(value["safetySettings"][0]["threshold"], "BLOCK_NONE");
        assert_eq!(value["safetySettings"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_api_request_omits_empty_config() {
        let request = Request::new(vec![Content::user("Hi")]);
        let value = serde_json::to_value(build_api_request(&request)).unwrap();

        assert!(value.get("generationConfig").is_none());
        assert!(value.get("systemInstruction").is_none());
        assert!(value.get("safetySettings").is_none());
    }

    #[test]
    fn test_parse_response_text() {
        let json = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "Once upon "}, {"text": "a time"}], "role": "model"},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 4},
            "modelVersion": "gemini-2.5-flash"
        }"#;
        let api: ApiResponse = serde_json::from_str(json).unwrap();
        let response = parse_response(api).unwrap();

        assert_eq!(response.text, "Once upon a time");
        assert_eq!(response.finish_reason, FinishReason::Stop);
        assert_eq!(response.usage.prompt_tokens, 12);
        assert_eq!(response.usage.response_tokens, 4);
        assert_eq!(response.model_version.as_deref(), Some("gemini-2.5-flash"));
    }

    #[test]
    fn test_parse_response_blocked() {
        let json = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let api: ApiResponse = serde_json::from_str(json).unwrap();

        match parse_response(api) {
            Err(Error::Blocked { reason }) => assert_eq!(reason, "SAFETY"),
            other => panic!("expected Blocked, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_response_empty_candidates() {
        let json = r#"{"candidates": []}"#;
        let api: ApiResponse = serde_json::from_str(json).unwrap();
        let response = parse_response(api).unwrap();

        assert!(response.text.is_empty());
        assert_eq!(response.usage.prompt_tokens, 0);
    }

    #[tokio::test]
    async fn test_generate_requires_api_key() {
        let client = Gemini::new("");
        let result = client.generate(Request::new(vec![Content::user("hi")])).await;
        assert!(matches!(result, Err(Error::NoApiKey)));
    }

    #[test]
    fn test_parse_error_body() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(parse_error_body(body), "API key not valid");

        assert_eq!(parse_error_body("upstream exploded"), "upstream exploded");
        assert_eq!(parse_error_body(""), "");
    }
}
