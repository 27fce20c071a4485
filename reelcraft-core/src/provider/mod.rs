//! # Backend Provider Interface
//!
//! A trait-based abstraction for the hosted generation backend.
//!
//! ## Design
//! - `LlmProvider` covers text completion (script, prompts, summary stages)
//! - `ImageProvider` covers text-to-image generation
//! - `Backend` is anything that does both; stages are generic over it
//! - `GeminiProvider` implements both against the Gemini / Imagen REST API
//! - Usage tracking

pub mod gemini;

pub use gemini::GeminiProvider;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Base URL of the hosted Gemini API
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model for text stages
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.0-flash-001";

/// Default model for image generation
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-3.0-generate-002";

// ============================================================================
// Core Types
// ============================================================================

/// A chat message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(content.into()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(content.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Request parameters for a completion
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
    pub stop: Option<Vec<String>>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_max_tokens(mut self, max: usize) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = Some(stop);
        self
    }
}

/// Response from a completion request
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub id: String,
    pub model: String,
    pub content: Option<String>,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Unknown,
}

/// Token usage information
#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

// ============================================================================
// Image Types
// ============================================================================

/// Content policy for people in generated images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonGeneration {
    DontAllow,
    AllowAdult,
    AllowAll,
}

/// Fixed per-call image configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageGenerationConfig {
    pub number_of_images: u32,
    pub aspect_ratio: String,
    pub output_mime_type: String,
    pub person_generation: PersonGeneration,
}

impl Default for ImageGenerationConfig {
    fn default() -> Self {
        Self {
            number_of_images: 1,
            aspect_ratio: "9:16".into(),
            output_mime_type: "image/jpeg".into(),
            person_generation: PersonGeneration::AllowAdult,
        }
    }
}

impl ImageGenerationConfig {
    pub fn with_aspect_ratio(mut self, aspect_ratio: impl Into<String>) -> Self {
        self.aspect_ratio = aspect_ratio.into();
        self
    }

    pub fn with_output_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.output_mime_type = mime_type.into();
        self
    }

    pub fn with_person_generation(mut self, policy: PersonGeneration) -> Self {
        self.person_generation = policy;
        self
    }

    /// File extension for images saved in the configured encoding
    pub fn file_extension(&self) -> &'static str {
        match self.output_mime_type.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            _ => "jpg",
        }
    }
}

/// A single text-to-image request
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    pub model: Option<String>,
    pub config: ImageGenerationConfig,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
            config: ImageGenerationConfig::default(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_config(mut self, config: ImageGenerationConfig) -> Self {
        self.config = config;
        self
    }
}

/// Encoded image payload returned by the backend
#[derive(Debug, Clone)]
pub struct GeneratedImageData {
    pub image_bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

/// Response from an image request. Empty when the backend produced nothing
/// (e.g. the prompt was filtered).
#[derive(Debug, Clone, Default)]
pub struct ImageResponse {
    pub generated_images: Vec<GeneratedImageData>,
}

impl ImageResponse {
    pub fn first(&self) -> Option<&GeneratedImageData> {
        self.generated_images.first()
    }

    pub fn is_empty(&self) -> bool {
        self.generated_images.is_empty()
    }
}

// ============================================================================
// Provider Traits
// ============================================================================

/// Error type for provider operations
#[derive(Debug)]
pub enum ProviderError {
    /// Network/connection error
    Network(String),
    /// API returned an error
    Api { status: u16, message: String },
    /// Failed to parse response
    Parse(String),
    /// Rate limited
    RateLimited { retry_after: Option<u64> },
    /// Invalid request
    InvalidRequest(String),
    /// Model not found
    ModelNotFound(String),
    /// Authentication failed
    AuthenticationFailed,
    /// Other error
    Other(String),
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(e) => write!(f, "Network error: {}", e),
            Self::Api { status, message } => write!(f, "API error ({}): {}", status, message),
            Self::Parse(e) => write!(f, "Parse error: {}", e),
            Self::RateLimited { retry_after } => {
                write!(f, "Rate limited")?;
                if let Some(secs) = retry_after {
                    write!(f, " (retry after {}s)", secs)?;
                }
                Ok(())
            }
            Self::InvalidRequest(e) => write!(f, "Invalid request: {}", e),
            Self::ModelNotFound(m) => write!(f, "Model not found: {}", m),
            Self::AuthenticationFailed => write!(f, "Authentication failed"),
            Self::Other(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Text completion backend
#[allow(async_fn_in_trait)]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name (e.g., "gemini")
    fn name(&self) -> &str;

    /// Get available models
    fn models(&self) -> Vec<String>;

    /// Get the default model
    fn default_model(&self) -> &str;

    /// Send a completion request and get a full response
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError>;

    /// Simple prompt -> response helper
    async fn prompt(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = CompletionRequest::new(vec![ChatMessage::user(prompt)]);
        let response = self.complete(request).await?;
        response.content.ok_or_else(|| ProviderError::Other("No content in response".into()))
    }

    /// Chat with message history
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, ProviderError> {
        let request = CompletionRequest::new(messages);
        let response = self.complete(request).await?;
        response.content.ok_or_else(|| ProviderError::Other("No content in response".into()))
    }
}

/// Text-to-image backend
#[allow(async_fn_in_trait)]
pub trait ImageProvider: Send + Sync {
    /// Get the default image model
    fn default_image_model(&self) -> &str;

    /// Generate images for one prompt
    async fn generate_images(&self, request: ImageRequest) -> Result<ImageResponse, ProviderError>;
}

/// A backend able to serve every stage of the pipeline
pub trait Backend: LlmProvider + ImageProvider {}

impl<T: LlmProvider + ImageProvider> Backend for T {}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Configuration for creating providers
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub default_model: Option<String>,
    pub image_model: Option<String>,
    pub headers: HashMap<String, String>,
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    pub fn gemini(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            base_url: Some(DEFAULT_BASE_URL.into()),
            default_model: Some(DEFAULT_TEXT_MODEL.into()),
            image_model: Some(DEFAULT_IMAGE_MODEL.into()),
            headers: HashMap::new(),
            timeout_secs: Some(120),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

// ============================================================================
// Usage Tracking
// ============================================================================

/// Tracks token usage across multiple calls
#[derive(Debug, Clone, Default)]
pub struct UsageTracker {
    pub total_calls: usize,
    pub total_prompt_tokens: usize,
    pub total_completion_tokens: usize,
    pub by_model: HashMap<String, Usage>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, model: &str, usage: &Usage) {
        self.total_calls += 1;
        self.total_prompt_tokens += usage.prompt_tokens;
        self.total_completion_tokens += usage.completion_tokens;

        let entry = self.by_model.entry(model.to_string()).or_default();
        entry.prompt_tokens += usage.prompt_tokens;
        entry.completion_tokens += usage.completion_tokens;
        entry.total_tokens += usage.total_tokens;
    }

    pub fn total_tokens(&self) -> usize {
        self.total_prompt_tokens + self.total_completion_tokens
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_constructors() {
        let sys = ChatMessage::system("You are a scriptwriter");
        assert_eq!(sys.role, Role::System);
        assert_eq!(sys.content.as_deref(), Some("You are a scriptwriter"));

        let user = ChatMessage::user("Write about the ocean");
        assert_eq!(user.role, Role::User);

        let asst = ChatMessage::assistant("Here is a script");
        assert_eq!(asst.role, Role::Assistant);
    }

    #[test]
    fn test_completion_request_builder() {
        let request = CompletionRequest::new(vec![ChatMessage::user("Hello")])
            .with_model(DEFAULT_TEXT_MODEL)
            .with_temperature(0.7)
            .with_max_tokens(1000)
            .with_stop(vec!["END".into()]);

        assert_eq!(request.model.as_deref(), Some("gemini-2.0-flash-001"));
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.max_tokens, Some(1000));
        assert_eq!(request.stop, Some(vec!["END".to_string()]));
    }

    #[test]
    fn test_image_config_defaults() {
        let config = ImageGenerationConfig::default();
        assert_eq!(config.number_of_images, 1);
        assert_eq!(config.aspect_ratio, "9:16");
        assert_eq!(config.person_generation, PersonGeneration::AllowAdult);
        assert_eq!(config.file_extension(), "jpg");

        let png = config.with_output_mime_type("image/png");
        assert_eq!(png.file_extension(), "png");
    }

    #[test]
    fn test_person_generation_wire_names() {
        let value = serde_json::to_value(PersonGeneration::AllowAdult).unwrap();
        assert_eq!(value, serde_json::json!("allow_adult"));
        let value = serde_json::to_value(PersonGeneration::DontAllow).unwrap();
        assert_eq!(value, serde_json::json!("dont_allow"));
    }

    #[test]
    fn test_provider_config() {
        let config = ProviderConfig::gemini("test-key")
            .with_image_model("imagen-4.0-generate-001")
            .with_header("x-goog-user-project", "demo")
            .with_timeout(30);

        assert_eq!(config.api_key.as_deref(), Some("test-key"));
        assert_eq!(config.default_model.as_deref(), Some(DEFAULT_TEXT_MODEL));
        assert_eq!(config.image_model.as_deref(), Some("imagen-4.0-generate-001"));
        assert!(config.headers.contains_key("x-goog-user-project"));
        assert_eq!(config.timeout_secs, Some(30));
    }

    #[test]
    fn test_usage_tracker() {
        let mut tracker = UsageTracker::new();

        tracker.track("gemini-2.0-flash-001", &Usage {
            prompt_tokens: 100,
            completion_tokens: 50,
            total_tokens: 150,
        });

        tracker.track("gemini-2.0-flash-001", &Usage {
            prompt_tokens: 200,
            completion_tokens: 100,
            total_tokens: 300,
        });

        assert_eq!(tracker.total_calls, 2);
        assert_eq!(tracker.total_prompt_tokens, 300);
        assert_eq!(tracker.total_completion_tokens, 150);
        assert_eq!(tracker.total_tokens(), 450);
        assert_eq!(tracker.by_model["gemini-2.0-flash-001"].total_tokens, 450);
    }
}
