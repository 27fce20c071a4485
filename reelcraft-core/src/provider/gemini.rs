//! Gemini / Imagen provider implementation
//!
//! Text goes through `models/{model}:generateContent`, images through
//! `models/{model}:predict`. Both authenticate with the `x-goog-api-key`
//! header.

use super::*;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Gemini provider (text and image)
#[derive(Debug)]
pub struct GeminiProvider {
    client: Client,
    config: ProviderConfig,
}

impl GeminiProvider {
    /// Build the HTTP client. No request is sent.
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs.unwrap_or(120)))
            .build()
            .map_err(|e| ProviderError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    async fn post_json<B, R>(&self, url: String, body: &B, model: &str) -> Result<R, ProviderError>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let api_key = self.config.api_key.as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(ProviderError::AuthenticationFailed)?;

        let mut req = self.client
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(body);

        for (key, value) in &self.config.headers {
            req = req.header(key, value);
        }

        let response = req.send().await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let retry_after = response.headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, retry_after, text, model));
        }

        response.json().await
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }
}

impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn models(&self) -> Vec<String> {
        vec![
            "gemini-2.0-flash-001".into(),
            "gemini-2.0-flash-lite-001".into(),
            "gemini-2.5-flash".into(),
            "gemini-2.5-pro".into(),
        ]
    }

    fn default_model(&self) -> &str {
        self.config.default_model.as_deref().unwrap_or(DEFAULT_TEXT_MODEL)
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let model = request.model.clone().unwrap_or_else(|| self.default_model().to_string());
        let api_request = build_generate_request(&request);

        let url = format!("{}/models/{}:generateContent", self.base_url(), model);
        let api_response: GenerateContentResponse = self.post_json(url, &api_request, &model).await?;

        into_completion(api_response, &model)
    }
}

impl ImageProvider for GeminiProvider {
    fn default_image_model(&self) -> &str {
        self.config.image_model.as_deref().unwrap_or(DEFAULT_IMAGE_MODEL)
    }

    async fn generate_images(&self, request: ImageRequest) -> Result<ImageResponse, ProviderError> {
        let model = request.model.clone().unwrap_or_else(|| self.default_image_model().to_string());
        let api_request = build_predict_request(&request);

        let url = format!("{}/models/{}:predict", self.base_url(), model);
        let api_response: PredictResponse = self.post_json(url, &api_request, &model).await?;

        into_image_response(api_response)
    }
}

// ============================================================================
// Request / response mapping
// ============================================================================

fn status_error(status: u16, retry_after: Option<u64>, message: String, model: &str) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited { retry_after },
        401 | 403 => ProviderError::AuthenticationFailed,
        404 => ProviderError::ModelNotFound(model.to_string()),
        400 => ProviderError::InvalidRequest(message),
        _ => ProviderError::Api { status, message },
    }
}

fn build_generate_request(request: &CompletionRequest) -> GenerateContentRequest {
    let mut system = Vec::new();
    let mut contents = Vec::new();

    for msg in &request.messages {
        let Some(text) = msg.content.clone() else { continue };
        match msg.role {
            Role::System => system.push(text),
            Role::User => contents.push(GeminiContent::new("user", text)),
            Role::Assistant => contents.push(GeminiContent::new("model", text)),
        }
    }

    let generation_config = if request.temperature.is_some()
        || request.max_tokens.is_some()
        || request.stop.is_some()
    {
        Some(GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_tokens,
            stop_sequences: request.stop.clone(),
        })
    } else {
        None
    };

    GenerateContentRequest {
        system_instruction: if system.is_empty() {
            None
        } else {
            Some(GeminiSystemInstruction {
                parts: vec![GeminiPart { text: Some(system.join("\n\n")) }],
            })
        },
        contents,
        generation_config,
    }
}

fn into_completion(response: GenerateContentResponse, model: &str) -> Result<CompletionResponse, ProviderError> {
    let candidate = response.candidates.first()
        .ok_or_else(|| match &response.prompt_feedback {
            Some(feedback) => ProviderError::Other(format!(
                "Prompt blocked: {}",
                feedback.block_reason.as_deref().unwrap_or("unknown reason")
            )),
            None => ProviderError::Other("No candidates in response".into()),
        })?;

    let text: String = candidate.content.as_ref()
        .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
        .unwrap_or_default();

    let finish_reason = match candidate.finish_reason.as_deref() {
        Some("STOP") => FinishReason::Stop,
        Some("MAX_TOKENS") => FinishReason::Length,
        Some("SAFETY") | Some("RECITATION") | Some("BLOCKLIST") | Some("PROHIBITED_CONTENT") => {
            FinishReason::ContentFilter
        }
        _ => FinishReason::Unknown,
    };

    let usage = response.usage_metadata.map(|u| Usage {
        prompt_tokens: u.prompt_token_count,
        completion_tokens: u.candidates_token_count,
        total_tokens: u.total_token_count,
    }).unwrap_or_default();

    Ok(CompletionResponse {
        id: response.response_id.unwrap_or_default(),
        model: response.model_version.unwrap_or_else(|| model.to_string()),
        content: if text.is_empty() { None } else { Some(text) },
        finish_reason,
        usage,
    })
}

fn build_predict_request(request: &ImageRequest) -> PredictRequest {
    PredictRequest {
        instances: vec![PredictInstance { prompt: request.prompt.clone() }],
        parameters: PredictParameters {
            sample_count: request.config.number_of_images,
            aspect_ratio: request.config.aspect_ratio.clone(),
            person_generation: request.config.person_generation,
            output_options: OutputOptions {
                mime_type: request.config.output_mime_type.clone(),
            },
        },
    }
}

fn into_image_response(response: PredictResponse) -> Result<ImageResponse, ProviderError> {
    let mut generated_images = Vec::new();

    // Filtered prompts come back as predictions without image bytes.
    for prediction in response.predictions.unwrap_or_default() {
        let Some(encoded) = prediction.bytes_base64_encoded else { continue };
        let image_bytes = STANDARD.decode(encoded.as_bytes())
            .map_err(|e| ProviderError::Parse(format!("invalid base64 image payload: {}", e)))?;
        generated_images.push(GeneratedImageData {
            image_bytes,
            mime_type: prediction.mime_type,
        });
    }

    Ok(ImageResponse { generated_images })
}

// ============================================================================
// Gemini API Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

impl GeminiContent {
    fn new(role: &str, text: String) -> Self {
        Self {
            role: Some(role.to_string()),
            parts: vec![GeminiPart { text: Some(text) }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
    prompt_feedback: Option<GeminiPromptFeedback>,
    model_version: Option<String>,
    response_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
    #[serde(default)]
    total_token_count: usize,
}

#[derive(Debug, Serialize)]
struct PredictRequest {
    instances: Vec<PredictInstance>,
    parameters: PredictParameters,
}

#[derive(Debug, Serialize)]
struct PredictInstance {
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
    aspect_ratio: String,
    person_generation: PersonGeneration,
    output_options: OutputOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutputOptions {
    mime_type: String,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    predictions: Option<Vec<Prediction>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}
