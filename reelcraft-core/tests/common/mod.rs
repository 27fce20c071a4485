//! Scripted in-memory backend shared by the integration tests.

#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use reelcraft_core::{
    CompletionRequest, CompletionResponse, FinishReason, GeneratedImageData, ImageProvider,
    ImageRequest, ImageResponse, LlmProvider, ProviderError, Role, Usage,
};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::Mutex;

pub enum ImageReply {
    Image,
    Empty,
    Fail(ProviderError),
}

/// Text replies are chosen by a marker found in the system instruction.
/// Image replies are consumed in call order; once exhausted every call
/// returns an image.
#[derive(Default)]
pub struct FakeBackend {
    text_replies: Vec<(String, Result<String, ProviderError>)>,
    image_replies: Mutex<VecDeque<ImageReply>>,
    pub completions: Mutex<Vec<CompletionRequest>>,
    pub image_prompts: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, marker: &str, reply: &str) -> Self {
        self.text_replies.push((marker.to_string(), Ok(reply.to_string())));
        self
    }

    pub fn with_text_error(mut self, marker: &str, err: ProviderError) -> Self {
        self.text_replies.push((marker.to_string(), Err(err)));
        self
    }

    pub fn with_images(self, replies: Vec<ImageReply>) -> Self {
        *self.image_replies.lock().unwrap() = replies.into();
        self
    }

    pub fn image_calls(&self) -> usize {
        self.image_prompts.lock().unwrap().len()
    }

    /// User messages of every completion, in call order
    pub fn user_messages(&self) -> Vec<String> {
        self.completions
            .lock()
            .unwrap()
            .iter()
            .filter_map(|req| {
                req.messages
                    .iter()
                    .find(|m| m.role == Role::User)
                    .and_then(|m| m.content.clone())
            })
            .collect()
    }
}

fn clone_error(err: &ProviderError) -> ProviderError {
    match err {
        ProviderError::Network(m) => ProviderError::Network(m.clone()),
        ProviderError::Api { status, message } => ProviderError::Api {
            status: *status,
            message: message.clone(),
        },
        ProviderError::Parse(m) => ProviderError::Parse(m.clone()),
        ProviderError::RateLimited { retry_after } => ProviderError::RateLimited {
            retry_after: *retry_after,
        },
        ProviderError::InvalidRequest(m) => ProviderError::InvalidRequest(m.clone()),
        ProviderError::ModelNotFound(m) => ProviderError::ModelNotFound(m.clone()),
        ProviderError::AuthenticationFailed => ProviderError::AuthenticationFailed,
        ProviderError::Other(m) => ProviderError::Other(m.clone()),
    }
}

impl LlmProvider for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    fn models(&self) -> Vec<String> {
        vec!["fake-text".to_string()]
    }

    fn default_model(&self) -> &str {
        "fake-text"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let system = request
            .messages
            .iter()
            .find(|m| m.role == Role::System)
            .and_then(|m| m.content.clone())
            .unwrap_or_default();
        let model = request.model.clone().unwrap_or_else(|| "fake-text".to_string());
        self.completions.lock().unwrap().push(request);

        let reply = self
            .text_replies
            .iter()
            .find(|(marker, _)| system.contains(marker.as_str()))
            .map(|(_, reply)| match reply {
                Ok(text) => Ok(text.clone()),
                Err(err) => Err(clone_error(err)),
            })
            .unwrap_or_else(|| Ok("ok".to_string()))?;

        Ok(CompletionResponse {
            id: "fake-1".to_string(),
            model,
            content: Some(reply),
            finish_reason: FinishReason::Stop,
            usage: Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
        })
    }
}

impl ImageProvider for FakeBackend {
    fn default_image_model(&self) -> &str {
        "fake-image"
    }

    async fn generate_images(&self, request: ImageRequest) -> Result<ImageResponse, ProviderError> {
        self.image_prompts.lock().unwrap().push(request.prompt);

        match self.image_replies.lock().unwrap().pop_front().unwrap_or(ImageReply::Image) {
            ImageReply::Image => Ok(ImageResponse {
                generated_images: vec![GeneratedImageData {
                    image_bytes: png_bytes(),
                    mime_type: Some("image/png".to_string()),
                }],
            }),
            ImageReply::Empty => Ok(ImageResponse::default()),
            ImageReply::Fail(err) => Err(err),
        }
    }
}

/// A small opaque PNG
pub fn png_bytes() -> Vec<u8> {
    let img = RgbImage::from_pixel(4, 8, Rgb([200, 40, 40]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Route `tracing` output to the test harness when RUST_LOG is set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
