//! # Reelcraft Core
//!
//! Building blocks of the short-form content pipeline.
//!
//! ## Core Concepts
//! - **State**: Typed slots shared by stages (`generated_script`, `image_prompts`, ...)
//! - **Context**: Per-run state, event log and token usage, passed by `&mut`
//! - **Stages**: LLM calls that write text into a slot, and the image generation step
//! - **Pipeline**: Sequential loop runner over a fixed stage list
//! - **Provider**: Trait-based backend access (Gemini text + Imagen images)

pub mod client;
pub mod context;
pub mod error;
pub mod event;
pub mod image_io;
pub mod instruction;
pub mod pipeline;
pub mod prompts;
pub mod provider;
pub mod stage;
pub mod state;

pub use client::{
    get_client, get_client_with_config, get_client_with_config_lookup, get_client_with_lookup,
    resolve_api_key, API_KEY_ENV,
};
pub use context::PipelineContext;
pub use error::{Error, ErrorKind, ErrorStatus, Result};
pub use event::{Event, EventKind};
pub use image_io::save_image_from_bytes;
pub use instruction::{load_instruction_from_file, DEFAULT_INSTRUCTION};
pub use pipeline::{LoopPipeline, RunReport, StageRecord, DEFAULT_MAX_ITERATIONS};
pub use prompts::{parse_prompt_text, parse_prompts, strip_code_fence};
pub use provider::{
    Backend, ChatMessage, CompletionRequest, CompletionResponse, FinishReason, GeminiProvider,
    GeneratedImageData, ImageGenerationConfig, ImageProvider, ImageRequest, ImageResponse,
    LlmProvider, PersonGeneration, ProviderConfig, ProviderError, Role, Usage, UsageTracker,
    DEFAULT_IMAGE_MODEL, DEFAULT_TEXT_MODEL,
};
pub use stage::{
    GeneratedImage, GenerationStatus, ImageGenerationReport, ImageGenerationStage, ItemFailure,
    LlmStage, Stage, StageOutcome,
};
pub use state::{PipelineState, PromptSlot, StateKey};
