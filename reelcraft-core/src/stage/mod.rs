//! # Pipeline Stages
//!
//! A stage is either an LLM call that writes text into a state slot, or the
//! image generation step. Both run against a [`Backend`] with the shared
//! [`PipelineContext`].

pub mod image;
pub mod llm;

pub use image::{
    GeneratedImage, GenerationStatus, ImageGenerationReport, ImageGenerationStage, ItemFailure,
    DEFAULT_OUTPUT_DIR,
};
pub use llm::{render_user_message, LlmStage};

use crate::context::PipelineContext;
use crate::error::Error;
use crate::event::Event;
use crate::provider::Backend;
use crate::state::StateKey;

#[derive(Debug, Clone)]
pub enum Stage {
    Llm(LlmStage),
    ImageGeneration(ImageGenerationStage),
}

/// What a single stage run produced
#[derive(Debug)]
pub enum StageOutcome {
    /// Reply text of an LLM stage
    Text(String),
    /// Report of the image step (which may itself be NoInput / Aborted)
    Images(ImageGenerationReport),
    Failed(Error),
}

impl StageOutcome {
    pub fn is_success(&self) -> bool {
        match self {
            StageOutcome::Text(_) => true,
            StageOutcome::Images(report) => report.success(),
            StageOutcome::Failed(_) => false,
        }
    }
}

impl Stage {
    pub fn name(&self) -> &str {
        match self {
            Stage::Llm(s) => &s.name,
            Stage::ImageGeneration(s) => &s.name,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Stage::Llm(s) => &s.description,
            Stage::ImageGeneration(s) => &s.description,
        }
    }

    /// Slot this stage writes
    pub fn output_key(&self) -> StateKey {
        match self {
            Stage::Llm(s) => s.output_key,
            Stage::ImageGeneration(_) => StateKey::GeneratedImages,
        }
    }

    /// Run the stage. An LLM failure is reported as one error event.
    pub async fn run<B: Backend>(&self, backend: &B, ctx: &mut PipelineContext) -> StageOutcome {
        match self {
            Stage::Llm(stage) => match stage.run(backend, ctx).await {
                Ok(text) => StageOutcome::Text(text),
                Err(err) => {
                    tracing::error!(stage = %stage.name, error = ?err, "stage failed");
                    ctx.emit(Event::error(&stage.name, format!("{} failed: {}", stage.name, err.message())));
                    StageOutcome::Failed(err)
                }
            },
            Stage::ImageGeneration(stage) => StageOutcome::Images(stage.run(backend, ctx).await),
        }
    }
}

impl From<LlmStage> for Stage {
    fn from(stage: LlmStage) -> Self {
        Stage::Llm(stage)
    }
}

impl From<ImageGenerationStage> for Stage {
    fn from(stage: ImageGenerationStage) -> Self {
        Stage::ImageGeneration(stage)
    }
}
