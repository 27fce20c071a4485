//! # Image Generation Stage
//!
//! Reads prompts from `image_prompts`, calls the image backend once per
//! prompt (strictly in order), saves each result and publishes the saved
//! paths to `generated_images`.
//!
//! Failure policy:
//! - absent, empty or unparsable prompts: one error event, nothing written;
//! - backend returns no image for a prompt: error event, skip, continue;
//! - anything else (backend error, save failure): one error event, stop.
//!   Paths published before the failure stay in state.

use crate::context::PipelineContext;
use crate::error::{self, Error, ErrorKind, Result};
use crate::event::Event;
use crate::image_io::save_image_from_bytes;
use crate::prompts::parse_prompts;
use crate::provider::{ImageGenerationConfig, ImageProvider, ImageRequest};
use crate::state::StateKey;
use std::path::{Path, PathBuf};
use tracing::Instrument;

/// Where images go unless configured otherwise
pub const DEFAULT_OUTPUT_DIR: &str = "output/images";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStatus {
    /// The loop ran over every prompt
    Completed,
    /// No usable prompts; nothing was attempted
    NoInput,
    /// An unexpected failure stopped the loop
    Aborted,
}

/// A saved image and the prompt it came from (1-based index)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub index: usize,
    pub prompt: String,
    pub path: PathBuf,
}

/// A prompt that produced no image (1-based index)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub index: usize,
    pub prompt: String,
    pub reason: String,
}

/// Typed outcome of one invocation
#[derive(Debug)]
pub struct ImageGenerationReport {
    pub status: GenerationStatus,
    /// Number of prompts parsed from state
    pub requested: usize,
    pub images: Vec<GeneratedImage>,
    pub failures: Vec<ItemFailure>,
    /// Why the step stopped early, for `NoInput` and `Aborted`
    pub error: Option<Error>,
}

impl ImageGenerationReport {
    fn started(requested: usize) -> Self {
        Self {
            status: GenerationStatus::Completed,
            requested,
            images: Vec::new(),
            failures: Vec::new(),
            error: None,
        }
    }

    fn no_input(err: Error) -> Self {
        Self {
            status: GenerationStatus::NoInput,
            requested: 0,
            images: Vec::new(),
            failures: Vec::new(),
            error: Some(err),
        }
    }

    pub fn success(&self) -> bool {
        self.status == GenerationStatus::Completed
    }

    /// `InputMissing` or `ParseFailed` for `NoInput`; whatever stopped the
    /// loop for `Aborted`
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(Error::kind)
    }

    /// Saved paths, in prompt order
    pub fn paths(&self) -> Vec<PathBuf> {
        self.images.iter().map(|img| img.path.clone()).collect()
    }
}

/// The image generation step
#[derive(Debug, Clone)]
pub struct ImageGenerationStage {
    pub name: String,
    pub description: String,
    pub output_dir: PathBuf,
    /// `None` uses the backend's default image model
    pub model: Option<String>,
    pub config: ImageGenerationConfig,
}

impl Default for ImageGenerationStage {
    fn default() -> Self {
        Self {
            name: "ImageGenerator".into(),
            description: "Generates images from prompts".into(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            model: None,
            config: ImageGenerationConfig::default(),
        }
    }
}

impl ImageGenerationStage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_config(mut self, config: ImageGenerationConfig) -> Self {
        self.config = config;
        self
    }

    /// Deterministic destination for the image of prompt `index` (1-based)
    pub fn image_path(&self, index: usize) -> PathBuf {
        self.output_dir
            .join(format!("image_{}.{}", index, self.config.file_extension()))
    }

    pub async fn run<B: ImageProvider>(&self, backend: &B, ctx: &mut PipelineContext) -> ImageGenerationReport {
        let span = tracing::info_span!("stage.image", stage = %self.name);
        self.generate_all(backend, ctx).instrument(span).await
    }

    async fn generate_all<B: ImageProvider>(&self, backend: &B, ctx: &mut PipelineContext) -> ImageGenerationReport {
        let prompts = match self.fetch_prompts(ctx) {
            Ok(prompts) => prompts,
            Err(err) => {
                ctx.emit(Event::error(&self.name, no_input_text(&err)));
                return ImageGenerationReport::no_input(err);
            }
        };

        let total = prompts.len();
        let mut report = ImageGenerationReport::started(total);

        if let Err(err) = prepare_output_dir(&self.output_dir) {
            self.abort(ctx, &mut report, err, "preparing the output directory".into());
            return report;
        }

        for (i, prompt) in prompts.iter().enumerate() {
            let index = i + 1;
            ctx.emit(Event::status(&self.name, format!("Generating image {}/{}...", index, total)));

            match self.generate_one(backend, index, prompt).await {
                Ok(Some(path)) => {
                    report.images.push(GeneratedImage {
                        index,
                        prompt: prompt.clone(),
                        path,
                    });
                    ctx.state.set_generated_images(report.paths());
                }
                Ok(None) => {
                    tracing::warn!(index, "backend returned no image");
                    ctx.emit(Event::error(
                        &self.name,
                        format!("Failed to generate image {}: no image returned", index),
                    ));
                    report.failures.push(ItemFailure {
                        index,
                        prompt: prompt.clone(),
                        reason: "no image returned".into(),
                    });
                }
                Err(err) => {
                    self.abort(ctx, &mut report, err, format!("image {}/{}", index, total));
                    return report;
                }
            }
        }

        ctx.state.set_generated_images(report.paths());
        ctx.emit(Event::status(
            &self.name,
            format!(
                "Successfully generated {} images in '{}'",
                report.images.len(),
                self.output_dir.display()
            ),
        ));
        report
    }

    /// Read and normalize the prompt slot.
    ///
    /// Absent, blank or empty-list slots are `InputMissing`; content that is
    /// not a prompt list is `ParseFailed`.
    fn fetch_prompts(&self, ctx: &PipelineContext) -> Result<Vec<String>> {
        let missing = || {
            error::input_missing(StateKey::ImagePrompts.as_str()).with_operation("stage::image::fetch_prompts")
        };

        let slot = match ctx.state.image_prompts() {
            Some(slot) if !slot.is_empty() => slot,
            _ => return Err(missing()),
        };

        let prompts = parse_prompts(slot).map_err(|err| {
            tracing::error!(error = ?err, "unparsable image prompts");
            err.with_operation("stage::image::fetch_prompts")
        })?;

        if prompts.is_empty() {
            return Err(missing());
        }
        Ok(prompts)
    }

    /// `Ok(None)` when the backend produced no image for this prompt.
    async fn generate_one<B: ImageProvider>(&self, backend: &B, index: usize, prompt: &str) -> Result<Option<PathBuf>> {
        let mut request = ImageRequest::new(prompt).with_config(self.config.clone());
        if let Some(model) = &self.model {
            request = request.with_model(model.clone());
        }

        let response = backend.generate_images(request).await.map_err(|e| {
            error::provider_failed(e, "stage::image::generate_one")
                .with_context("index", index.to_string())
        })?;

        let Some(image) = response.first() else {
            return Ok(None);
        };

        let path = save_image_from_bytes(&image.image_bytes, self.image_path(index))
            .map_err(|e| e.with_operation("stage::image::generate_one").with_context("index", index.to_string()))?;
        Ok(Some(path))
    }

    fn abort(&self, ctx: &mut PipelineContext, report: &mut ImageGenerationReport, err: Error, at: String) {
        tracing::error!(error = ?err, at = %at, "image generation aborted");
        ctx.emit(Event::error(
            &self.name,
            format!("Image generation failed at {}: {}", at, err.message()),
        ));
        report.status = GenerationStatus::Aborted;
        report.error = Some(err);
    }
}

/// Event text for a step that never started
fn no_input_text(err: &Error) -> String {
    match err.kind() {
        ErrorKind::InputMissing => "No image prompts found in session state.".into(),
        ErrorKind::ParseFailed => format!("Failed to parse image prompts: {}", err.message()),
        _ => err.message().to_string(),
    }
}

fn prepare_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| {
        Error::from(e)
            .with_operation("stage::image::prepare_output_dir")
            .with_context("dir", dir.display().to_string())
    })
}
