//! Content creator - the four-stage loop pipeline and its entry point

use reelcraft_core::{
    get_client, get_client_with_lookup, load_instruction_from_file, Backend, Event, GeminiProvider, ImageGenerationStage,
    LlmStage, LoopPipeline, PipelineContext, PipelineState, Result, RunReport, StateKey,
    UsageTracker, DEFAULT_INSTRUCTION, DEFAULT_MAX_ITERATIONS, DEFAULT_TEXT_MODEL,
};
use std::path::{Path, PathBuf};

/// Instruction templates shipped with this crate
pub const INSTRUCTIONS_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/instructions");

pub const SCRIPTWRITER_INSTRUCTION_FILE: &str = "scriptwriter_instruction.txt";
pub const IMAGE_PROMPT_INSTRUCTION_FILE: &str = "image_prompt_instruction.txt";

pub const FORMATTER_INSTRUCTION: &str = "\
Create a final summary combining the script from the `generated_script` section \
and the generated images from the `generated_images` section of the session state.

Format the output as:

# Generated Content Summary

## Script
[Include the full script here]

## Generated Images
[List the image files that were created]

## Usage Instructions
- The script can be used for voiceover or text content
- Images are saved locally and can be used for visual content
- All files are organized in the output directory";

/// Configuration for the content creator
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Print every event as it happens
    pub verbose: bool,
    /// Where instruction templates are read from
    pub instructions_dir: PathBuf,
    /// Where generated images are written
    pub output_dir: PathBuf,
    /// Model for the LLM stages
    pub model: String,
    pub max_iterations: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            verbose: true,
            instructions_dir: PathBuf::from(INSTRUCTIONS_DIR),
            output_dir: PathBuf::from(reelcraft_core::stage::DEFAULT_OUTPUT_DIR),
            model: DEFAULT_TEXT_MODEL.to_string(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl AgentConfig {
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_instructions_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.instructions_dir = dir.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }
}

pub fn scriptwriter_stage(config: &AgentConfig) -> LlmStage {
    let instruction = load_instruction(&config.instructions_dir, SCRIPTWRITER_INSTRUCTION_FILE);
    LlmStage::new("ScriptWriter", &config.model, instruction, StateKey::GeneratedScript)
        .with_description("Creates engaging scripts for short-form content")
}

pub fn image_prompt_stage(config: &AgentConfig) -> LlmStage {
    let instruction = load_instruction(&config.instructions_dir, IMAGE_PROMPT_INSTRUCTION_FILE);
    LlmStage::new("ImagePromptGenerator", &config.model, instruction, StateKey::ImagePrompts)
        .with_description("Converts scripts into detailed image prompts")
}

pub fn image_generator_stage(config: &AgentConfig) -> ImageGenerationStage {
    ImageGenerationStage::new("ImageGenerator")
        .with_description("Generates images from prompts using Imagen 3.0")
        .with_output_dir(&config.output_dir)
}

pub fn formatter_stage(config: &AgentConfig) -> LlmStage {
    LlmStage::new(
        "ContentFormatter",
        &config.model,
        FORMATTER_INSTRUCTION,
        StateKey::FinalContentSummary,
    )
    .with_description("Formats the final content summary")
}

/// Script -> image prompts -> images -> summary, looped `max_iterations` times
pub fn content_creator_agent(config: &AgentConfig) -> LoopPipeline {
    LoopPipeline::new("content_creator_agent")
        .with_description("Creates scripts, generates corresponding images, and provides a final summary")
        .with_max_iterations(config.max_iterations)
        .with_stage(scriptwriter_stage(config))
        .with_stage(image_prompt_stage(config))
        .with_stage(image_generator_stage(config))
        .with_stage(formatter_stage(config))
}

fn load_instruction(dir: &Path, filename: &str) -> String {
    load_instruction_from_file(dir, filename, DEFAULT_INSTRUCTION)
}

/// Result from a content creator run
#[derive(Debug)]
pub struct AgentResult {
    /// Final shared state
    pub state: PipelineState,
    /// Every event, in emission order
    pub events: Vec<Event>,
    pub report: RunReport,
    pub usage: UsageTracker,
}

impl AgentResult {
    pub fn summary(&self) -> Option<&str> {
        self.state.final_content_summary()
    }

    pub fn images(&self) -> &[PathBuf] {
        self.state.generated_images().unwrap_or_default()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "state": self.state.to_json(),
            "events": self.events,
            "iterations": self.report.iterations,
            "total_tokens": self.usage.total_tokens(),
        })
    }
}

/// Runs the content creator pipeline against a backend
pub struct ContentCreator<B: Backend> {
    backend: B,
    pipeline: LoopPipeline,
    config: AgentConfig,
}

impl ContentCreator<GeminiProvider> {
    /// Build against the hosted backend. Fails immediately without an API key.
    pub fn from_env(config: AgentConfig, api_key: Option<&str>) -> Result<Self> {
        let backend = get_client(api_key)?;
        Ok(Self::new(backend, config))
    }

    /// Like [`ContentCreator::from_env`], resolving `GOOGLE_API_KEY` through `lookup`
    pub fn from_lookup(
        config: AgentConfig,
        api_key: Option<&str>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let backend = get_client_with_lookup(api_key, lookup)?;
        Ok(Self::new(backend, config))
    }
}

impl<B: Backend> ContentCreator<B> {
    pub fn new(backend: B, config: AgentConfig) -> Self {
        let pipeline = content_creator_agent(&config);
        Self {
            backend,
            pipeline,
            config,
        }
    }

    pub fn pipeline(&self) -> &LoopPipeline {
        &self.pipeline
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run the pipeline for one user request
    pub async fn run(&self, request: &str) -> AgentResult {
        let mut ctx = PipelineContext::new(request);
        if self.config.verbose {
            println!("Request: {}\n", request);
            ctx = ctx.with_listener(|event| println!("[{}]: {}", event.author, event.text));
        }

        let report = self.pipeline.run(&self.backend, &mut ctx).await;
        let (state, events, usage) = ctx.into_parts();

        if self.config.verbose {
            println!(
                "\nFinished {} iterations, {} stage failures, ~{} tokens",
                report.iterations,
                report.failures().count(),
                usage.total_tokens()
            );
        }
        tracing::info!(
            iterations = report.iterations,
            images = state.generated_images().map_or(0, |p| p.len()),
            "content creator finished"
        );

        AgentResult {
            state,
            events,
            report,
            usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelcraft_core::{ErrorKind, Stage};
    use tempfile::TempDir;

    #[test]
    fn test_pipeline_layout() {
        let pipeline = content_creator_agent(&AgentConfig::default());
        assert_eq!(pipeline.name, "content_creator_agent");
        assert_eq!(pipeline.max_iterations, 3);
        assert_eq!(
            pipeline.stage_names(),
            vec!["ScriptWriter", "ImagePromptGenerator", "ImageGenerator", "ContentFormatter"]
        );

        let outputs: Vec<_> = pipeline.stages.iter().map(Stage::output_key).collect();
        assert_eq!(
            outputs,
            vec![
                StateKey::GeneratedScript,
                StateKey::ImagePrompts,
                StateKey::GeneratedImages,
                StateKey::FinalContentSummary,
            ]
        );
    }

    #[test]
    fn test_bundled_instructions_load() {
        let config = AgentConfig::default();
        let script = scriptwriter_stage(&config);
        let prompts = image_prompt_stage(&config);
        assert_ne!(script.instruction, DEFAULT_INSTRUCTION);
        assert!(prompts.instruction.contains("\"prompts\""));
        assert_eq!(script.model, DEFAULT_TEXT_MODEL);
    }

    #[test]
    fn test_missing_instructions_fall_back() {
        let dir = TempDir::new().unwrap();
        let config = AgentConfig::default().with_instructions_dir(dir.path());
        assert_eq!(scriptwriter_stage(&config).instruction, DEFAULT_INSTRUCTION);
        assert_eq!(image_prompt_stage(&config).instruction, DEFAULT_INSTRUCTION);
    }

    #[test]
    fn test_formatter_instruction_sections() {
        for heading in ["# Generated Content Summary", "## Script", "## Generated Images", "## Usage Instructions"] {
            assert!(FORMATTER_INSTRUCTION.contains(heading));
        }
    }

    #[test]
    fn test_from_env_with_explicit_key() {
        let creator = ContentCreator::from_env(AgentConfig::default(), Some("test-key")).unwrap();
        assert_eq!(creator.pipeline().stages.len(), 4);
        assert!(creator.config().verbose);
    }

    #[test]
    fn test_from_lookup_requires_a_key() {
        let err = ContentCreator::from_lookup(AgentConfig::default(), None, |_| None)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert_eq!(err.message(), "GOOGLE_API_KEY environment variable not set.");

        let creator = ContentCreator::from_lookup(AgentConfig::default(), None, |_| Some("from-env".into())).unwrap();
        assert_eq!(creator.pipeline().stages.len(), 4);
    }
}
