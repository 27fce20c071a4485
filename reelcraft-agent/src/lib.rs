//! # Reelcraft Agent
//!
//! The content creator pipeline:
//! 1. ScriptWriter writes a short-form script for the user's topic
//! 2. ImagePromptGenerator turns the script into image prompts (JSON)
//! 3. ImageGenerator renders one image per prompt and saves it locally
//! 4. ContentFormatter combines script and image paths into a summary
//!
//! The four stages run in order, looped up to `max_iterations` times.

mod agent;

pub use agent::{
    content_creator_agent, formatter_stage, image_generator_stage, image_prompt_stage,
    scriptwriter_stage, AgentConfig, AgentResult, ContentCreator, FORMATTER_INSTRUCTION,
    IMAGE_PROMPT_INSTRUCTION_FILE, INSTRUCTIONS_DIR, SCRIPTWRITER_INSTRUCTION_FILE,
};
