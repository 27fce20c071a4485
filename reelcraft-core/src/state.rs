//! # Pipeline State
//!
//! Typed shared state passed between stages. Each recognized slot is its own
//! field; absence is a normal condition (first iteration, or an earlier stage
//! produced nothing), so every slot is optional.

use crate::error::{self, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// The recognized state slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKey {
    GeneratedScript,
    ImagePrompts,
    GeneratedImages,
    FinalContentSummary,
}

impl StateKey {
    pub const ALL: [StateKey; 4] = [
        StateKey::GeneratedScript,
        StateKey::ImagePrompts,
        StateKey::GeneratedImages,
        StateKey::FinalContentSummary,
    ];

    /// Wire name of the slot
    pub fn as_str(&self) -> &'static str {
        match self {
            StateKey::GeneratedScript => "generated_script",
            StateKey::ImagePrompts => "image_prompts",
            StateKey::GeneratedImages => "generated_images",
            StateKey::FinalContentSummary => "final_content_summary",
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StateKey {
    type Err = error::Error;

    fn from_str(s: &str) -> Result<Self> {
        StateKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| error::Error::invalid_argument(format!("unknown state key '{}'", s)))
    }
}

/// Image prompts as produced upstream: a native list, or text an LLM wrote
/// (usually JSON, possibly fenced)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PromptSlot {
    List(Vec<String>),
    Text(String),
}

impl PromptSlot {
    /// True when there is nothing to parse
    pub fn is_empty(&self) -> bool {
        match self {
            PromptSlot::List(items) => items.is_empty(),
            PromptSlot::Text(text) => text.trim().is_empty(),
        }
    }
}

impl From<Vec<String>> for PromptSlot {
    fn from(items: Vec<String>) -> Self {
        PromptSlot::List(items)
    }
}

impl From<&str> for PromptSlot {
    fn from(text: &str) -> Self {
        PromptSlot::Text(text.to_string())
    }
}

/// Shared state of one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    generated_script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_prompts: Option<PromptSlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    generated_images: Option<Vec<PathBuf>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    final_content_summary: Option<String>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Typed accessors
    // =========================================================================

    pub fn generated_script(&self) -> Option<&str> {
        self.generated_script.as_deref()
    }

    pub fn set_generated_script(&mut self, script: impl Into<String>) {
        self.generated_script = Some(script.into());
    }

    pub fn image_prompts(&self) -> Option<&PromptSlot> {
        self.image_prompts.as_ref()
    }

    pub fn set_image_prompts(&mut self, prompts: impl Into<PromptSlot>) {
        self.image_prompts = Some(prompts.into());
    }

    pub fn generated_images(&self) -> Option<&[PathBuf]> {
        self.generated_images.as_deref()
    }

    pub fn set_generated_images(&mut self, paths: Vec<PathBuf>) {
        self.generated_images = Some(paths);
    }

    pub fn final_content_summary(&self) -> Option<&str> {
        self.final_content_summary.as_deref()
    }

    pub fn set_final_content_summary(&mut self, summary: impl Into<String>) {
        self.final_content_summary = Some(summary.into());
    }

    // =========================================================================
    // Keyed access
    // =========================================================================

    pub fn contains(&self, key: StateKey) -> bool {
        match key {
            StateKey::GeneratedScript => self.generated_script.is_some(),
            StateKey::ImagePrompts => self.image_prompts.is_some(),
            StateKey::GeneratedImages => self.generated_images.is_some(),
            StateKey::FinalContentSummary => self.final_content_summary.is_some(),
        }
    }

    /// Write text produced by an LLM stage into a slot.
    ///
    /// Fails for slots that do not hold text.
    pub fn set_text(&mut self, key: StateKey, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        match key {
            StateKey::GeneratedScript => self.generated_script = Some(text),
            StateKey::ImagePrompts => self.image_prompts = Some(PromptSlot::Text(text)),
            StateKey::FinalContentSummary => self.final_content_summary = Some(text),
            StateKey::GeneratedImages => {
                return Err(error::state_key_mismatch(key.as_str(), "a list of file paths")
                    .with_operation("state::set_text"));
            }
        }
        Ok(())
    }

    /// Human-readable content of a slot, for use in prompts
    pub fn render(&self, key: StateKey) -> Option<String> {
        match key {
            StateKey::GeneratedScript => self.generated_script.clone(),
            StateKey::ImagePrompts => self.image_prompts.as_ref().map(|slot| match slot {
                PromptSlot::Text(text) => text.clone(),
                PromptSlot::List(items) => items
                    .iter()
                    .enumerate()
                    .map(|(i, p)| format!("{}. {}", i + 1, p))
                    .collect::<Vec<_>>()
                    .join("\n"),
            }),
            StateKey::GeneratedImages => self.generated_images.as_ref().map(|paths| {
                paths
                    .iter()
                    .map(|p| format!("- {}", p.display()))
                    .collect::<Vec<_>>()
                    .join("\n")
            }),
            StateKey::FinalContentSummary => self.final_content_summary.clone(),
        }
    }

    /// Present slots as a JSON object keyed by wire name
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }
}
