//! LLM-backed stage: instruction + user request + session state in, text out.

use crate::context::PipelineContext;
use crate::error::{self, Result};
use crate::event::Event;
use crate::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::state::{PipelineState, StateKey};

/// Heading of the state section appended to the user message
pub const SESSION_STATE_HEADING: &str = "## Session State";

#[derive(Debug, Clone)]
pub struct LlmStage {
    pub name: String,
    pub model: String,
    /// System instruction
    pub instruction: String,
    pub description: String,
    /// Slot the reply text is written to
    pub output_key: StateKey,
    pub temperature: Option<f32>,
}

impl LlmStage {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        instruction: impl Into<String>,
        output_key: StateKey,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            instruction: instruction.into(),
            description: String::new(),
            output_key,
            temperature: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Build the completion request for the current context
    pub fn build_request(&self, ctx: &PipelineContext) -> CompletionRequest {
        let user = render_user_message(&ctx.user_request, &ctx.state);
        let mut request = CompletionRequest::new(vec![
            ChatMessage::system(&self.instruction),
            ChatMessage::user(user),
        ])
        .with_model(&self.model);

        if let Some(temp) = self.temperature {
            request = request.with_temperature(temp);
        }
        request
    }

    /// Run one completion and write the reply into `output_key`.
    pub async fn run<P: LlmProvider>(&self, provider: &P, ctx: &mut PipelineContext) -> Result<String> {
        let request = self.build_request(ctx);
        tracing::debug!(stage = %self.name, model = %self.model, "requesting completion");

        let response = provider.complete(request).await.map_err(|e| {
            error::provider_failed(e, "stage::llm::run")
                .with_context("stage", self.name.clone())
                .with_context("model", self.model.clone())
        })?;

        ctx.usage.track(&self.model, &response.usage);

        let content = match response.content {
            Some(text) if !text.trim().is_empty() => text,
            _ => {
                return Err(error::empty_response(format!("{} received an empty reply", self.name))
                    .with_operation("stage::llm::run")
                    .with_context("model", self.model.clone()));
            }
        };

        ctx.state.set_text(self.output_key, content.clone())?;
        tracing::info!(
            stage = %self.name,
            slot = %self.output_key,
            chars = content.len(),
            "stage output stored"
        );
        ctx.emit(Event::message(&self.name, content.clone()));
        Ok(content)
    }
}

/// The user request, followed by every present slot under its wire name.
pub fn render_user_message(user_request: &str, state: &PipelineState) -> String {
    let sections: Vec<String> = StateKey::ALL
        .iter()
        .filter_map(|key| state.render(*key).map(|body| format!("### {}\n{}", key, body)))
        .collect();

    if sections.is_empty() {
        return user_request.to_string();
    }
    format!("{}\n\n{}\n\n{}", user_request, SESSION_STATE_HEADING, sections.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Role;
    use std::path::PathBuf;

    #[test]
    fn test_user_message_without_state_is_the_request() {
        let state = PipelineState::new();
        assert_eq!(render_user_message("a reel about bees", &state), "a reel about bees");
    }

    #[test]
    fn test_user_message_renders_present_slots_in_order() {
        let mut state = PipelineState::new();
        state.set_generated_images(vec![PathBuf::from("output/images/image_1.jpg")]);
        state.set_generated_script("Hook: bees dance.");

        let msg = render_user_message("a reel about bees", &state);
        assert_eq!(
            msg,
            "a reel about bees\n\n## Session State\n\n\
             ### generated_script\nHook: bees dance.\n\n\
             ### generated_images\n- output/images/image_1.jpg"
        );
    }

    #[test]
    fn test_build_request() {
        let stage = LlmStage::new("ScriptWriter", "gemini-2.0-flash-001", "Write scripts.", StateKey::GeneratedScript)
            .with_temperature(0.7);
        let ctx = PipelineContext::new("bees");

        let request = stage.build_request(&ctx);
        assert_eq!(request.model.as_deref(), Some("gemini-2.0-flash-001"));
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[0].content.as_deref(), Some("Write scripts."));
        assert_eq!(request.messages[1].content.as_deref(), Some("bees"));
    }
}
