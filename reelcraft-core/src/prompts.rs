//! Prompt collection parsing
//!
//! Accepts a native list, or LLM text holding JSON (optionally inside a
//! markdown fence): `{"prompts": [...]}`, `{"image_prompts": [...]}` or a
//! bare array. List items are strings or objects with a `prompt` field.

use crate::error::{self, Result};
use crate::state::PromptSlot;
use serde_json::Value;

/// Object keys recognized as holding the prompt list
pub const PROMPT_LIST_KEYS: [&str; 2] = ["prompts", "image_prompts"];

/// Normalize a prompt slot into an ordered list of prompts.
pub fn parse_prompts(slot: &PromptSlot) -> Result<Vec<String>> {
    match slot {
        PromptSlot::List(items) => Ok(items.clone()),
        PromptSlot::Text(text) => parse_prompt_text(text),
    }
}

/// Parse prompts out of LLM-produced text.
pub fn parse_prompt_text(content: &str) -> Result<Vec<String>> {
    let json_str = strip_code_fence(content);

    let value: Value = serde_json::from_str(json_str).map_err(|e| {
        error::parse_error(format!("image prompts are not valid JSON: {}", e))
            .with_operation("prompts::parse_prompt_text")
            .set_source(e)
    })?;

    let items = match &value {
        Value::Array(items) => items,
        Value::Object(map) => PROMPT_LIST_KEYS
            .iter()
            .find_map(|key| map.get(*key))
            .and_then(Value::as_array)
            .ok_or_else(|| {
                error::parse_error(format!(
                    "expected an object with one of {:?} holding a list",
                    PROMPT_LIST_KEYS
                ))
                .with_operation("prompts::parse_prompt_text")
            })?,
        other => {
            return Err(error::parse_error(format!(
                "expected a JSON object or array, found {}",
                json_kind(other)
            ))
            .with_operation("prompts::parse_prompt_text"));
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| prompt_item(i, item))
        .collect()
}

/// Extract the body of a fenced block, or the trimmed text.
///
/// The info string after the opening fence (`json`, `JSON`, `jsonc`, ...) is
/// dropped when the body after it is a JSON array or object.
pub fn strip_code_fence(content: &str) -> &str {
    let Some(start) = content.find("```") else {
        return content.trim();
    };
    let rest = &content[start + 3..];
    let body = rest.find("```").map_or(rest, |end| &rest[..end]);

    let tag_len = body
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(body.len());
    let after_tag = body[tag_len..].trim();
    if after_tag.starts_with(&['{', '['][..]) {
        after_tag
    } else {
        body.trim()
    }
}

fn prompt_item(index: usize, item: &Value) -> Result<String> {
    match item {
        Value::String(s) => Ok(s.clone()),
        Value::Object(map) => map
            .get("prompt")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                error::parse_error(format!("prompt {} has no string 'prompt' field", index + 1))
                    .with_operation("prompts::parse_prompt_text")
            }),
        other => Err(error::parse_error(format!(
            "prompt {} is a {}, expected a string",
            index + 1,
            json_kind(other)
        ))
        .with_operation("prompts::parse_prompt_text")),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
