use std::collections::HashSet;
use std::sync::LazyLock;

use anyhow::{anyhow, Result};
use regex::Regex;
use serde_json::{json, Value};

use super::base::Usage;
use super::types::{
    content::{Content, Text, ToolUse},
    message::{Message, Role},
    tool::Tool,
};

static INVALID_NAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_-]").expect("static regex"));
static VALID_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("static regex"));

/// Convert internal Message format to the chat-completions message list.
///
/// Tool results become separate `tool` messages that follow the message
/// carrying them.
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec = Vec::new();

    for message in messages {
        let mut content_text: Option<&str> = None;
        let mut tool_calls = Vec::new();
        let mut output = Vec::new();

        for content in &message.content {
            match content {
                Content::Text(Text { text }) => {
                    content_text = Some(text);
                }
                Content::ToolUse(tool_use) => {
                    tool_calls.push(json!({
                        "id": tool_use.id,
                        "type": "function",
                        "function": {
                            "name": sanitize_function_name(&tool_use.name),
                            "arguments": tool_use.parameters.to_string(),
                        }
                    }));
                }
                Content::ToolResult(tool_result) => {
                    output.push(json!({
                        "role": "tool",
                        "content": tool_result.output,
                        "tool_call_id": tool_result.tool_use_id
                    }));
                }
            }
        }

        if content_text.is_some() || !tool_calls.is_empty() {
            let mut converted = json!({ "role": message.role });
            if let Some(text) = content_text {
                converted["content"] = json!(text);
            }
            if !tool_calls.is_empty() {
                converted["tool_calls"] = Value::Array(tool_calls);
            }
            output.insert(0, converted);
        }
        messages_spec.extend(output);
    }

    messages_spec
}

/// Convert internal Tool format to the chat-completions tool specification
pub fn tools_to_openai_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.parameters,
            }
        }));
    }

    Ok(result)
}

/// Convert a chat-completions response body to an assistant Message
pub fn openai_response_to_message(response: &Value) -> Result<Message> {
    let original = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| anyhow!("Malformed response: no choices[0].message in {}", response))?;
    let mut content = Vec::new();

    if let Some(text) = original.get("content").and_then(|v| v.as_str()) {
        content.push(Content::Text(Text {
            text: text.to_string(),
        }));
    }

    if let Some(tool_calls) = original.get("tool_calls").and_then(|v| v.as_array()) {
        for tool_call in tool_calls {
            let id = tool_call["id"].as_str().unwrap_or_default().to_string();
            let function_name = tool_call["function"]["name"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            let arguments = tool_call["function"]["arguments"]
                .as_str()
                .unwrap_or_default()
                .to_string();

            if !is_valid_function_name(&function_name) {
                content.push(Content::ToolUse(ToolUse {
                    id,
                    name: function_name.clone(),
                    parameters: json!(arguments),
                    is_error: true,
                    error_message: Some(format!(
                        "The provided function name '{}' had invalid characters, it must match this regex [a-zA-Z0-9_-]+",
                        function_name
                    )),
                }));
                continue;
            }

            // Some endpoints send "" for argument-less calls
            let parsed = if arguments.trim().is_empty() {
                Ok(json!({}))
            } else {
                serde_json::from_str::<Value>(&arguments)
            };

            match parsed {
                Ok(params) => content.push(Content::ToolUse(ToolUse {
                    id,
                    name: function_name,
                    parameters: params,
                    is_error: false,
                    error_message: None,
                })),
                Err(_) => content.push(Content::ToolUse(ToolUse {
                    id: id.clone(),
                    name: function_name,
                    parameters: json!(arguments),
                    is_error: true,
                    error_message: Some(format!(
                        "Could not interpret tool use parameters for id {}: {}",
                        id, arguments
                    )),
                })),
            }
        }
    }

    Message::new(Role::Assistant, content)
}

pub fn get_usage(data: &Value) -> Usage {
    let Some(usage) = data.get("usage") else {
        return Usage::default();
    };

    let count = |key: &str| usage.get(key).and_then(|v| v.as_i64()).map(|v| v as i32);
    let input_tokens = count("prompt_tokens");
    let output_tokens = count("completion_tokens");
    let total_tokens = count("total_tokens").or(match (input_tokens, output_tokens) {
        (Some(input), Some(output)) => Some(input + output),
        _ => None,
    });

    Usage::new(input_tokens, output_tokens, total_tokens)
}

pub fn sanitize_function_name(name: &str) -> String {
    INVALID_NAME_CHARS.replace_all(name, "_").to_string()
}

pub fn is_valid_function_name(name: &str) -> bool {
    VALID_NAME.is_match(name)
}

#[derive(Debug, thiserror::Error)]
#[error("Input message too long. Message: {0}")]
pub struct ContextLengthExceeded(String);

pub fn check_openai_context_length_error(error: &Value) -> Option<ContextLengthExceeded> {
    let code = error.get("code")?.as_str()?;
    if code == "context_length_exceeded" || code == "string_above_max_length" {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        Some(ContextLengthExceeded(message))
    } else {
        None
    }
}
