use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use super::content::{Content, Text, ToolResult, ToolUse};
use super::objectid::create_object_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One item of the conversation history.
///
/// Tool results ride on user-role messages and are expanded into `tool`
/// messages when converted to the wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub id: String,
    pub created: i64,
    pub content: Vec<Content>,
}

impl Message {
    pub fn new(role: Role, content: Vec<Content>) -> Result<Self> {
        let msg = Self {
            role,
            id: create_object_id("msg"),
            created: chrono::Utc::now().timestamp(),
            content,
        };
        msg.validate()?;
        Ok(msg)
    }

    fn validate(&self) -> Result<()> {
        match self.role {
            Role::User => {
                if !self.has_text() && !self.has_tool_result() {
                    return Err(anyhow!("User message must include a Text or ToolResult"));
                }
                if self.has_tool_use() {
                    return Err(anyhow!("User message does not support ToolUse"));
                }
            }
            Role::Assistant => {
                if !self.has_text() && !self.has_tool_use() {
                    return Err(anyhow!("Assistant message must include a Text or ToolUse"));
                }
                if self.has_tool_result() {
                    return Err(anyhow!("Assistant message does not support ToolResult"));
                }
            }
        }
        Ok(())
    }

    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|content| match content {
                Content::Text(text) => Some(text.text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn tool_use(&self) -> Vec<ToolUse> {
        self.content
            .iter()
            .filter_map(|content| match content {
                Content::ToolUse(tool_use) => Some(tool_use.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn tool_result(&self) -> Vec<ToolResult> {
        self.content
            .iter()
            .filter_map(|content| match content {
                Content::ToolResult(tool_result) => Some(tool_result.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn has_text(&self) -> bool {
        self.content.iter().any(|c| matches!(c, Content::Text(_)))
    }

    pub fn has_tool_use(&self) -> bool {
        self.content.iter().any(|c| matches!(c, Content::ToolUse(_)))
    }

    pub fn has_tool_result(&self) -> bool {
        self.content.iter().any(|c| matches!(c, Content::ToolResult(_)))
    }

    /// User input is forwarded verbatim, empty strings included.
    pub fn user(text: &str) -> Result<Self> {
        Self::new(
            Role::User,
            vec![Content::Text(Text {
                text: text.to_string(),
            })],
        )
    }

    pub fn assistant(text: &str) -> Result<Self> {
        Self::new(
            Role::Assistant,
            vec![Content::Text(Text {
                text: text.to_string(),
            })],
        )
    }

    pub fn tool_results(results: Vec<ToolResult>) -> Result<Self> {
        Self::new(
            Role::User,
            results.into_iter().map(Content::ToolResult).collect(),
        )
    }
}
