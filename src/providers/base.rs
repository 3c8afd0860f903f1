use std::ops::AddAssign;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::types::message::Message;
use super::types::tool::Tool;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

fn add_counts(lhs: Option<i32>, rhs: Option<i32>) -> Option<i32> {
    match (lhs, rhs) {
        (Some(a), Some(b)) => Some(a + b),
        (a, None) => a,
        (None, b) => b,
    }
}

impl AddAssign<&Usage> for Usage {
    fn add_assign(&mut self, rhs: &Usage) {
        self.input_tokens = add_counts(self.input_tokens, rhs.input_tokens);
        self.output_tokens = add_counts(self.output_tokens, rhs.output_tokens);
        self.total_tokens = add_counts(self.total_tokens, rhs.total_tokens);
    }
}

/// A chat-completions backend.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the next assistant message for `system` + `messages`
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<(Message, Usage)>;
}
