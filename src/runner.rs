use anyhow::Result;
use serde_json::json;
use tracing::Instrument;

use crate::agents::{Agent, AgentRegistry};
use crate::config::DEFAULT_MAX_TURNS;
use crate::errors::RunError;
use crate::providers::base::{Provider, Usage};
use crate::providers::types::content::{ToolResult, ToolUse};
use crate::providers::types::message::Message;
use crate::providers::types::objectid::ConversationId;

const MULTIPLE_HANDOFFS: &str = "Multiple handoffs detected, ignoring this one.";

#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Upper bound on model calls within one run
    pub max_turns: usize,
    /// Correlates the tracing spans of every run in a session
    pub group_id: ConversationId,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            group_id: ConversationId::new(),
        }
    }
}

/// Outcome of one user turn.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub final_output: String,
    /// The agent that produced `final_output`
    pub last_agent: String,
    /// The input followed by every item produced during the run
    pub history: Vec<Message>,
    pub usage: Usage,
}

impl RunResult {
    /// History to send back as the next turn's input.
    pub fn into_input_list(self) -> Vec<Message> {
        self.history
    }
}

/// Drives one turn: calls the model as the current agent and follows
/// handoffs until some agent answers with plain text.
pub struct Runner<'a> {
    provider: &'a dyn Provider,
    registry: &'a AgentRegistry,
}

impl<'a> Runner<'a> {
    pub fn new(provider: &'a dyn Provider, registry: &'a AgentRegistry) -> Self {
        Self { provider, registry }
    }

    pub async fn run(
        &self,
        starting_agent: &str,
        input: Vec<Message>,
        config: &RunConfig,
    ) -> Result<RunResult> {
        let span = tracing::info_span!(
            "Routing example",
            group_id = %config.group_id,
            starting_agent = %starting_agent
        );
        self.run_inner(starting_agent, input, config)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        starting_agent: &str,
        input: Vec<Message>,
        config: &RunConfig,
    ) -> Result<RunResult> {
        let mut current = self.registry.get(starting_agent)?;
        let mut history = input;
        let mut usage = Usage::default();

        for turn in 0..config.max_turns {
            tracing::debug!(turn, agent = current.name(), "calling model");
            let (reply, call_usage) = self
                .provider
                .complete(current.instructions(), &history, &current.handoff_tools())
                .await?;
            usage += &call_usage;
            tracing::debug!(
                agent = current.name(),
                message_id = %reply.id,
                created = reply.created,
                "reply received"
            );

            let tool_uses = reply.tool_use();
            let Some((first, rest)) = tool_uses.split_first() else {
                let final_output = reply.text();
                history.push(reply);
                tracing::info!(agent = current.name(), ?usage, "run finished");
                return Ok(RunResult {
                    final_output,
                    last_agent: current.name().to_string(),
                    history,
                    usage,
                });
            };

            let target = self.resolve(current, first)?;
            let mut results = vec![ToolResult {
                tool_use_id: first.id.clone(),
                output: json!({ "assistant": target.name() }).to_string(),
                is_error: false,
            }];
            for ignored in rest {
                self.resolve(current, ignored)?;
                tracing::warn!(tool = %ignored.name, "ignoring extra handoff");
                results.push(ToolResult {
                    tool_use_id: ignored.id.clone(),
                    output: MULTIPLE_HANDOFFS.to_string(),
                    is_error: false,
                });
            }

            tracing::info!(from = current.name(), to = target.name(), "handoff");
            history.push(reply);
            history.push(Message::tool_results(results)?);
            current = target;
        }

        Err(RunError::MaxTurnsExceeded(config.max_turns).into())
    }

    fn resolve(&self, current: &Agent, tool_use: &ToolUse) -> Result<&'a Agent, RunError> {
        if tool_use.is_error {
            tracing::warn!(
                tool = %tool_use.name,
                error = ?tool_use.error_message,
                "model produced an unusable tool call"
            );
            return Err(RunError::UnknownHandoff(tool_use.name.clone()));
        }
        self.registry.resolve_handoff(current, &tool_use.name)
    }
}
