use anyhow::Result;

use crate::config::RunPolicy;
use crate::context::AppContext;
use crate::prompt::Prompt;
use crate::providers::base::Usage;
use crate::providers::types::message::Message;
use crate::runner::Runner;

pub const FIRST_PROMPT: &str = "Hi! We speak French, Spanish and English. How can I help? ";
pub const NEXT_PROMPT: &str = "Enter a message (or 'exit' to quit): ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingFirstInput,
    Running,
    Exited,
}

#[derive(Debug, Clone)]
pub struct SessionSummary {
    /// Completed runs, one per user message sent to the model
    pub turns: usize,
    pub history: Vec<Message>,
    pub last_agent: Option<String>,
    pub usage: Usage,
}

/// The interactive loop: read, run, print, repeat until the user exits.
pub struct Session<'a> {
    context: &'a AppContext,
    prompt: Box<dyn Prompt + 'a>,
    state: SessionState,
}

impl<'a> Session<'a> {
    pub fn new(context: &'a AppContext, prompt: Box<impl Prompt + 'a>) -> Self {
        Session {
            context,
            prompt,
            state: SessionState::AwaitingFirstInput,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub async fn start(&mut self) -> Result<SessionSummary> {
        let result = self.run_loop().await;
        self.state = SessionState::Exited;
        self.prompt.close();
        result
    }

    async fn run_loop(&mut self) -> Result<SessionSummary> {
        let context = self.context;
        let registry = context.registry();
        let runner = Runner::new(context.provider(), registry);
        let run_config = context.run_config();
        let triage = registry.triage()?.name().to_string();

        let first = self.prompt.get_input(FIRST_PROMPT)?;
        let mut history = vec![Message::user(&first.content)?];
        let mut summary = SessionSummary {
            turns: 0,
            history: Vec::new(),
            last_agent: None,
            usage: Usage::default(),
        };
        if first.is_exit() {
            tracing::info!("exit requested before the first run");
            summary.history = history;
            return Ok(summary);
        }

        self.state = SessionState::Running;
        let mut agent = triage.clone();

        loop {
            self.prompt.show_busy();
            let outcome = runner.run(&agent, history, &run_config).await;
            self.prompt.hide_busy();
            let result = outcome?;

            summary.turns += 1;
            summary.usage += &result.usage;
            self.prompt
                .render_reply(&result.last_agent, &result.final_output);

            let input = self.prompt.get_input(NEXT_PROMPT)?;
            let last_agent = result.last_agent.clone();
            history = result.into_input_list();
            summary.last_agent = Some(last_agent.clone());

            if input.is_exit() {
                break;
            }

            agent = match context.run_policy() {
                RunPolicy::ReTriage => triage.clone(),
                RunPolicy::StickToLastAgent => last_agent,
            };
            history.push(Message::user(&input.content)?);
        }

        tracing::info!(turns = summary.turns, usage = ?summary.usage, "session finished");
        summary.history = history;
        Ok(summary)
    }
}
