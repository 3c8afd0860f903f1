use anyhow::Result;
use console::style;

pub mod cliclack;

pub const EXIT_KEYWORD: &str = "exit";

pub trait Prompt {
    /// Show `message` and read one line from the user.
    fn get_input(&mut self, message: &str) -> Result<Input>;
    fn render_reply(&mut self, agent: &str, output: &str);
    fn show_busy(&mut self);
    fn hide_busy(&mut self);
    fn close(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    pub input_type: InputType,
    /// Exactly what the user typed
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    Message,
    Exit,
}

impl Input {
    /// Classifies raw text; only the exit keyword is special.
    pub fn from_text(content: String) -> Self {
        let input_type = if content.trim().to_lowercase() == EXIT_KEYWORD {
            InputType::Exit
        } else {
            InputType::Message
        };
        Self {
            input_type,
            content,
        }
    }

    pub fn is_exit(&self) -> bool {
        self.input_type == InputType::Exit
    }
}

/// The two lines shown after every run.
pub fn format_reply(agent: &str, output: &str) -> String {
    format!(
        "\nAssistant: ({})\nAgent Output: {}\n",
        style(agent).cyan().bold(),
        output
    )
}
