use anyhow::Result;
use cliclack::{input, spinner, ProgressBar};

use super::{format_reply, Input, Prompt};

pub struct CliclackPrompt {
    spinner: Option<ProgressBar>,
}

impl CliclackPrompt {
    pub fn new() -> Self {
        CliclackPrompt { spinner: None }
    }
}

impl Default for CliclackPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompt for CliclackPrompt {
    fn get_input(&mut self, message: &str) -> Result<Input> {
        let text: String = input(message)
            .placeholder("")
            .required(false)
            .interact()?;
        Ok(Input::from_text(text))
    }

    fn render_reply(&mut self, agent: &str, output: &str) {
        println!("{}", format_reply(agent, output));
    }

    fn show_busy(&mut self) {
        let spin = spinner();
        spin.start("awaiting reply");
        self.spinner = Some(spin);
    }

    fn hide_busy(&mut self) {
        if let Some(spin) = self.spinner.take() {
            spin.stop("");
        }
    }

    fn close(&mut self) {
        self.hide_busy();
    }
}
