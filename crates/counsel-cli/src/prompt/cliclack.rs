use std::io::{self, Write};

use anyhow::Result;
use bat::WrappingMode;
use cliclack::{input, spinner};
use console::style;

use super::prompt::{Input, InputType, Prompt, Theme};

pub struct CliclackPrompt {
    spinner: cliclack::ProgressBar,
    theme: Theme,
}

impl CliclackPrompt {
    pub fn new() -> Self {
        CliclackPrompt {
            spinner: spinner(),
            theme: Theme::Dark,
        }
    }

    fn theme_name(&self) -> &'static str {
        match self.theme {
            Theme::Light => "GitHub",
            Theme::Dark => "zenburn",
        }
    }
}

fn print_markdown(content: &str, theme: &str) {
    bat::PrettyPrinter::new()
        .input(bat::Input::from_bytes(content.as_bytes()))
        .theme(theme)
        .language("Markdown")
        .wrapping_mode(WrappingMode::Character)
        .print()
        .unwrap();
}

impl Prompt for CliclackPrompt {
    fn get_input(&mut self) -> Result<Input> {
        let message_text: String = input("Query: ⚖").placeholder("").interact()?;
        let message_text = message_text.trim().to_string();

        if message_text.is_empty() {
            return Ok(Input {
                input_type: InputType::AskAgain,
                content: None,
            });
        }

        if message_text.eq_ignore_ascii_case("exit")
            || message_text.eq_ignore_ascii_case("/exit")
            || message_text.eq_ignore_ascii_case("/quit")
        {
            return Ok(Input {
                input_type: InputType::Exit,
                content: None,
            });
        }

        if message_text.eq_ignore_ascii_case("/t") {
            self.theme = match self.theme {
                Theme::Light => {
                    println!("Switching to Dark theme");
                    Theme::Dark
                }
                Theme::Dark => {
                    println!("Switching to Light theme");
                    Theme::Light
                }
            };
            return self.get_input();
        }

        if message_text.eq_ignore_ascii_case("/?") {
            println!("Commands:");
            println!("/exit - Exit the session");
            println!("/clear - Forget the locally recorded chat");
            println!("/new - Start a fresh conversation");
            println!("/doc <path> - Store a reference document (txt/md/pdf)");
            println!("/t - Toggle Light/Dark theme");
            println!("/? - Display this help message");
            return self.get_input();
        }

        Ok(Input {
            input_type: InputType::Message,
            content: Some(message_text),
        })
    }

    fn render_message(&mut self, content: &str) {
        print_markdown(content, self.theme_name());
        println!();
        io::stdout().flush().expect("Failed to flush stdout");
    }

    fn render_fragment(&mut self, fragment: &str) {
        print!("{}", fragment);
        io::stdout().flush().expect("Failed to flush stdout");
    }

    fn end_fragments(&mut self) {
        println!();
        println!();
        io::stdout().flush().expect("Failed to flush stdout");
    }

    fn render_note(&mut self, content: &str) {
        println!("{}", style(content).dim());
    }

    fn render_error(&mut self, content: &str) {
        println!("{}", style(content).red());
    }

    fn show_busy(&self) {
        self.spinner.start("awaiting reply");
    }

    fn hide_busy(&self) {
        self.spinner.stop("");
    }

    fn close(&self) {
        io::stdout().flush().expect("Failed to flush stdout");
    }
}
