use anyhow::Result;

pub trait Prompt {
    fn get_input(&mut self) -> Result<Input>;
    /// Render a complete assistant message.
    fn render_message(&mut self, content: &str);
    /// Print one streamed fragment in place, without a trailing newline.
    fn render_fragment(&mut self, fragment: &str);
    /// Close out a streamed message once its fragments stop.
    fn end_fragments(&mut self);
    fn render_note(&mut self, content: &str);
    fn render_error(&mut self, content: &str);
    fn show_busy(&self);
    fn hide_busy(&self);
    fn close(&self);

    fn counsel_ready(&self) {
        println!(
            r#"
      _/\_
     \ -- /
      |  |     counsel
     _|  |_
    "#
        );
    }
}

pub struct Input {
    pub input_type: InputType,
    pub content: Option<String>, // None for control-flow inputs such as Exit
}

pub enum InputType {
    AskAgain, // Ask the user for input again. Control flow command.
    Message,  // User sent a message
    Exit,     // User wants to exit the session
}

pub enum Theme {
    Light,
    Dark,
}
