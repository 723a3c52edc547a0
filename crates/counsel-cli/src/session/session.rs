use std::path::{Path, PathBuf};

use anyhow::Result;
use futures::StreamExt;

use counsel::documents;
use counsel::message::Message;
use counsel::providers::foundry::FoundryClient;
use counsel::router::{Reply, Router};

use crate::prompt::prompt::{InputType, Prompt};
use crate::session::session_file::persist_messages;

/// Hard cap on user prompt length before it is sent.
pub const MAX_PROMPT_CHARS: usize = 1500;

/// Output-token cap when storing a reference document; the generated
/// acknowledgement is thrown away.
const DOC_STORE_MAX_OUTPUT_TOKENS: u32 = 200;

pub struct Session<'a> {
    foundry: FoundryClient,
    router: Router<FoundryClient>,
    prompt: Box<dyn Prompt + 'a>,
    session_file: PathBuf,
    conversation_id: String,
    doc_sent: bool,
    messages: Vec<Message>,
}

impl<'a> Session<'a> {
    pub fn new(
        foundry: FoundryClient,
        router: Router<FoundryClient>,
        prompt: Box<impl Prompt + 'a>,
        session_file: PathBuf,
        conversation_id: String,
    ) -> Self {
        Session {
            foundry,
            router,
            prompt,
            session_file,
            conversation_id,
            doc_sent: false,
            messages: Vec::new(),
        }
    }

    pub async fn start(&mut self) -> Result<()> {
        self.prompt.render_note(&format!(
            "Conversation: {} — recording to {}",
            self.conversation_id,
            self.session_file.display()
        ));
        self.prompt.counsel_ready();

        loop {
            let input = self.prompt.get_input()?;
            match input.input_type {
                InputType::Exit => break,
                InputType::AskAgain => continue,
                InputType::Message => {
                    let Some(content) = input.content else { continue };
                    if let Err(e) = self.handle_line(&content).await {
                        self.prompt.render_error(&format!("Error: {}", e));
                    }
                }
            }
        }

        self.prompt.render_note(&format!(
            "Closing session. Recorded to {}",
            self.session_file.display()
        ));
        self.prompt.close();
        Ok(())
    }

    pub async fn headless_start(&mut self, initial_message: String) -> Result<()> {
        self.send_message(&initial_message).await?;
        self.prompt.close();
        Ok(())
    }

    async fn handle_line(&mut self, line: &str) -> Result<()> {
        if let Some(path) = line.strip_prefix("/doc ") {
            return self.store_document(Path::new(path.trim())).await;
        }

        match line {
            "/clear" => {
                self.messages.clear();
                persist_messages(&self.session_file, &self.messages)?;
                self.prompt.render_note("Chat history cleared");
                Ok(())
            }
            "/new" => {
                self.conversation_id = self.foundry.create_conversation().await?;
                self.messages.clear();
                self.doc_sent = false;
                persist_messages(&self.session_file, &self.messages)?;
                self.prompt
                    .render_note(&format!("New conversation: {}", self.conversation_id));
                Ok(())
            }
            _ => self.send_message(line).await,
        }
    }

    async fn send_message(&mut self, prompt_text: &str) -> Result<()> {
        let prompt_text = guard_length(prompt_text);
        self.messages.push(Message::user(&prompt_text));
        persist_messages(&self.session_file, &self.messages)?;

        // The agents ramble unless asked not to
        let user_input = format!("{}\nAnswer concisely.", prompt_text);

        self.prompt.show_busy();
        let reply = self.router.respond(&self.conversation_id, &user_input).await;
        self.prompt.hide_busy();

        let full = match reply {
            Err(e) => {
                let text = format!("Error: {}", e);
                self.prompt.render_error(&text);
                text
            }
            Ok(Reply::Text(text)) => {
                self.prompt.render_message(&text);
                text
            }
            Ok(Reply::Stream(mut stream)) => {
                let mut full = String::new();
                while let Some(fragment) = stream.next().await {
                    match fragment {
                        Ok(fragment) => {
                            self.prompt.render_fragment(&fragment);
                            full.push_str(&fragment);
                        }
                        Err(e) => {
                            // Terminal for this request; prior turns stay intact
                            let text = format!("Error: {}", e);
                            self.prompt.render_error(&text);
                            full = text;
                            break;
                        }
                    }
                }
                self.prompt.end_fragments();
                full
            }
        };

        self.messages.push(Message::assistant(full));
        persist_messages(&self.session_file, &self.messages)?;
        Ok(())
    }

    /// Extract a document and store it into the conversation, once.
    pub async fn store_document(&mut self, path: &Path) -> Result<()> {
        if self.doc_sent {
            self.prompt
                .render_note("A document is already stored in this conversation");
            return Ok(());
        }

        let text = documents::truncate(&documents::extract_text(path)?);
        if text.trim().is_empty() {
            anyhow::bail!("no readable text found in {}", path.display());
        }

        let agent = self.router.kb_agent().to_string();
        self.prompt.show_busy();
        let result = self
            .foundry
            .send(
                &agent,
                &self.conversation_id,
                &format!("Reference document:\n{}", text),
                DOC_STORE_MAX_OUTPUT_TOKENS,
            )
            .await;
        self.prompt.hide_busy();
        result?;

        self.doc_sent = true;
        self.prompt
            .render_note("Document stored once in conversation memory");
        Ok(())
    }
}

/// Cap user input at [`MAX_PROMPT_CHARS`] characters.
fn guard_length(prompt: &str) -> String {
    match prompt.char_indices().nth(MAX_PROMPT_CHARS) {
        None => prompt.to_string(),
        Some((cut, _)) => prompt[..cut].to_string(),
    }
}
