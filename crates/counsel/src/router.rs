//! Dispatches a query to the agent matching the knowledge-base language,
//! translating on the way in and out when the query arrives in the other
//! language.

use anyhow::Result;
use futures::StreamExt;
use tracing::{debug, warn};

use crate::errors::StreamError;
use crate::language::Language;
use crate::providers::base::ResponseTransport;
use crate::providers::stream::{FragmentStream, ThrottledStreamClient};
use crate::providers::translator::Translator;

pub const ARABIC_AGENT: &str = "ArabicLegalAgent";
pub const ENGLISH_AGENT: &str = "EnglishLegalAgent";

/// Either a live fragment stream, or an answer that had to be completed
/// before it could be translated back into the query's language.
pub enum Reply {
    Stream(FragmentStream),
    Text(String),
}

pub struct Router<T: ResponseTransport> {
    client: ThrottledStreamClient<T>,
    translator: Option<Translator>,
    kb_language: Language,
    arabic_agent: String,
    english_agent: String,
}

impl<T: ResponseTransport> Router<T> {
    pub fn new(
        client: ThrottledStreamClient<T>,
        translator: Option<Translator>,
        kb_language: Language,
    ) -> Self {
        Self {
            client,
            translator,
            kb_language,
            arabic_agent: ARABIC_AGENT.to_string(),
            english_agent: ENGLISH_AGENT.to_string(),
        }
    }

    pub fn with_agents(mut self, arabic_agent: String, english_agent: String) -> Self {
        self.arabic_agent = arabic_agent;
        self.english_agent = english_agent;
        self
    }

    /// The agent answering from the knowledge base, regardless of query
    /// language.
    pub fn kb_agent(&self) -> &str {
        self.agent_for(self.kb_language)
    }

    fn agent_for(&self, language: Language) -> &str {
        match language {
            Language::Arabic => &self.arabic_agent,
            Language::English => &self.english_agent,
        }
    }

    /// Answer one query on the given conversation.
    ///
    /// Same-language queries stream straight through. Cross-language queries
    /// are translated into the knowledge-base language, answered, collected
    /// and translated back, so the reply arrives as one completed text.
    pub async fn respond(&self, conversation: &str, query: &str) -> Result<Reply> {
        let query_language = Language::detect(query);
        debug!(language = %query_language, "routing query");

        if query_language != self.kb_language && self.translator.is_none() {
            warn!(
                query = query_language.code(),
                kb = self.kb_language.code(),
                "no translator configured, passing the query through untranslated"
            );
        }

        let translator = self
            .translator
            .as_ref()
            .filter(|_| query_language != self.kb_language);

        let working_query = match translator {
            Some(t) => {
                t.translate(query, query_language.code(), self.kb_language.code())
                    .await?
            }
            None => query.to_string(),
        };

        let agent = self.agent_for(self.kb_language);
        let stream = self.client.stream(agent, conversation, &working_query)?;

        match translator {
            None => Ok(Reply::Stream(stream)),
            Some(t) => {
                let answer = collect(stream).await?;
                let translated = t
                    .translate(&answer, self.kb_language.code(), query_language.code())
                    .await?;
                Ok(Reply::Text(translated))
            }
        }
    }
}

async fn collect(mut stream: FragmentStream) -> Result<String, StreamError> {
    let mut full = String::new();
    while let Some(fragment) = stream.next().await {
        full.push_str(&fragment?);
    }
    Ok(full)
}
