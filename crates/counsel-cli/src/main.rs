use anyhow::Result;
use clap::Parser;
use console::style;
use dotenv::dotenv;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use counsel::language::Language;
use counsel::providers::configs::{FoundryConfig, TranslatorConfig};
use counsel::providers::foundry::FoundryClient;
use counsel::providers::stream::{StreamClientConfig, ThrottledStreamClient};
use counsel::providers::translator::Translator;
use counsel::router::{Router, ARABIC_AGENT, ENGLISH_AGENT};

mod prompt;
mod session;

use prompt::cliclack::CliclackPrompt;
use session::{ensure_session_dir, Session};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Language of the legal knowledge base the agents answer from
    #[arg(long, default_value = "arabic")]
    kb_language: Language,

    /// Name of the Arabic agent registered with the project
    #[arg(long, default_value = ARABIC_AGENT)]
    arabic_agent: String,

    /// Name of the English agent registered with the project
    #[arg(long, default_value = ENGLISH_AGENT)]
    english_agent: String,

    /// Store a reference document (txt/md/pdf) before chatting
    #[arg(short, long)]
    document: Option<PathBuf>,

    /// Send a single message and exit instead of starting a session
    #[arg(short, long)]
    message: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let foundry = FoundryClient::new(FoundryConfig::from_env()?)?;
    let translator = match TranslatorConfig::from_env_opt()? {
        Some(config) => Some(Translator::new(config)?),
        None => {
            println!(
                "{}",
                style("No translation service configured; cross-language queries go through untranslated.").dim()
            );
            None
        }
    };

    let agent_name = match cli.kb_language {
        Language::Arabic => &cli.arabic_agent,
        Language::English => &cli.english_agent,
    };
    let agent = foundry.find_agent(agent_name).await?;
    println!("{} {}", style("Agent:").green(), agent.name);

    let client = ThrottledStreamClient::new(foundry.clone(), StreamClientConfig::default());
    let router = Router::new(client, translator, cli.kb_language)
        .with_agents(cli.arabic_agent, cli.english_agent);

    let conversation_id = foundry.create_conversation().await?;
    let session_file = ensure_session_dir()?.join(format!("{}.jsonl", uuid::Uuid::new_v4()));

    let mut session = Session::new(
        foundry,
        router,
        Box::new(CliclackPrompt::new()),
        session_file,
        conversation_id,
    );

    if let Some(path) = &cli.document {
        session.store_document(path).await?;
    }

    match cli.message {
        Some(message) => session.headless_start(message).await,
        None => session.start().await,
    }
}
