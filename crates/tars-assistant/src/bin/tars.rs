//! TARS terminal front end
//!
//! Run with: cargo run -p tars-assistant --bin tars -- --youtube https://youtu.be/<id>

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{ArgGroup, Parser};
use tars_assistant::{
    generation::{ChatSession, ConversationOrchestrator},
    ingestion::{Ingestor, SourceRequest},
    providers::{AnthropicClient, LlmProvider},
    NormalizedDocument, TarsConfig,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "tars",
    version,
    about = "TARS - ask questions about a web page, YouTube video, PDFs or an image",
    group(ArgGroup::new("source").args(["web", "youtube", "pdf", "image", "chat"]))
)]
struct Cli {
    /// Load a web page (omit the value to use SITE_URL)
    #[arg(long, num_args = 0..=1, default_missing_value = "")]
    web: Option<String>,

    /// Load a YouTube transcript (omit the value to use YOUTUBE_URL)
    #[arg(long, num_args = 0..=1, default_missing_value = "")]
    youtube: Option<String>,

    /// Load PDF files (omit the paths to scan the documents folder)
    #[arg(long, num_args = 0..)]
    pdf: Option<Vec<PathBuf>>,

    /// Describe an image file
    #[arg(long)]
    image: Option<PathBuf>,

    /// Chat without a source (default)
    #[arg(long)]
    chat: bool,

    /// Ask a single question and exit
    #[arg(short, long)]
    question: Option<String>,
}

impl Cli {
    async fn source_request(&self) -> anyhow::Result<SourceRequest> {
        let request = if let Some(url) = &self.web {
            SourceRequest::Web(Some(url.clone()))
        } else if let Some(url) = &self.youtube {
            SourceRequest::Video(Some(url.clone()))
        } else if let Some(paths) = &self.pdf {
            SourceRequest::Documents(Some(paths.clone()).filter(|p| !p.is_empty()))
        } else if let Some(path) = &self.image {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", path.display(), e))?;
            SourceRequest::Image(bytes)
        } else {
            SourceRequest::FreeChat
        };
        Ok(request)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tars_assistant=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = TarsConfig::load()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Model: {}", config.llm.model);
    tracing::info!("  - Proxies: {}", config.video.proxies.len());
    tracing::info!("  - Relay: {}", config.video.relay_url.as_deref().unwrap_or("disabled"));
    tracing::info!("  - Documents: {}", config.documents.directory.display());

    let client = Arc::new(AnthropicClient::new(&config.llm, &config.vision)?);
    let ingestor = Ingestor::from_config(&config, client.clone())?;
    let orchestrator = ConversationOrchestrator::new(client.clone());
    tracing::info!(provider = client.name(), model = client.model(), "Generation ready");

    let mut session = ChatSession::new();
    let document = ingestor.load(cli.source_request().await?).await;
    print_document(&document);
    session.set_document(document);

    if let Some(question) = cli.question.as_deref() {
        println!("{}", session.ask(question, &orchestrator).await);
        return Ok(());
    }

    println!("\nAsk TARS anything. Commands: /info, /clear, /quit\n");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                session.clear();
                println!("Conversation cleared.\n");
            }
            "/info" => {
                let info = session.info();
                println!(
                    "Session {} | source: {} | messages: {} | since {}\n",
                    info.id,
                    info.source_kind,
                    info.message_count,
                    info.started_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
            question => {
                let reply = session.ask(question, &orchestrator).await;
                println!("\n{}\n", reply);
            }
        }
    }

    Ok(())
}

fn print_document(document: &NormalizedDocument) {
    println!("Source: {}", document.source_kind);
    println!("Title:  {}", document.title);
    if let Some(url) = &document.origin_url {
        println!("URL:    {}", url);
    }
    if document.is_error() {
        println!("\n{}", document.body);
    } else {
        println!("Loaded {} characters of context.", document.body.chars().count());
    }
}
