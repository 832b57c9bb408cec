use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use arag_cli::app::{AgenticRag, RagService};
use arag_cli::config::{AppConfig, load_sources};
use arag_cli::console::{self, EXAMPLE_QUESTIONS};
use arag_cli::web::{ServerConfig, WebState, run_server};
use arag_cli::telemetry;
use clap::{Parser, Subcommand};
use rustyline::DefaultEditor;
use tracing::error;

#[derive(Parser)]
#[command(name = "arag")]
#[command(about = "Agentic RAG: answer questions over your documents")]
#[command(version)]
struct Cli {
    /// Source to index (URL, PDF file, PDF directory or .txt file); repeatable.
    /// Overrides the sources file.
    #[arg(long = "source", global = true)]
    sources: Vec<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a single question
    Ask {
        question: String,
    },
    /// Interactive question loop
    Chat,
    /// Serve the web form
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 8501)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    telemetry::init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    match cli.command {
        Some(Command::Serve { host, port }) => {
            let state = match start(config, cli.sources).await {
                Ok(rag) => {
                    let chunk_count = rag.chunk_count();
                    WebState::ready(Arc::new(rag), chunk_count)
                }
                Err(err) => {
                    error!(error = %err, "initialization failed, serving error page");
                    WebState::failed(format!("{err:#}"))
                }
            };
            run_server(state, ServerConfig { host, port }).await?;
        }
        Some(Command::Ask { question }) => {
            let rag = start(config, cli.sources).await?;
            let answer = rag.ask(&question).await?;
            println!("{answer}");
        }
        Some(Command::Chat) => {
            let rag = start(config, cli.sources).await?;
            console::interactive(&rag).await?;
        }
        None => {
            let rag = start(config, cli.sources).await?;
            let mut stdout = std::io::stdout();
            writeln!(stdout, "{}\nRunning example questions:\n{}\n", "=".repeat(80), "=".repeat(80))?;
            for question in EXAMPLE_QUESTIONS {
                console::answer_one(&rag, question, &mut stdout).await?;
                writeln!(stdout, "{}\n", "=".repeat(80))?;
            }

            let mut editor = DefaultEditor::new()?;
            let reply =
                console::read_line(&mut editor, "Would you like to enter interactive mode? (y/n): ")?;
            if reply.is_some_and(|r| r.trim().eq_ignore_ascii_case("y")) {
                console::interactive(&rag).await?;
            }
        }
    }
    Ok(())
}

async fn start(
    config: Result<AppConfig, arag_cli::ConfigError>,
    sources: Vec<String>,
) -> anyhow::Result<AgenticRag> {
    let config = config.context("invalid configuration")?;
    let sources = if sources.is_empty() { load_sources(&config.sources_file)? } else { sources };
    AgenticRag::initialize(&config, &sources).await.context("failed to initialize the pipeline")
}
