// feedback-analyzer-rs/src/main.rs
// Command-line entry point: analyze a feedback file or list available models

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};

use feedback_analyzer::config::AnalyzerConfig;
use feedback_analyzer::report::{self, SentimentDistribution};
use feedback_analyzer::{
    analyze_file, archive, AnalysisRun, ChatSession, FileAnalysis, InputFormat, RunStatus,
};
use genai_sdk::config::MemoryConfigProvider;
use genai_sdk::gemini::GeminiClient;
use genai_sdk::{ClientBuilder, GenerativeBackend, RetryExecutor};

const TOP_TOPICS: usize = 10;

#[derive(Parser)]
#[command(name = "feedback-analyzer")]
#[command(about = "Analyze customer feedback with a generative model")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a CSV, JSON or TXT feedback file
    Analyze {
        /// Feedback file
        file: PathBuf,

        /// File type (defaults to the file extension)
        #[arg(long)]
        format: Option<FormatArg>,

        /// Stem words while cleaning
        #[arg(long)]
        lemmatize: bool,

        /// Write the report archive (.tar.gz) to this path
        #[arg(long)]
        export: Option<PathBuf>,

        /// Ask a question about the feedback (repeatable)
        #[arg(long)]
        ask: Vec<String>,

        /// Read questions from stdin after the analysis
        #[arg(long)]
        chat: bool,
    },

    /// List models that support text generation
    Models,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
    Txt,
}

impl From<FormatArg> for InputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => InputFormat::Csv,
            FormatArg::Json => InputFormat::Json,
            FormatArg::Txt => InputFormat::Txt,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut overrides = MemoryConfigProvider::new();
    if let Command::Analyze { lemmatize: true, .. } = &cli.command {
        overrides.set("feedback_lemmatize", "true");
    }
    let config = AnalyzerConfig::load(overrides).context("failed to load configuration")?;

    let backend = GeminiClient::new(config.gemini.clone()).context("failed to create Gemini client")?;
    let retry = ClientBuilder::new()
        .retry_config(config.retry.clone())
        .build_retry_executor()
        .context("invalid retry policy")?;
    log::info!("Retry policy: {}", config.retry);

    match cli.command {
        Command::Models => list_models(backend, retry, &config).await,
        Command::Analyze {
            file,
            format,
            export,
            ask,
            chat,
            ..
        } => {
            let FileAnalysis {
                rejected,
                client,
                run,
            } = analyze_file(&file, format.map(Into::into), &config, backend, retry)
                .await
                .with_context(|| format!("failed to analyze {}", file.display()))?;

            for entry in &rejected {
                println!("Skipped entry {}: {}", entry.index, entry.reason);
            }
            print_run(&run);

            if let Some(path) = export {
                let bundle = report::build_export_bundle(&run)?;
                archive::export_archive(&bundle, run.generated_at, &path)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("\nReport archive written to {}", path.display());
            }

            if run.status == RunStatus::Aborted {
                bail!("analysis aborted; see issues above");
            }

            let mut session = ChatSession::new(&client, &run).with_context_limit(config.chat_context_limit);
            for question in &ask {
                answer(&mut session, question).await;
            }
            if chat {
                chat_loop(&mut session).await?;
            }
            Ok(())
        }
    }
}

async fn list_models(
    backend: GeminiClient,
    retry: RetryExecutor,
    config: &AnalyzerConfig,
) -> anyhow::Result<()> {
    let models = retry
        .run("list_models", || backend.list_models())
        .await
        .context("failed to list models")?;

    println!("Models supporting generateContent:");
    for model in models.iter().filter(|m| m.supports_generation()) {
        match &model.display_name {
            Some(name) => println!("  {} ({})", model.id, name),
            None => println!("  {}", model.id),
        }
    }

    match genai_sdk::select_model(&models, &config.gemini.preferred_models, &config.gemini.fallback_model) {
        Some(model) => println!("\nSelected model: {}", model),
        None => println!("\nNo preferred or fallback model is available"),
    }
    Ok(())
}

fn print_run(run: &AnalysisRun) {
    let distribution = SentimentDistribution::from_records(&run.records);

    println!("\n=== Analysis {} ({} records) ===", run.status, run.records.len());
    if let Some(model) = &run.model {
        println!("Model: {}", model);
    }

    println!("\nSentiment distribution:");
    print!("{}", distribution);

    let topics = report::top_topics(&run.records, TOP_TOPICS);
    if !topics.is_empty() {
        println!("\nTop topics:");
        for (topic, count) in topics {
            println!("- {} ({})", topic, count);
        }
    }

    if run.has_summary() {
        println!("\n{}", run.summary_text);
    }

    if !run.issues.is_empty() {
        println!("\nIssues:");
        for issue in &run.issues {
            println!("- {}", issue);
        }
    }
}

async fn answer<B: GenerativeBackend>(session: &mut ChatSession<'_, B>, question: &str) {
    match session.ask(question).await {
        Ok(reply) => println!("\nQ: {}\nA: {}", question.trim(), reply),
        Err(err) => eprintln!("\nCould not answer {:?}: {}", question, err),
    }
}

async fn chat_loop<B: GenerativeBackend>(session: &mut ChatSession<'_, B>) -> anyhow::Result<()> {
    println!("\nAsk about the feedback (empty line or 'exit' to quit)");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = match lines.next_line().await? {
            Some(line) => line,
            None => break,
        };
        let question = line.trim();
        if question.is_empty() || question.eq_ignore_ascii_case("exit") {
            break;
        }
        answer(session, question).await;
    }
    Ok(())
}
