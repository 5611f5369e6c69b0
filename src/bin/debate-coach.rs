//! CLI binary for debate-coach.
//!
//! A thin shim over the library crate that maps CLI flags to `CoachConfig`,
//! then either reviews one file or serves the web UI.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use debate_coach::{
    review_to_file, CoachConfig, ProgressCallback, ReviewProgressCallback, Stage,
    REPORT_FILE_NAME,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a spinner showing the running stage and one log line
/// per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ReviewProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_message(format!("{}…", stage.label()));
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<32} {}",
            green("✓"),
            stage.label(),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_stage_error(&self, stage: Stage, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar
            .println(format!("  {} {:<32} {}", red("✗"), stage.label(), red(&msg)));
        self.bar.finish_and_clear();
    }

    fn on_review_complete(&self, _feedback_len: usize, _total_ms: u64) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Review a speech; the report lands in ./Debate_Feedback.pdf
  debate-coach review constructive.docx

  # Choose the report location and model
  debate-coach review --model gpt-4o-mini rebuttal.pdf -o reports/round2.pdf

  # JSON (feedback + stats) on stdout
  debate-coach review --json case.pdf > feedback.json

  # Any OpenAI-compatible endpoint
  debate-coach review --api-base http://localhost:11434/v1 --model llama3.1 case.pdf

  # Through a provider SDK instead of plain HTTP
  debate-coach review --provider anthropic --model claude-sonnet-4-20250514 case.pdf

  # Web UI on http://127.0.0.1:8501
  debate-coach serve

ENVIRONMENT VARIABLES:
  DEBATE_COACH_API_KEY    Bearer key for the HTTP transport
  OPENAI_API_KEY          Used when DEBATE_COACH_API_KEY is unset
  DEBATE_COACH_MODEL      Chat model (default gpt-4)
  DEBATE_COACH_PROVIDER   Provider SDK name (openai, anthropic, gemini, ollama)
  DEBATE_COACH_API_BASE   OpenAI-compatible API root
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory); lopdf is used without it
  RUST_LOG                Log filter, e.g. debate_coach=debug
"#;

/// Debate-coaching feedback for PDF and DOCX speeches.
#[derive(Parser, Debug)]
#[command(
    name = "debate-coach",
    version,
    about = "Get AI coaching feedback on a debate speech (PDF or DOCX) as a PDF report",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DEBATE_COACH_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the feedback itself.
    #[arg(short, long, global = true, env = "DEBATE_COACH_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Review one file and write the PDF report.
    Review(ReviewArgs),

    /// Serve the upload web UI.
    #[cfg(feature = "server")]
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct ReviewArgs {
    /// The `.pdf` or `.docx` file to review.
    input: PathBuf,

    /// Where to write the report.
    #[arg(short, long, default_value = REPORT_FILE_NAME)]
    output: PathBuf,

    /// Print feedback and stats as JSON instead of plain text.
    #[arg(long)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "DEBATE_COACH_NO_PROGRESS")]
    no_progress: bool,

    #[command(flatten)]
    model: ModelArgs,
}

#[cfg(feature = "server")]
#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "DEBATE_COACH_ADDR", default_value = "127.0.0.1:8501")]
    addr: std::net::SocketAddr,

    /// Largest accepted upload in bytes.
    #[arg(long, env = "DEBATE_COACH_MAX_UPLOAD", default_value_t = 20 * 1024 * 1024)]
    max_upload: usize,

    #[command(flatten)]
    model: ModelArgs,
}

/// Options shared by both subcommands.
#[derive(Args, Debug)]
struct ModelArgs {
    /// Chat model ID.
    #[arg(long, env = "DEBATE_COACH_MODEL", default_value = debate_coach::config::DEFAULT_MODEL)]
    model: String,

    /// Send the request through a provider SDK (openai, anthropic, gemini, ollama).
    #[arg(long, env = "DEBATE_COACH_PROVIDER")]
    provider: Option<String>,

    /// OpenAI-compatible API root for the HTTP transport.
    #[arg(long, env = "DEBATE_COACH_API_BASE", default_value = debate_coach::config::DEFAULT_API_BASE)]
    api_base: String,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "DEBATE_COACH_TEMPERATURE", default_value_t = 0.4)]
    temperature: f32,

    /// Max tokens of feedback.
    #[arg(long, env = "DEBATE_COACH_MAX_TOKENS", default_value_t = 350)]
    max_tokens: usize,

    /// Characters of the document sent to the model.
    #[arg(long, env = "DEBATE_COACH_MAX_INPUT_CHARS", default_value_t = 3000)]
    max_chars: usize,

    /// Feedback request timeout in seconds.
    #[arg(long, env = "DEBATE_COACH_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Text file with a custom prompt; `{text}` marks where the document goes.
    #[arg(long, env = "DEBATE_COACH_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    feedback: &'a debate_coach::Feedback,
    stats: &'a debate_coach::ReviewStats,
    report: &'a std::path::Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers what matters during a review; library logs only
    // show up in verbose mode. The server logs at INFO by default.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        match cli.command {
            Command::Review(_) => "warn",
            #[cfg(feature = "server")]
            Command::Serve(_) => "info",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Review(ref args) => run_review(args, cli.quiet).await,
        #[cfg(feature = "server")]
        Command::Serve(ref args) => run_serve(args).await,
    }
}

async fn run_review(args: &ReviewArgs, quiet: bool) -> Result<()> {
    let show_progress = !quiet && !args.no_progress && !args.json;
    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ReviewProgressCallback>)
    } else {
        None
    };

    let mut builder = model_config(&args.model).await?;
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    let output = review_to_file(&args.input, &args.output, &config)
        .await
        .context("Review failed")?;

    if args.json {
        let json = serde_json::to_string_pretty(&JsonOutput {
            feedback: &output.feedback,
            stats: &output.stats,
            report: &args.output,
        })
        .context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    println!("{}", output.feedback.content);

    if !quiet {
        if output.feedback.truncated {
            eprintln!(
                "{}",
                dim(&format!(
                    "Only the first {} of {} characters were reviewed.",
                    output.stats.submitted_chars, output.stats.extracted_chars
                ))
            );
        }
        eprintln!(
            "{}  {}ms  →  {}",
            green("✔"),
            output.stats.total_duration_ms,
            bold(&args.output.display().to_string()),
        );
    }
    Ok(())
}

#[cfg(feature = "server")]
async fn run_serve(args: &ServeArgs) -> Result<()> {
    let config = model_config(&args.model)
        .await?
        .max_upload_bytes(args.max_upload)
        .build()
        .context("Invalid configuration")?;

    debate_coach::server::serve(args.addr, config)
        .await
        .with_context(|| format!("Server on {} stopped", args.addr))
}

/// Map the shared model flags onto a config builder.
async fn model_config(args: &ModelArgs) -> Result<debate_coach::CoachConfigBuilder> {
    let mut builder = CoachConfig::builder()
        .model(&args.model)
        .api_base_url(&args.api_base)
        .temperature(args.temperature)
        .max_tokens(args.max_tokens)
        .max_input_chars(args.max_chars)
        .api_timeout_secs(args.api_timeout);

    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider);
    }

    if let Some(ref path) = args.prompt_file {
        let template = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        builder = builder.prompt_template(template);
    }

    Ok(builder)
}
