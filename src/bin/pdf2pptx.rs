//! CLI binary for edgequake-pdf2pptx.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ReconstructionConfig` and writes the rebuilt deck.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2pptx::convert::write_atomic;
use edgequake_pdf2pptx::{
    convert, inspect, render_thumbnails, PageSelection, ProgressCallback, ProgressUpdate,
    ReconstructionConfig, ReconstructionProgressCallback, SkippedElement, SlideLayout, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Terminal progress: a percentage bar driven by stage updates, plus one
/// log line per finished page.
struct CliProgressCallback {
    bar: ProgressBar,
    page_started: std::sync::Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: std::sync::Mutex::new(None),
        })
    }
}

impl ReconstructionProgressCallback for CliProgressCallback {
    fn on_update(&self, update: &ProgressUpdate) {
        match update.stage {
            Stage::Done => {
                self.bar.set_position(100);
                self.bar.finish_and_clear();
            }
            Stage::Error => {
                self.bar.abandon_with_message(red(&update.message));
            }
            stage => {
                self.bar.set_prefix(stage.to_string());
                self.bar.set_position(update.percent as u64);
                self.bar.set_message(update.message.clone());
            }
        }
    }

    fn on_page_start(&self, _page_num: usize, _index: usize, _total: usize) {
        if let Ok(mut started) = self.page_started.lock() {
            *started = Some(Instant::now());
        }
    }

    fn on_page_complete(&self, page_num: usize, total: usize, element_count: usize) {
        let elapsed_ms = self
            .page_started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.bar.println(format!(
            "  {} Page {:>3}  {:<12}  {}",
            green("✓"),
            page_num,
            dim(&format!("{element_count:>3} elements")),
            dim(&format!("{:.1}s  ({total} selected)", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_element_skipped(&self, skipped: &SkippedElement) {
        self.bar.println(format!(
            "  {} Page {:>3}  graphic #{} dropped: {}",
            yellow("⚠"),
            skipped.page_num,
            skipped.element_index,
            skipped.reason,
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Rebuild a deck next to the current directory (deck_restored_pro.pptx)
  pdf2pptx deck.pdf

  # Choose the output path
  pdf2pptx deck.pdf -o editable.pptx

  # Only some slides
  pdf2pptx --pages 2-6 deck.pdf

  # Preview pages first (writes page-001.jpg, … into ./thumbs)
  pdf2pptx --thumbnails thumbs deck.pdf

  # Inspect PDF metadata (no API key needed)
  pdf2pptx --inspect-only deck.pdf

  # Another vision model
  pdf2pptx --provider openai --model gpt-4.1 deck.pdf

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (default provider)
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (gemini, openai, anthropic, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium
"#;

/// Rebuild PDF slide decks as editable PowerPoint files using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2pptx",
    version,
    about = "Rebuild PDF slide decks as editable PowerPoint files using Vision LLMs",
    long_about = "Rasterise every page of a PDF slide deck, recover its layout with a Vision \
Language Model, cut graphics out with a chroma key and lay editable text boxes on top. \
Supports Google Gemini, OpenAI, Anthropic and any OpenAI-compatible endpoint.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write the .pptx here instead of `<name>_restored_pro.pptx`.
    #[arg(short, long, env = "PDF2PPTX_OUTPUT")]
    output: Option<PathBuf>,

    /// Vision model ID (e.g. gemini-2.5-flash, gpt-4.1).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDF2PPTX_PAGES", default_value = "all")]
    pages: String,

    /// Analysis render scale (1.0 = 72 DPI).
    #[arg(long, env = "PDF2PPTX_SCALE", default_value_t = 2.0)]
    scale: f32,

    /// Chroma-key threshold (sum of absolute RGB differences).
    #[arg(long, env = "PDF2PPTX_THRESHOLD", default_value_t = 45)]
    threshold: u32,

    /// Slide size.
    #[arg(long, value_enum, default_value = "wide16x9")]
    layout: LayoutArg,

    /// Typeface for every text box.
    #[arg(long, env = "PDF2PPTX_FONT")]
    font: Option<String>,

    /// Keep text boxes inside the slide instead of letting them overflow.
    #[arg(long)]
    clamp_text: bool,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2PPTX_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a custom layout prompt.
    #[arg(long, env = "PDF2PPTX_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max LLM output tokens per page.
    #[arg(long, env = "PDF2PPTX_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDF2PPTX_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Render page thumbnails into this directory and exit.
    #[arg(long, value_name = "DIR")]
    thumbnails: Option<PathBuf>,

    /// Print PDF metadata only, no reconstruction.
    #[arg(long)]
    inspect_only: bool,

    /// Print the run summary (slides, skipped elements, stats) as JSON.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2PPTX_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2PPTX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2PPTX_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2PPTX_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum LayoutArg {
    Wide16x9,
    Standard4x3,
    Wide,
}

impl From<LayoutArg> for SlideLayout {
    fn from(v: LayoutArg) -> Self {
        match v {
            LayoutArg::Wide16x9 => SlideLayout::Widescreen16x9,
            LayoutArg::Standard4x3 => SlideLayout::Standard4x3,
            LayoutArg::Wide => SlideLayout::Wide,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless --verbose asks for them.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress && cli.thumbnails.is_none() {
        Some(CliProgressCallback::new() as Arc<dyn ReconstructionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
        }
        return Ok(());
    }

    // ── Thumbnail mode ───────────────────────────────────────────────────
    if let Some(ref dir) = cli.thumbnails {
        let thumbs = render_thumbnails(&cli.input, &config)
            .await
            .context("Failed to render thumbnails")?;
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        for t in &thumbs {
            let path = dir.join(format!("page-{:03}.jpg", t.page_num));
            tokio::fs::write(&path, &t.jpeg)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        if !cli.quiet {
            eprintln!(
                "{} {} thumbnails  →  {}",
                green("✔"),
                thumbs.len(),
                bold(&dir.display().to_string())
            );
        }
        return Ok(());
    }

    // ── Run reconstruction ───────────────────────────────────────────────
    let output = convert(&cli.input, &config)
        .await
        .context("Reconstruction failed")?;

    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| Path::new(&output.file_name).to_path_buf());
    write_atomic(&output_path, &output.pptx)
        .await
        .context("Failed to write presentation")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    }

    if !cli.quiet {
        let stats = &output.stats;
        eprintln!(
            "{}  {} slides  {}ms  →  {}",
            if stats.skipped_elements == 0 {
                green("✔")
            } else {
                yellow("⚠")
            },
            stats.processed_pages,
            stats.total_duration_ms,
            bold(&output_path.display().to_string()),
        );
        eprintln!(
            "   {} pictures  /  {} text boxes  /  {} dropped",
            dim(&stats.images_placed.to_string()),
            dim(&stats.text_boxes_placed.to_string()),
            dim(&stats.skipped_elements.to_string()),
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out",
            dim(&stats.total_input_tokens.to_string()),
            dim(&stats.total_output_tokens.to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `ReconstructionConfig`.
async fn build_config(
    cli: &Cli,
    progress: Option<ProgressCallback>,
) -> Result<ReconstructionConfig> {
    let mut builder = ReconstructionConfig::builder()
        .analysis_scale(cli.scale)
        .chroma_threshold(cli.threshold)
        .slide_layout(cli.layout.clone().into())
        .clamp_text_bounds(cli.clamp_text)
        .pages(cli.pages.parse::<PageSelection>().context("Invalid --pages")?)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref font) = cli.font {
        builder = builder.font_face(font);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
