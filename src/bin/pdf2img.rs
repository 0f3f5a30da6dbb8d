//! CLI binary for edgequake-pdf2img.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionOptions` and writes the resulting images.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use edgequake_pdf2img::{
    load_ffmpeg, write_atomic, write_results, ConversionOptions, ConversionProgressCallback, EngineRegistry,
    EngineSource, ObjectUrlStore, OutputFormat, PdfConverter, PdfFile,
};
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    page_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    /// Spinner until `on_conversion_start` tells us the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: Mutex::new(None),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Rendering");
        self.bar.reset_eta();
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Rendering {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_number: usize, _total_pages: usize) {
        *self.page_started.lock() = Some(Instant::now());
        self.bar.set_message(format!("page {page_number}"));
    }

    fn on_page_complete(&self, page_number: usize, total_pages: usize, encoded_len: usize) {
        let elapsed_ms = self
            .page_started
            .lock()
            .take()
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<10}  {}",
            green("✓"),
            page_number,
            total_pages,
            dim(&format!("{:>7} KB", encoded_len / 1024)),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total_pages: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} pages rendered",
            green("✔"),
            bold(&total_pages.to_string())
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Every page as PNG into ./out
  pdf2img convert document.pdf -o out

  # JPEG at 80% quality, 1.5x scale
  pdf2img convert --format jpeg --quality 0.8 --scale 1.5 report.pdf -o pages

  # Convert from URL
  pdf2img convert https://arxiv.org/pdf/1706.03762 -o attention

  # First page only, placeholder if rendering fails
  pdf2img single --format webp document.pdf -o thumbs

  # Document information
  pdf2img info --json document.pdf

  # Fetch and validate the ffmpeg WASM core, keep a copy
  pdf2img media -o ffmpeg-core

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH           Path to an existing libpdfium (skips auto-download)
  PDFIUM_AUTO_CACHE_DIR     Override the pdfium cache directory
  PDFIUM_BASE_URL           Mirror of the pdfium-binaries release downloads
  PDFIUM_VERSION            pdfium-binaries build to download
  PDF2IMG_FFMPEG_BASE_URL   Directory URL of ffmpeg-core.js / ffmpeg-core.wasm
  PDF2IMG_FFMPEG_VERSION    Version label of the ffmpeg core

SETUP:
  PDFium (~30 MB) is downloaded automatically on first run and cached in
  ~/.cache/pdf2img/pdfium-7690/. No manual library setup is required.
  To use an existing pdfium copy: PDFIUM_LIB_PATH=/path/to/libpdfium pdf2img ...
"#;

/// Render PDF pages into PNG, JPEG or WebP images.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2img",
    version,
    about = "Render PDF pages into PNG, JPEG or WebP images",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Disable progress bars.
    #[arg(long, global = true, env = "PDF2IMG_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF2IMG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDF2IMG_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, global = true, env = "PDF2IMG_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render every page and write one image per page.
    Convert {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,

        /// Directory receiving the images.
        #[arg(short, long, env = "PDF2IMG_OUTPUT", default_value = ".")]
        output: PathBuf,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Render the first page only, falling back to a placeholder image.
    Single {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,

        /// Directory receiving the image.
        #[arg(short, long, env = "PDF2IMG_OUTPUT", default_value = ".")]
        output: PathBuf,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Print page count and document information.
    Info {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,

        /// Output JSON instead of text.
        #[arg(long, env = "PDF2IMG_JSON")]
        json: bool,
    },

    /// Fetch and validate the ffmpeg WASM core.
    Media {
        /// Save ffmpeg-core.js and ffmpeg-core.wasm into this directory.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
struct RenderArgs {
    /// Output format: png, jpg, jpeg, webp.
    #[arg(long, env = "PDF2IMG_FORMAT", default_value = "png")]
    format: OutputFormat,

    /// Encoder quality (0.0–1.0). Only JPEG uses it.
    #[arg(long, env = "PDF2IMG_QUALITY", default_value_t = 0.95)]
    quality: f32,

    /// Render scale; 1.0 renders at 72 DPI.
    #[arg(long, env = "PDF2IMG_SCALE", default_value_t = 2.0)]
    scale: f32,
}

impl RenderArgs {
    fn options(&self) -> Result<ConversionOptions> {
        ConversionOptions::builder()
            .format(self.format)
            .quality(self.quality)
            .scale(self.scale)
            .build()
            .context("Invalid options")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs while a progress bar is shown.
    let show_progress = !cli.quiet && !cli.no_progress;
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

    let source = EngineSource::from_env();

    match cli.command {
        Command::Convert {
            input,
            output,
            render,
        } => {
            let options = render.options()?;
            let mut converter = build_converter(source, show_progress, Provisioning::Required)?;
            if show_progress {
                converter = converter.with_progress(CliProgressCallback::new_dynamic());
            }
            let file = PdfFile::resolve(&input, cli.download_timeout)
                .await
                .context("Failed to read input")?;
            let start = Instant::now();
            let results = converter
                .convert_pdf_to_images(&file, &options)
                .await
                .context("Conversion failed")?;
            let written = write_results(&results, &output)
                .await
                .context("Failed to write images")?;

            if !cli.quiet {
                eprintln!(
                    "{}  {} images  {}ms  →  {}",
                    green("✔"),
                    written.len(),
                    start.elapsed().as_millis(),
                    bold(&output.display().to_string()),
                );
            }
        }
        Command::Single {
            input,
            output,
            render,
        } => {
            let options = render.options()?;
            // A missing engine is one more reason for the placeholder.
            let converter = build_converter(source, show_progress, Provisioning::BestEffort)?;
            let file = PdfFile::resolve(&input, cli.download_timeout)
                .await
                .context("Failed to read input")?;
            let single = converter
                .convert_pdf_to_single_image(&file, render.format, &options)
                .await
                .context("Placeholder generation failed")?;

            // Placeholder results carry their bytes only behind the URL.
            let blob = converter
                .object_urls()
                .resolve(&single.result.url)
                .context("Result URL was revoked")?;
            let path = output.join(&single.result.filename);
            tokio::fs::create_dir_all(&output)
                .await
                .with_context(|| format!("Failed to create {:?}", output))?;
            write_atomic(&path, &blob)
                .await
                .context("Failed to write image")?;

            if let Some(reason) = &single.fallback_reason {
                eprintln!(
                    "{} placeholder written to {}  {}",
                    yellow("⚠"),
                    bold(&path.display().to_string()),
                    dim(&reason.to_string()),
                );
            } else if !cli.quiet {
                eprintln!("{}  →  {}", green("✔"), bold(&path.display().to_string()));
            }
        }
        Command::Info { input, json } => {
            let converter = build_converter(source, show_progress, Provisioning::Required)?;
            let file = PdfFile::resolve(&input, cli.download_timeout)
                .await
                .context("Failed to read input")?;
            let info = converter
                .get_pdf_info(&file)
                .await
                .context("Failed to inspect PDF")?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&info).context("Failed to serialize metadata")?
                );
            } else {
                println!("File:         {}", input);
                println!("Pages:        {}", info.num_pages);
                if let Some(ref t) = info.title {
                    println!("Title:        {}", t);
                }
                if let Some(ref a) = info.author {
                    println!("Author:       {}", a);
                }
                if let Some(ref s) = info.subject {
                    println!("Subject:      {}", s);
                }
                if let Some(ref c) = info.creator {
                    println!("Creator:      {}", c);
                }
            }
        }
        Command::Media { output } => {
            run_media(&source, output.as_deref(), cli.quiet).await?;
        }
    }

    Ok(())
}

/// What to do when PDFium cannot be provisioned up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Provisioning {
    /// Abort the command.
    Required,
    /// Warn and let the conversion report the failure itself.
    BestEffort,
}

/// Make sure PDFium is on disk, then build a converter around it.
fn build_converter(
    source: EngineSource,
    show_progress: bool,
    provisioning: Provisioning,
) -> Result<PdfConverter> {
    // First run downloads the library to ~/.cache/pdf2img/pdfium-{VERSION}/;
    // later runs only check the path.
    if !source.pdfium.is_cached() {
        match provision_pdfium(&source, show_progress) {
            Ok(()) => {}
            Err(e) if provisioning == Provisioning::BestEffort => {
                warn!("PDFium unavailable, continuing: {:#}", e);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(PdfConverter::new(Arc::new(EngineRegistry::pdfium(source))))
}

/// Download PDFium with a byte-level progress bar (or silently).
fn provision_pdfium(source: &EngineSource, show_progress: bool) -> Result<()> {
    if !show_progress {
        tokio::task::block_in_place(|| pdfium_auto::ensure_library(&source.pdfium, None))
            .context("Failed to download PDFium engine")?;
        return Ok(());
    }

    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS),
    );
    dl_bar.set_prefix("PDF engine");
    dl_bar.set_message("Connecting…");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    // block_in_place keeps the borrowed callback valid while the blocking
    // download runs off the async executor.
    tokio::task::block_in_place(|| {
        pdfium_auto::ensure_library(
            &source.pdfium,
            Some(&|downloaded, total| {
                if let Some(t) = total {
                    if bar.length().unwrap_or(0) != t {
                        bar.set_length(t);
                    }
                }
                bar.set_position(downloaded);
            }),
        )
    })
    .context("Failed to download PDFium engine")?;

    dl_bar.finish_with_message("ready ✓");
    Ok(())
}

async fn run_media(source: &EngineSource, output: Option<&Path>, quiet: bool) -> Result<()> {
    let urls = ObjectUrlStore::new();
    let engine = load_ffmpeg(&source.media, &urls)
        .await
        .context("Failed to load FFmpeg core")?;

    if !quiet {
        eprintln!(
            "{} ffmpeg core {}  {}",
            green("✔"),
            bold(&engine.version),
            dim(&format!(
                "{} KB script, {} KB wasm",
                engine.core.len() / 1024,
                engine.wasm.len() / 1024
            )),
        );
    }

    if let Some(dir) = output {
        let written = engine
            .write_to_dir(dir)
            .await
            .context("Failed to save FFmpeg core")?;
        for path in written {
            println!("{}", path.display());
        }
    }
    Ok(())
}
