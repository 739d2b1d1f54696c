use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{CommandFactory, Parser, error::ErrorKind};
use clap_complete::Shell;
use colored::Colorize;
use framesift::{
    ExtractOptions, ExtractionSummary, FfmpegLogLevel, FrameExtractor, FramesiftError,
    OutputFormat, ProgressCallback, ProgressInfo,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "\
Examples:
  framesift input.mp4                       every frame as bmp into .
  framesift input.mp4 1000 frames 1         one jpg per second into frames/
  framesift input.mp4 500 thumbs 0 160 120  scaled bitmaps every 500 ms
  framesift input.mp4 0 . 0 160 --keep-aspect
                                            160 px wide, height from the source
  framesift --completions zsh > _framesift

Numeric arguments must be integers; anything else is a usage error (exit 2).
A negative interval writes every frame, like 0. Width and height apply only
when both are nonzero, unless --keep-aspect is given.";

#[derive(Debug, Parser)]
#[command(
    name = "framesift",
    version,
    about = "Extract still images from a video at a fixed time interval",
    after_help = CLI_AFTER_HELP,
    allow_negative_numbers = true
)]
struct Cli {
    /// Input media file.
    #[arg(required_unless_present = "completions")]
    input: Option<PathBuf>,

    /// Minimum milliseconds between written frames (0 or negative writes every frame).
    #[arg(default_value_t = 0)]
    interval_ms: i64,

    /// Existing directory the images are written into.
    #[arg(default_value = ".")]
    output_folder: PathBuf,

    /// Image format: 0 = bmp, 1 = jpg. Other values fall back to bmp.
    #[arg(default_value_t = 0)]
    format_index: i64,

    /// Output width in pixels. Used together with a nonzero height.
    width: Option<u32>,

    /// Output height in pixels. Used together with a nonzero width.
    height: Option<u32>,

    /// Derive a missing (or zero) width or height from the source aspect ratio.
    #[arg(long)]
    keep_aspect: bool,

    /// JPEG quality, 0-100.
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u8).range(0..=100))]
    quality: u8,

    /// Show additional logging output.
    #[arg(long)]
    verbose: bool,

    /// Show a progress bar.
    #[arg(long)]
    progress: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long)]
    log_level: Option<FfmpegLogLevel>,

    /// Print the run summary as JSON.
    #[arg(long)]
    json: bool,

    /// Print a shell completion script and exit.
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,
}

impl Cli {
    fn extract_options(&self) -> ExtractOptions {
        ExtractOptions::new()
            .with_interval_ms(u64::try_from(self.interval_ms).unwrap_or(0))
            .with_output_folder(&self.output_folder)
            .with_output_format(OutputFormat::from_index(self.format_index))
            .with_resolution(self.width, self.height)
            .with_maintain_aspect_ratio(self.keep_aspect)
            .with_quality(self.quality)
    }
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.green} {bar:40.cyan/blue} {pos}/{len} frames {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style.progress_chars("##-"));
        Self { bar }
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(total) = info.total_frames {
            self.bar.set_length(total.max(info.frames_decoded));
        }
        self.bar.set_position(info.frames_decoded);
        self.bar.set_message(format!("({} written)", info.frames_emitted));
        if info.finished {
            self.bar.finish();
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn print_summary(summary: &ExtractionSummary, as_json: bool) {
    if as_json {
        let payload = json!({
            "frames_decoded": summary.frames_decoded,
            "frames_emitted": summary.frames_emitted,
            "frames_skipped": summary.frames_skipped,
            "frames_failed": summary.frames_failed,
            "write_failures": summary.write_failures,
            "audio_frames_decoded": summary.audio_frames_decoded,
            "outputs": summary
                .outputs
                .iter()
                .map(|path| path.display().to_string())
                .collect::<Vec<_>>(),
        });
        println!("{payload:#}");
        return;
    }

    println!(
        "{} {}",
        "success:".green().bold(),
        format!(
            "Wrote {} image(s) from {} decoded frame(s)",
            summary.outputs.len(),
            summary.frames_decoded
        )
        .green()
    );
    if summary.frames_failed > 0 || summary.write_failures > 0 {
        eprintln!(
            "{} {} frame(s) could not be encoded, {} file(s) could not be written",
            "warning:".yellow().bold(),
            summary.frames_failed,
            summary.write_failures,
        );
    }
}

fn run(cli: &Cli, input: &Path) -> Result<ExtractionSummary, FramesiftError> {
    if let Some(level) = cli.log_level {
        framesift::set_ffmpeg_log_level(level);
    }

    if !cli.output_folder.is_dir() {
        eprintln!(
            "{} output folder {} does not exist; images will not be written",
            "warning:".yellow().bold(),
            cli.output_folder.display(),
        );
    }

    let mut options = cli.extract_options();
    if cli.progress {
        options = options
            .with_progress(Arc::new(TerminalProgress::new()))
            .with_batch_size(10);
    }

    FrameExtractor::new(options).run(input)
}

fn main() {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        let mut command = Cli::command();
        clap_complete::generate(shell, &mut command, "framesift", &mut std::io::stdout());
        return;
    }

    let Some(input) = cli.input.clone() else {
        Cli::command()
            .error(ErrorKind::MissingRequiredArgument, "an input file is required")
            .exit();
    };

    init_logging(cli.verbose);

    match run(&cli, &input) {
        Ok(summary) => print_summary(&summary, cli.json),
        Err(error) => {
            eprintln!("{} {error}", "error:".red().bold());
            std::process::exit(error.exit_code());
        }
    }
}
