use clap::Parser;
use convertkit::{manifest, ConvertConfig, ConvertError, RunSummary, ToolPaths};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "gfx-convert-3ds")]
#[command(
    about = "Convert a game data tree to 3DS-ready textures, audio and load lists",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Source data directory
    data_dir: PathBuf,

    /// Output directory (mirrors the source tree)
    out_dir: PathBuf,

    /// Convert everything, even assets whose output already exists
    #[arg(long)]
    redo: bool,

    /// Keep a preview bitmap beside every packed texture
    #[arg(long)]
    preview: bool,

    /// Read image dimensions from file headers instead of running `identify`
    #[arg(long)]
    builtin_probe: bool,

    /// Re-read every written load list with the runtime's limits
    #[arg(long)]
    verify: bool,

    /// ImageMagick `convert` executable
    #[arg(long, default_value = "convert")]
    convert: PathBuf,

    /// ImageMagick `identify` executable
    #[arg(long, default_value = "identify")]
    identify: PathBuf,

    /// Texture packer executable
    #[arg(long, default_value = "tex3ds")]
    tex3ds: PathBuf,

    /// Audio transcoder executable
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// Suppress progress output (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn config(&self) -> ConvertConfig {
        ConvertConfig {
            source_dir: self.data_dir.clone(),
            out_dir: self.out_dir.clone(),
            force_redo: self.redo,
            keep_preview: self.preview,
            builtin_probe: self.builtin_probe,
            tools: ToolPaths {
                convert: self.convert.clone(),
                identify: self.identify.clone(),
                tex3ds: self.tex3ds.clone(),
                ffmpeg: self.ffmpeg.clone(),
            },
        }
    }
}

fn run(cli: &Cli) -> Result<RunSummary, ConvertError> {
    let summary = convertkit::convert_tree(&cli.config())?;

    if cli.verify {
        for list in &summary.manifests {
            let entries = manifest::verify_manifest(list)?;
            log::debug!("{}: {} entries ok", list.display(), entries.len());
        }
    }

    Ok(summary)
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging (suppressed if --quiet)
    if !cli.quiet {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    match run(&cli) {
        Ok(summary) => log::info!(
            "Done: {} converted, {} copied, {} skipped, {} failed, {} load lists",
            summary.converted,
            summary.copied,
            summary.skipped,
            summary.failed,
            summary.manifests.len()
        ),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
