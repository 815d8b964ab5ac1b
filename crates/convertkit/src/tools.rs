//! Typed invocations of the external image, texture and audio tools.
//!
//! The decision engine only ever produces [`Operation`] values and hands
//! them to a [`Toolchain`]. [`ExternalTools`] turns them into processes; tests
//! substitute a recording implementation.

use crate::error::ConvertError;
use crate::types::{Scale, SizeRecord, ToolPaths};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Pixel format requested from the texture packer.
pub const PACKED_FORMAT: &str = "rgba8888";

/// `identify` format string printing doubled dimensions as `W,H`.
pub const PROBE_FORMAT: &str = "%[fx:w*2],%[fx:h*2]";

/// How a mask image becomes the base image's alpha channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskMode {
    /// Copy the mask into alpha with alpha off, then negate alpha
    /// (GIF masks are white where the sprite is transparent).
    InvertedOpacity,
    /// Copy the mask into alpha with alpha on, no negation (PNG-authored masks).
    DirectOpacity,
}

/// One external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Resample `input` by `scale` into `output`.
    Resample {
        input: PathBuf,
        output: PathBuf,
        scale: Scale,
    },
    /// Composite `mask` into the alpha channel of `base`, then resample.
    CompositeMask {
        base: PathBuf,
        mask: PathBuf,
        mode: MaskMode,
        scale: Scale,
        output: PathBuf,
    },
    /// Print doubled dimensions of `image` as `W,H`.
    Probe { image: PathBuf },
    /// Cut `bitmap` into horizontal bands written to `<bitmap>N.bmp`.
    CropBands {
        bitmap: PathBuf,
        width: u32,
        band_height: u32,
    },
    /// Pack a bitmap into the console texture format.
    Pack {
        bitmap: PathBuf,
        output: PathBuf,
        preview: Option<PathBuf>,
    },
    /// Convert between audio formats; `best_quality` selects `-aq 1`.
    Transcode {
        input: PathBuf,
        output: PathBuf,
        best_quality: bool,
    },
}

impl Operation {
    /// Short name used in log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Operation::Resample { .. } => "resample",
            Operation::CompositeMask { .. } => "composite",
            Operation::Probe { .. } => "probe",
            Operation::CropBands { .. } => "crop",
            Operation::Pack { .. } => "pack",
            Operation::Transcode { .. } => "transcode",
        }
    }
}

/// Result of running one external tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub duration: Duration,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Successful result carrying `stdout`.
    pub fn success_with(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            duration: Duration::ZERO,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed result with the given exit code.
    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            duration: Duration::ZERO,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Executes [`Operation`]s.
pub trait Toolchain {
    /// Run one operation to completion.
    ///
    /// A non-zero exit is an `Ok` result; `Err` means the tool could not be
    /// run at all.
    fn execute(&mut self, op: &Operation) -> Result<ToolOutput, ConvertError>;
}

/// Probe `image` and parse its doubled dimensions.
///
/// A probe that fails or prints anything but `W,H` is fatal.
pub fn probe_size<T: Toolchain + ?Sized>(
    tools: &mut T,
    image: &Path,
) -> Result<SizeRecord, ConvertError> {
    let output = tools.execute(&Operation::Probe {
        image: image.to_path_buf(),
    })?;
    if !output.success() {
        return Err(ConvertError::ProbeParse {
            path: image.to_path_buf(),
            output: output.stderr,
        });
    }
    SizeRecord::from_probe_output(image, &output.stdout)
}

/// Program plus argument vector for one operation. No shell is involved,
/// so paths are passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_os_string());
        }
        self
    }

    /// Build the command line for `op`.
    pub fn for_operation(paths: &ToolPaths, op: &Operation) -> Self {
        match op {
            Operation::Resample {
                input,
                output,
                scale,
            } => Self::new(&paths.convert)
                .arg("-sample")
                .arg(format!("{}%", scale.percent()))
                .arg(input)
                .arg(output),
            Operation::CompositeMask {
                base,
                mask,
                mode,
                scale,
                output,
            } => {
                let cmd = Self::new(&paths.convert).arg(base).arg(mask);
                let cmd = match mode {
                    MaskMode::InvertedOpacity => cmd.args([
                        "-alpha",
                        "Off",
                        "-compose",
                        "CopyOpacity",
                        "-composite",
                        "-channel",
                        "a",
                        "-negate",
                        "+channel",
                    ]),
                    MaskMode::DirectOpacity => cmd.args([
                        "-alpha",
                        "On",
                        "-compose",
                        "CopyOpacity",
                        "-composite",
                    ]),
                };
                cmd.arg("-sample")
                    .arg(format!("{}%", scale.percent()))
                    .arg(output)
            }
            Operation::Probe { image } => {
                // First frame only: animated GIFs would print one line per frame.
                let mut first_frame = image.clone().into_os_string();
                first_frame.push("[0]");
                Self::new(&paths.identify)
                    .args(["-format", PROBE_FORMAT])
                    .arg(first_frame)
            }
            Operation::CropBands {
                bitmap,
                width,
                band_height,
            } => {
                let mut pattern = bitmap.clone().into_os_string();
                pattern.push("%d.bmp");
                Self::new(&paths.convert)
                    .arg(bitmap)
                    .arg("-crop")
                    .arg(format!("{width}x{band_height}"))
                    .arg(pattern)
            }
            Operation::Pack {
                bitmap,
                output,
                preview,
            } => {
                let cmd = Self::new(&paths.tex3ds)
                    .arg(bitmap)
                    .args(["-f", PACKED_FORMAT, "-o"])
                    .arg(output);
                match preview {
                    Some(preview) => cmd.arg("-p").arg(preview),
                    None => cmd,
                }
            }
            Operation::Transcode {
                input,
                output,
                best_quality,
            } => {
                let cmd = Self::new(&paths.ffmpeg)
                    .args(["-nostdin", "-y", "-i"])
                    .arg(input);
                let cmd = if *best_quality {
                    cmd.args(["-aq", "1"])
                } else {
                    cmd
                };
                cmd.arg(output)
            }
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    /// Render as a copy-pasteable shell line.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(|a| a.as_os_str()))
            .map(|part| shell_quote(&part.to_string_lossy()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Spawn, wait and capture the result.
    pub fn run(&self) -> Result<ToolOutput, ConvertError> {
        let start = Instant::now();
        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ConvertError::ToolLaunch {
                program: self.program.display().to_string(),
                source,
            })?;

        Ok(ToolOutput {
            code: output.status.code(),
            duration: start.elapsed(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Quote `s` for a POSIX shell when it contains anything unusual.
fn shell_quote(s: &str) -> String {
    let plain = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./%,:=+@".contains(c));
    if plain {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

/// Production [`Toolchain`]: ImageMagick, tex3ds and ffmpeg processes.
#[derive(Debug, Clone)]
pub struct ExternalTools {
    paths: ToolPaths,
    builtin_probe: bool,
}

impl ExternalTools {
    pub fn new(paths: ToolPaths, builtin_probe: bool) -> Self {
        Self {
            paths,
            builtin_probe,
        }
    }

    /// Answer a probe from the image header without spawning `identify`.
    fn probe_header(image: &Path) -> Result<ToolOutput, ConvertError> {
        let start = Instant::now();
        let (width, height) =
            image::image_dimensions(image).map_err(|e| ConvertError::ImageDecode {
                path: image.to_path_buf(),
                message: e.to_string(),
            })?;
        let mut output = ToolOutput::success_with(format!("{},{}", width * 2, height * 2));
        output.duration = start.elapsed();
        Ok(output)
    }
}

impl Toolchain for ExternalTools {
    fn execute(&mut self, op: &Operation) -> Result<ToolOutput, ConvertError> {
        if let (true, Operation::Probe { image }) = (self.builtin_probe, op) {
            return Self::probe_header(image);
        }

        let command = ToolCommand::for_operation(&self.paths, op);
        log::debug!("{}", command.display());
        let output = command.run()?;
        log::debug!(
            "{} exited with {:?} after {:.2?}",
            op.label(),
            output.code,
            output.duration
        );
        Ok(output)
    }
}
