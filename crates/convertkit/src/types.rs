use crate::error::ConvertError;
use std::fmt;
use std::path::{Path, PathBuf};

/// Extension of the console-native packed texture.
pub const PACKED_EXT: &str = "t3x";

/// Suffix of the size side-file written next to every packed unit.
pub const SIZE_SUFFIX: &str = ".size";

/// Name of the per-directory load list consumed by the runtime.
pub const MANIFEST_NAME: &str = "graphics.list";

/// Names of the external programs the converter drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    /// ImageMagick `convert` (resample, mask compositing, cropping).
    pub convert: PathBuf,
    /// ImageMagick `identify` (dimension probe).
    pub identify: PathBuf,
    /// devkitPro texture packer.
    pub tex3ds: PathBuf,
    /// Audio transcoder.
    pub ffmpeg: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            convert: PathBuf::from("convert"),
            identify: PathBuf::from("identify"),
            tex3ds: PathBuf::from("tex3ds"),
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }
}

/// Configuration for one conversion run.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Root of the source asset tree.
    pub source_dir: PathBuf,
    /// Root of the output tree (mirrors `source_dir`).
    pub out_dir: PathBuf,
    /// Convert every asset even when an output form already exists.
    pub force_redo: bool,
    /// Keep a preview bitmap beside every packed unit.
    pub keep_preview: bool,
    /// Answer dimension probes from the image header instead of `identify`.
    pub builtin_probe: bool,
    /// External program locations.
    pub tools: ToolPaths,
}

impl ConvertConfig {
    /// Configuration with both toggles off and default tool names.
    pub fn new(source_dir: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            out_dir: out_dir.into(),
            force_redo: false,
            keep_preview: false,
            builtin_probe: false,
            tools: ToolPaths::default(),
        }
    }

    /// Root-level `graphics` directory of the source tree, where shared masks live.
    pub fn graphics_dir(&self) -> PathBuf {
        self.source_dir.join("graphics")
    }
}

/// What a source file is, decided from its name and directory context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// Image rasterized to a bitmap and packed. `with_alpha` images look for a mask.
    RasterImage { with_alpha: bool },
    /// Font descriptor, copied with its texture references rewritten.
    FontIndex,
    /// Sound effect transcoded to a waveform container.
    SoundEffect,
    /// Sound table, copied with its `.ogg` references rewritten.
    SoundConfig,
    /// Music transcoded to a lossy stream under the source file name.
    MusicTrack,
    /// Anything else, copied verbatim.
    OpaqueCopy,
}

impl AssetKind {
    /// Human-readable form of the transform applied to this kind.
    pub fn command_template(&self) -> &'static str {
        match self {
            AssetKind::RasterImage { with_alpha: false } => "resample -> bmp -> t3x",
            AssetKind::RasterImage { with_alpha: true } => "mask composite -> bmp -> t3x",
            AssetKind::FontIndex => "copy, rewrite .png -> .t3x",
            AssetKind::SoundEffect => "transcode -> .wav",
            AssetKind::SoundConfig => "copy, rewrite .ogg\" -> .ogg.wav\"",
            AssetKind::MusicTrack => "transcode -> ogg, keep name",
            AssetKind::OpaqueCopy => "copy",
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, AssetKind::RasterImage { .. })
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command_template())
    }
}

/// Resample percentage passed to the resampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    /// Default 50% downscale (sources are authored at 2x).
    Half,
    /// Native resolution, for font textures with a non-1 texture scale.
    Native,
}

impl Scale {
    pub fn percent(&self) -> u32 {
        match self {
            Scale::Half => 50,
            Scale::Native => 100,
        }
    }
}

/// Pixel dimensions of a texture unit in destination (doubled) pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeRecord {
    pub width: u32,
    pub height: u32,
}

impl SizeRecord {
    /// Largest dimension the runtime's fixed 4-column reader can represent.
    pub const RUNTIME_MAX_COLUMNS: u32 = 9999;

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Parse the `W,H` line printed by the dimension probe.
    pub fn from_probe_output(path: &Path, output: &str) -> Result<Self, ConvertError> {
        let malformed = || ConvertError::ProbeParse {
            path: path.to_path_buf(),
            output: output.to_string(),
        };

        let (w, h) = output.trim().split_once(',').ok_or_else(malformed)?;
        let width = w.trim().parse::<u32>().map_err(|_| malformed())?;
        let height = h.trim().parse::<u32>().map_err(|_| malformed())?;
        Ok(Self { width, height })
    }

    /// Text of the size side-file: both values right-justified to 4 columns.
    pub fn to_side_file(&self) -> String {
        format!("{:>4}\n{:>4}\n", self.width, self.height)
    }

    /// Parse the text of a size side-file.
    pub fn from_side_file(text: &str) -> Option<Self> {
        let mut lines = text.lines();
        let width = lines.next()?.trim().parse().ok()?;
        let height = lines.next()?.trim().parse().ok()?;
        Some(Self { width, height })
    }

    /// Whether the runtime's 10-byte side-file reader can read this record back.
    pub fn fits_runtime_layout(&self) -> bool {
        self.width <= Self::RUNTIME_MAX_COLUMNS && self.height <= Self::RUNTIME_MAX_COLUMNS
    }
}

impl fmt::Display for SizeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One record of a `graphics.list` load list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Base name with the kind-separator replaced by a space (`block red`).
    pub display_name: String,
    /// Unit path relative to the load list's directory (`level1/block-red.t3x`).
    pub asset_path: String,
    /// Raw side-file contents (`"  64\n  64\n"`).
    pub size_text: String,
}

impl ManifestEntry {
    /// Serialized record: name, path, size lines, blank separator.
    pub fn to_record(&self) -> String {
        format!("{}\n{}\n{}\n", self.display_name, self.asset_path, self.size_text)
    }
}

/// Tally of one conversion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Assets transformed by an external tool.
    pub converted: usize,
    /// Assets copied (verbatim or with text rewrites).
    pub copied: usize,
    /// Entries skipped (masks, junk, already converted).
    pub skipped: usize,
    /// Assets whose external tool exited non-zero.
    pub failed: usize,
    /// Load lists written by the manifest pass.
    pub manifests: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_output_parses() {
        let size = SizeRecord::from_probe_output(Path::new("a.bmp"), "64,128").unwrap();
        assert_eq!(size, SizeRecord::new(64, 128));

        let size = SizeRecord::from_probe_output(Path::new("a.bmp"), " 32,16\n").unwrap();
        assert_eq!(size, SizeRecord::new(32, 16));
    }

    #[test]
    fn test_probe_output_malformed() {
        for bad in ["", "64", "64x64", "a,b", "64,", "-2,4"] {
            let err = SizeRecord::from_probe_output(Path::new("a.bmp"), bad).unwrap_err();
            assert!(matches!(err, ConvertError::ProbeParse { .. }), "{bad:?}");
        }
    }

    #[test]
    fn test_side_file_layout() {
        assert_eq!(SizeRecord::new(64, 64).to_side_file(), "  64\n  64\n");
        assert_eq!(SizeRecord::new(1280, 4096).to_side_file(), "1280\n4096\n");
        assert_eq!(
            SizeRecord::from_side_file("  64\n 128\n"),
            Some(SizeRecord::new(64, 128))
        );
        assert_eq!(SizeRecord::from_side_file("64\n"), None);
    }

    #[test]
    fn test_runtime_layout_limit() {
        assert!(SizeRecord::new(9999, 64).fits_runtime_layout());
        assert!(!SizeRecord::new(10000, 64).fits_runtime_layout());
    }

    #[test]
    fn test_manifest_record() {
        let entry = ManifestEntry {
            display_name: "block red".to_string(),
            asset_path: "level1/block-red.t3x".to_string(),
            size_text: "  64\n  64\n".to_string(),
        };
        assert_eq!(entry.to_record(), "block red\nlevel1/block-red.t3x\n  64\n  64\n\n");
    }

    #[test]
    fn test_scale_percent() {
        assert_eq!(Scale::Half.percent(), 50);
        assert_eq!(Scale::Native.percent(), 100);
    }
}
