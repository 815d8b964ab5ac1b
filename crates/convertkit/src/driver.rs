//! Tree conversion.
//!
//! Pass 1 walks the source tree top-down and converts each file in listing
//! order. Pass 2 walks the finished output tree and writes load lists.
//! Everything runs on one thread and every tool call blocks.

use crate::classify::{classify, DirContext, Disposition, SkipReason};
use crate::error::ConvertError;
use crate::fonts::FontScaleRegistry;
use crate::identifier::with_extension;
use crate::manifest;
use crate::mask::{mask_candidates, resolve_mask};
use crate::tiler::{band_bitmap, split_bitmap, unit_name, TilePlan};
use crate::tools::{probe_size, Operation, Toolchain};
use crate::types::{
    AssetKind, ConvertConfig, RunSummary, Scale, SizeRecord, PACKED_EXT, SIZE_SUFFIX,
};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Final state of one source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Skipped(SkipReason),
    /// Transformed by an external tool.
    Converted,
    /// Copied, possibly with text rewrites.
    Copied,
    /// An external tool exited non-zero; the run goes on.
    Failed,
}

/// Converts one source tree into one output tree.
pub struct ConversionDriver<T: Toolchain> {
    config: ConvertConfig,
    tools: T,
    summary: RunSummary,
}

impl<T: Toolchain> ConversionDriver<T> {
    pub fn new(config: ConvertConfig, tools: T) -> Self {
        Self {
            config,
            tools,
            summary: RunSummary::default(),
        }
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    pub fn tools(&self) -> &T {
        &self.tools
    }

    pub fn into_tools(self) -> T {
        self.tools
    }

    /// Run both passes and return what happened.
    pub fn run(&mut self) -> Result<RunSummary, ConvertError> {
        if !self.config.source_dir.is_dir() {
            return Err(ConvertError::Validation(format!(
                "source directory {} does not exist",
                self.config.source_dir.display()
            )));
        }

        self.summary = RunSummary::default();
        self.convert_tree()?;
        self.summary.manifests = manifest::write_manifests(&self.config.out_dir)?;
        Ok(self.summary.clone())
    }

    /// Pass 1: convert every file under the source root.
    pub fn convert_tree(&mut self) -> Result<(), ConvertError> {
        let source_root = self.config.source_dir.clone();
        for entry in WalkDir::new(&source_root) {
            let entry = entry?;
            if entry.file_type().is_dir() {
                self.convert_dir(entry.path())?;
            }
        }
        Ok(())
    }

    fn convert_dir(&mut self, dir: &Path) -> Result<(), ConvertError> {
        let rel = dir.strip_prefix(&self.config.source_dir).map_err(|_| {
            ConvertError::Validation(format!("{} is outside the source tree", dir.display()))
        })?;
        let out_dir = self.config.out_dir.join(rel);
        fs::create_dir_all(&out_dir)?;

        let ctx = DirContext::for_relative_dir(rel);
        let registry = if ctx.is_fonts {
            log::info!("found fonts dir {}", dir.display());
            FontScaleRegistry::scan(dir)?
        } else {
            FontScaleRegistry::empty()
        };

        for item in fs::read_dir(dir)? {
            let source = item?.path();
            if !source.is_file() {
                continue;
            }
            let Some(name) = source.file_name().and_then(|n| n.to_str()).map(str::to_owned) else {
                log::warn!("skipping non-UTF-8 file name {}", source.display());
                continue;
            };

            let outcome = self.convert_file(&source, &name, &out_dir, &ctx, &registry)?;
            match outcome {
                Outcome::Skipped(reason) => {
                    log::debug!("skipped {} ({reason:?})", source.display());
                    self.summary.skipped += 1;
                }
                Outcome::Converted => self.summary.converted += 1,
                Outcome::Copied => self.summary.copied += 1,
                Outcome::Failed => self.summary.failed += 1,
            }
        }

        Ok(())
    }

    /// Convert a single file from `source` into `out_dir`.
    pub fn convert_file(
        &mut self,
        source: &Path,
        name: &str,
        out_dir: &Path,
        ctx: &DirContext,
        registry: &FontScaleRegistry,
    ) -> Result<Outcome, ConvertError> {
        let dest = out_dir.join(name);

        if !self.config.force_redo && !ctx.is_fonts && already_converted(name, &dest, out_dir) {
            return Ok(Outcome::Skipped(SkipReason::AlreadyConverted));
        }

        let source_dir = source.parent().unwrap_or(Path::new(""));
        let kind = match classify(name, ctx, |sibling| source_dir.join(sibling).is_file()) {
            Disposition::Skip(reason) => return Ok(Outcome::Skipped(reason)),
            Disposition::Convert(kind) => kind,
        };

        log::info!("{} [{kind}]", source.display());

        match kind {
            AssetKind::RasterImage { with_alpha } => {
                let scale = if ctx.is_fonts {
                    registry.scale_for(name)
                } else {
                    Scale::Half
                };
                self.convert_image(source, name, out_dir, with_alpha, scale)
            }
            AssetKind::FontIndex => {
                copy_rewriting(source, &dest, b".png", b".t3x")?;
                Ok(Outcome::Copied)
            }
            AssetKind::SoundConfig => {
                copy_rewriting(source, &dest, b".ogg\"", b".ogg.wav\"")?;
                Ok(Outcome::Copied)
            }
            AssetKind::SoundEffect => self.transcode(source, &append_ext(&dest, "wav"), false),
            AssetKind::MusicTrack => {
                let stream = append_ext(&dest, "ogg");
                let outcome = self.transcode(source, &stream, true)?;
                if outcome == Outcome::Converted {
                    fs::rename(&stream, &dest)?;
                }
                Ok(outcome)
            }
            AssetKind::OpaqueCopy => {
                fs::copy(source, &dest)?;
                Ok(Outcome::Copied)
            }
        }
    }

    /// Rasterize, split if needed, record sizes and pack.
    fn convert_image(
        &mut self,
        source: &Path,
        name: &str,
        out_dir: &Path,
        with_alpha: bool,
        scale: Scale,
    ) -> Result<Outcome, ConvertError> {
        let bitmap = out_dir.join(with_extension(name, "bmp"));
        let packed_name = with_extension(name, PACKED_EXT);

        let mask = if with_alpha {
            let candidates = mask_candidates(source, &self.config.graphics_dir());
            resolve_mask(source, &candidates, |p| p.is_file(), &mut self.tools)?
        } else {
            None
        };

        let raster = match mask {
            Some(mask) => {
                log::debug!("mask {} ({:?})", mask.path.display(), mask.source);
                Operation::CompositeMask {
                    base: source.to_path_buf(),
                    mask: mask.path,
                    mode: mask.mode,
                    scale,
                    output: bitmap.clone(),
                }
            }
            None => Operation::Resample {
                input: source.to_path_buf(),
                output: bitmap.clone(),
                scale,
            },
        };

        let output = self.tools.execute(&raster)?;
        if !output.success() {
            log::warn!(
                "{} of {} failed ({:?}): {}",
                raster.label(),
                source.display(),
                output.code,
                output.stderr.trim()
            );
            remove_if_exists(&bitmap)?;
            return Ok(Outcome::Failed);
        }

        let size = probe_size(&mut self.tools, &bitmap)?;
        let plan = TilePlan::for_size(size);
        if plan.is_tiled() && !split_bitmap(&mut self.tools, &bitmap, &plan)? {
            remove_if_exists(&bitmap)?;
            return Ok(Outcome::Failed);
        }

        let mut outcome = Outcome::Converted;
        for band in &plan.bands {
            let unit = out_dir.join(unit_name(&packed_name, band.index));
            write_size_record(&unit, band.record)?;

            let band_bitmap = band_bitmap(&bitmap, band.index);
            let preview = self
                .config
                .keep_preview
                .then(|| append_ext(&unit, "bmp"));
            let output = self.tools.execute(&Operation::Pack {
                bitmap: band_bitmap.clone(),
                output: unit.clone(),
                preview,
            })?;

            if !output.success() {
                log::warn!(
                    "It didn't work and {} is missing. (Size: {})",
                    unit.display(),
                    plan.size
                );
                remove_if_exists(&unit)?;
                outcome = Outcome::Failed;
            }

            if !self.config.keep_preview {
                remove_if_exists(&band_bitmap)?;
            }
        }

        Ok(outcome)
    }

    fn transcode(
        &mut self,
        input: &Path,
        output_path: &Path,
        best_quality: bool,
    ) -> Result<Outcome, ConvertError> {
        let output = self.tools.execute(&Operation::Transcode {
            input: input.to_path_buf(),
            output: output_path.to_path_buf(),
            best_quality,
        })?;

        if output.success() {
            Ok(Outcome::Converted)
        } else {
            log::warn!(
                "transcoding {} failed ({:?}): {}",
                input.display(),
                output.code,
                output.stderr.trim()
            );
            remove_if_exists(output_path)?;
            Ok(Outcome::Failed)
        }
    }
}

/// Whether any final form of `name` already exists in `out_dir`.
fn already_converted(name: &str, dest: &Path, out_dir: &Path) -> bool {
    if dest.is_file() || append_ext(dest, "wav").is_file() {
        return true;
    }
    let is_image = name.ends_with(".gif") || name.ends_with(".png");
    is_image && out_dir.join(with_extension(name, PACKED_EXT)).is_file()
}

/// `path` with `.ext` appended to the full file name (`a.ogg` → `a.ogg.wav`).
fn append_ext(path: &Path, ext: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// Write the size side-file for the packed unit at `unit`.
fn write_size_record(unit: &Path, record: SizeRecord) -> Result<(), ConvertError> {
    if !record.fits_runtime_layout() {
        log::warn!(
            "{} is {record}, wider than the runtime's 4-column size reader",
            unit.display()
        );
    }
    let mut side_file = unit.as_os_str().to_os_string();
    side_file.push(SIZE_SUFFIX);
    fs::write(PathBuf::from(side_file), record.to_side_file())?;
    Ok(())
}

/// Copy `source` to `dest`, replacing every `from` with `to`.
fn copy_rewriting(source: &Path, dest: &Path, from: &[u8], to: &[u8]) -> Result<(), ConvertError> {
    let contents = fs::read(source)?;
    fs::write(dest, replace_all(&contents, from, to))?;
    Ok(())
}

/// Byte-level replace; descriptors are not guaranteed to be UTF-8.
fn replace_all(haystack: &[u8], from: &[u8], to: &[u8]) -> Vec<u8> {
    if from.is_empty() {
        return haystack.to_vec();
    }
    let mut out = Vec::with_capacity(haystack.len());
    let mut rest = haystack;
    while !rest.is_empty() {
        if rest.starts_with(from) {
            out.extend_from_slice(to);
            rest = &rest[from.len()..];
        } else {
            out.push(rest[0]);
            rest = &rest[1..];
        }
    }
    out
}

fn remove_if_exists(path: &Path) -> Result<(), ConvertError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_all() {
        assert_eq!(
            replace_all(b"texture=\"a.png\" ; b.png", b".png", b".t3x"),
            b"texture=\"a.t3x\" ; b.t3x".to_vec()
        );
        assert_eq!(
            replace_all(b"sfx=\"coin.ogg\"\nmusic=x.ogg", b".ogg\"", b".ogg.wav\""),
            b"sfx=\"coin.ogg.wav\"\nmusic=x.ogg".to_vec()
        );
        assert_eq!(replace_all(b"\xff.png\xfe", b".png", b".t3x"), b"\xff.t3x\xfe".to_vec());
        assert_eq!(replace_all(b"abc", b"", b"x"), b"abc".to_vec());
    }

    #[test]
    fn test_append_ext() {
        assert_eq!(append_ext(Path::new("o/coin.ogg"), "wav"), Path::new("o/coin.ogg.wav"));
    }

    #[test]
    fn test_already_converted() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path();

        assert!(!already_converted("npc-1.gif", &out.join("npc-1.gif"), out));
        fs::write(out.join("npc-1.t3x"), "").unwrap();
        assert!(already_converted("npc-1.gif", &out.join("npc-1.gif"), out));

        // Only image sources count a packed unit as their output.
        fs::write(out.join("level.t3x"), "").unwrap();
        assert!(!already_converted("level.lvl", &out.join("level.lvl"), out));

        fs::write(out.join("coin.ogg.wav"), "").unwrap();
        assert!(already_converted("coin.ogg", &out.join("coin.ogg"), out));
    }

    #[test]
    fn test_write_size_record() {
        let dir = tempfile::tempdir().unwrap();
        let unit = dir.path().join("npc-1.t3x1");
        write_size_record(&unit, SizeRecord::new(64, 128)).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("npc-1.t3x1.size")).unwrap(),
            "  64\n 128\n"
        );
    }

    #[test]
    fn test_remove_if_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.bmp");
        remove_if_exists(&path).unwrap();
        fs::write(&path, "").unwrap();
        remove_if_exists(&path).unwrap();
        assert!(!path.exists());
    }
}
