//! Per-file conversion decisions.
//!
//! [`classify`] is total and side-effect free: every file name maps to
//! exactly one [`Disposition`], with verbatim copy as the fallback. The only
//! outside information it needs is whether a sibling file exists, which the
//! caller supplies as a closure.

use crate::types::AssetKind;
use std::path::{Component, Path};

/// Directory facts that influence classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirContext {
    /// The directory is named `fonts`; its `.ini` files are font descriptors.
    pub is_fonts: bool,
    /// A `sound` directory appears somewhere on the path.
    pub under_sound: bool,
}

impl DirContext {
    /// Context for a directory given relative to the source root.
    pub fn for_relative_dir(rel: &Path) -> Self {
        let names: Vec<&str> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => name.to_str(),
                _ => None,
            })
            .collect();

        Self {
            is_fonts: names.last().is_some_and(|last| *last == "fonts"),
            under_sound: names.contains(&"sound"),
        }
    }
}

/// Why an entry produced no output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// `…m.gif` mask consumed by its base image's conversion.
    MaskImage,
    /// Metadata junk (`Thumbs.db` and friends).
    Junk,
    /// An output form already exists and force-redo is off.
    AlreadyConverted,
}

/// Outcome of classifying one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Skip(SkipReason),
    Convert(AssetKind),
}

/// Decide what happens to `file_name` inside a directory described by `ctx`.
///
/// `sibling_exists` answers whether another file name exists in the same
/// source directory.
pub fn classify(
    file_name: &str,
    ctx: &DirContext,
    sibling_exists: impl Fn(&str) -> bool,
) -> Disposition {
    if file_name.ends_with(".png") {
        return Disposition::Convert(AssetKind::RasterImage { with_alpha: false });
    }

    if let Some(prefix) = file_name.strip_suffix("m.gif") {
        if sibling_exists(&format!("{prefix}.gif")) {
            return Disposition::Skip(SkipReason::MaskImage);
        }
    }

    if file_name.ends_with(".gif") {
        return Disposition::Convert(AssetKind::RasterImage { with_alpha: true });
    }

    if file_name.ends_with(".db") {
        return Disposition::Skip(SkipReason::Junk);
    }

    if file_name.ends_with(".ogg") && ctx.under_sound {
        return Disposition::Convert(AssetKind::SoundEffect);
    }

    if ctx.is_fonts && file_name.ends_with(".ini") {
        return Disposition::Convert(AssetKind::FontIndex);
    }

    if file_name == "sounds.ini" {
        return Disposition::Convert(AssetKind::SoundConfig);
    }

    if file_name.ends_with(".mp3") {
        return Disposition::Convert(AssetKind::MusicTrack);
    }

    Disposition::Convert(AssetKind::OpaqueCopy)
}
