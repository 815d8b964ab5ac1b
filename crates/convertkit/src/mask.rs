//! Alpha masks for GIF sprites.
//!
//! GIF sprites carry no alpha; a companion image supplies it. Three places
//! are tried in order and the first usable one wins:
//!
//! 1. `<stem>m.gif` next to the sprite,
//! 2. `graphics/<family>/<stem>m.gif`,
//! 3. `graphics/<family>/<stem>.png`.
//!
//! The shared-directory candidates are only used when their doubled
//! dimensions match the sprite's exactly.

use crate::error::ConvertError;
use crate::identifier::{asset_family, stem};
use crate::tools::{probe_size, MaskMode, Toolchain};
use crate::types::SizeRecord;
use std::path::{Path, PathBuf};

/// Where a candidate was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    Sibling,
    FamilyGif,
    FamilyPng,
}

/// One place a sprite's mask may live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskCandidate {
    pub path: PathBuf,
    pub source: CandidateSource,
    pub mode: MaskMode,
    pub require_same_size: bool,
}

/// Candidate masks for the sprite at `base`, in priority order.
pub fn mask_candidates(base: &Path, graphics_dir: &Path) -> Vec<MaskCandidate> {
    let Some(file_name) = base.file_name().and_then(|n| n.to_str()) else {
        return Vec::new();
    };
    let stem = stem(file_name);
    let mask_name = format!("{stem}m.gif");

    let sibling = base.with_file_name(&mask_name);
    let mut candidates = vec![MaskCandidate {
        path: sibling.clone(),
        source: CandidateSource::Sibling,
        mode: MaskMode::InvertedOpacity,
        require_same_size: false,
    }];

    if let Some(family) = asset_family(file_name) {
        let family_dir = graphics_dir.join(family);
        let family_gif = family_dir.join(&mask_name);
        if family_gif != sibling {
            candidates.push(MaskCandidate {
                path: family_gif,
                source: CandidateSource::FamilyGif,
                mode: MaskMode::InvertedOpacity,
                require_same_size: true,
            });
        }
        candidates.push(MaskCandidate {
            path: family_dir.join(format!("{stem}.png")),
            source: CandidateSource::FamilyPng,
            mode: MaskMode::DirectOpacity,
            require_same_size: true,
        });
    }

    candidates
}

/// Pick the first usable candidate, or `None` for a maskless conversion.
///
/// `exists` reports whether a candidate file is present; dimensions are
/// probed through `tools` only when a present candidate requires it, and
/// the sprite itself is probed at most once.
pub fn resolve_mask<T: Toolchain + ?Sized>(
    base: &Path,
    candidates: &[MaskCandidate],
    exists: impl Fn(&Path) -> bool,
    tools: &mut T,
) -> Result<Option<MaskCandidate>, ConvertError> {
    let mut base_size: Option<SizeRecord> = None;

    for candidate in candidates {
        if !exists(&candidate.path) {
            continue;
        }

        if candidate.require_same_size {
            let sprite = match base_size {
                Some(size) => size,
                None => {
                    let size = probe_size(tools, base)?;
                    base_size = Some(size);
                    size
                }
            };
            let mask = probe_size(tools, &candidate.path)?;
            if mask != sprite {
                log::debug!(
                    "mask {} is {mask}, sprite {} is {sprite}; trying next",
                    candidate.path.display(),
                    base.display()
                );
                continue;
            }
        }

        return Ok(Some(candidate.clone()));
    }

    Ok(None)
}
