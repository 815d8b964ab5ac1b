//! Splitting of textures taller than the console's single-texture limit.
//!
//! Dimensions here are destination (doubled) pixels unless a name says
//! `rows`, which counts rows of the intermediate bitmap.

use crate::error::ConvertError;
use crate::tools::{Operation, Toolchain};
use crate::types::SizeRecord;
use std::fs;
use std::path::{Path, PathBuf};

/// Tallest texture that is packed as a single unit.
pub const SINGLE_TEXTURE_MAX_HEIGHT: u32 = 2048;

/// Bitmap rows per band.
pub const BAND_ROWS: u32 = 1024;

/// Height of one full band in destination pixels.
pub const BAND_HEIGHT: u32 = BAND_ROWS * 2;

/// Bands a split texture may have. Anything taller is not subdivided further.
pub const MAX_BANDS: usize = 3;

/// One packed unit of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    /// 0 for the un-suffixed unit, then 1, 2.
    pub index: usize,
    /// Dimensions of the pixels in this band.
    pub size: SizeRecord,
    /// Record written to the unit's side-file. The un-suffixed unit records
    /// the whole texture so the runtime sees the full dimensions.
    pub record: SizeRecord,
}

/// How one rasterized texture is cut into packed units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilePlan {
    pub size: SizeRecord,
    pub bands: Vec<Band>,
}

impl TilePlan {
    pub fn for_size(size: SizeRecord) -> Self {
        let whole = Band {
            index: 0,
            size,
            record: size,
        };

        if size.height <= SINGLE_TEXTURE_MAX_HEIGHT {
            return Self {
                size,
                bands: vec![whole],
            };
        }

        let mut bands = Vec::with_capacity(MAX_BANDS);
        let mut remaining = size.height;
        for index in 0..MAX_BANDS {
            if remaining == 0 {
                break;
            }
            let height = remaining.min(BAND_HEIGHT);
            let band_size = SizeRecord::new(size.width, height);
            bands.push(Band {
                index,
                size: band_size,
                record: if index == 0 { size } else { band_size },
            });
            remaining -= height;
        }

        if remaining > 0 {
            log::warn!(
                "texture of {size} exceeds {MAX_BANDS} bands; bottom {remaining} pixels are dropped"
            );
        }

        Self { size, bands }
    }

    pub fn is_tiled(&self) -> bool {
        self.bands.len() > 1
    }
}

/// Unit name for a band: `foo.t3x`, `foo.t3x1`, `foo.t3x2`.
pub fn unit_name(packed_name: &str, index: usize) -> String {
    if index == 0 {
        packed_name.to_string()
    } else {
        format!("{packed_name}{index}")
    }
}

/// File the crop step writes band `index` of `bitmap` to (`foo.bmp1.bmp`).
pub fn crop_output(bitmap: &Path, index: usize) -> PathBuf {
    let mut name = bitmap.as_os_str().to_os_string();
    name.push(format!("{index}.bmp"));
    PathBuf::from(name)
}

/// Bitmap holding band `index` once [`split_bitmap`] has run.
pub fn band_bitmap(bitmap: &Path, index: usize) -> PathBuf {
    if index == 0 {
        bitmap.to_path_buf()
    } else {
        crop_output(bitmap, index)
    }
}

/// Cut `bitmap` into the bands of `plan`.
///
/// Band 0 takes over the full bitmap's path. Returns `false` when the
/// crop tool failed, leaving the full bitmap in place and no band files.
pub fn split_bitmap<T: Toolchain + ?Sized>(
    tools: &mut T,
    bitmap: &Path,
    plan: &TilePlan,
) -> Result<bool, ConvertError> {
    let output = tools.execute(&Operation::CropBands {
        bitmap: bitmap.to_path_buf(),
        width: plan.size.width / 2,
        band_height: BAND_ROWS,
    })?;
    if !output.success() {
        log::warn!(
            "cropping {} into bands failed ({:?}): {}",
            bitmap.display(),
            output.code,
            output.stderr.trim()
        );
        for index in 0..plan.bands.len() {
            let partial = crop_output(bitmap, index);
            if partial.exists() {
                fs::remove_file(&partial)?;
            }
        }
        return Ok(false);
    }

    fs::remove_file(bitmap)?;
    fs::rename(crop_output(bitmap, 0), bitmap)?;

    // Bands beyond the plan only appear for textures taller than MAX_BANDS allows.
    let mut extra = plan.bands.len();
    loop {
        let leftover = crop_output(bitmap, extra);
        if !leftover.exists() {
            break;
        }
        fs::remove_file(&leftover)?;
        extra += 1;
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolOutput;

    fn heights(plan: &TilePlan) -> Vec<u32> {
        plan.bands.iter().map(|b| b.size.height).collect()
    }

    #[test]
    fn test_short_texture_single_unit() {
        for h in [2, 1024, 2048] {
            let plan = TilePlan::for_size(SizeRecord::new(64, h));
            assert_eq!(plan.bands.len(), 1, "{h}");
            assert!(!plan.is_tiled());
            assert_eq!(plan.bands[0].record, SizeRecord::new(64, h));
        }
    }

    #[test]
    fn test_two_bands() {
        for h in [2050, 3000, 4096] {
            let plan = TilePlan::for_size(SizeRecord::new(640, h));
            assert_eq!(plan.bands.len(), 2, "{h}");
            assert_eq!(heights(&plan), [2048, h - 2048]);
        }
    }

    #[test]
    fn test_three_bands() {
        for h in [4098, 5000, 6144] {
            let plan = TilePlan::for_size(SizeRecord::new(640, h));
            assert_eq!(plan.bands.len(), 3, "{h}");
            assert_eq!(heights(&plan), [2048, 2048, h - 4096]);
        }
    }

    #[test]
    fn test_never_more_than_three() {
        let plan = TilePlan::for_size(SizeRecord::new(640, 9000));
        assert_eq!(plan.bands.len(), 3);
        assert_eq!(heights(&plan), [2048, 2048, 2048]);
    }

    #[test]
    fn test_records() {
        let plan = TilePlan::for_size(SizeRecord::new(640, 5000));
        let records: Vec<_> = plan.bands.iter().map(|b| b.record).collect();
        assert_eq!(
            records,
            [
                SizeRecord::new(640, 5000),
                SizeRecord::new(640, 2048),
                SizeRecord::new(640, 904),
            ]
        );
    }

    #[test]
    fn test_names() {
        assert_eq!(unit_name("bg-1.t3x", 0), "bg-1.t3x");
        assert_eq!(unit_name("bg-1.t3x", 2), "bg-1.t3x2");
        assert_eq!(crop_output(Path::new("o/bg-1.bmp"), 0), Path::new("o/bg-1.bmp0.bmp"));
        assert_eq!(band_bitmap(Path::new("o/bg-1.bmp"), 0), Path::new("o/bg-1.bmp"));
        assert_eq!(band_bitmap(Path::new("o/bg-1.bmp"), 1), Path::new("o/bg-1.bmp1.bmp"));
    }

    /// Crop tool that writes `count` band files.
    struct Cropper {
        count: usize,
    }

    impl Toolchain for Cropper {
        fn execute(&mut self, op: &Operation) -> Result<ToolOutput, ConvertError> {
            let Operation::CropBands { bitmap, .. } = op else {
                panic!("unexpected operation {op:?}");
            };
            for i in 0..self.count {
                fs::write(crop_output(bitmap, i), format!("band{i}"))?;
            }
            Ok(ToolOutput::success_with(""))
        }
    }

    #[test]
    fn test_split_moves_first_band_and_drops_extra() {
        let dir = tempfile::tempdir().unwrap();
        let bitmap = dir.path().join("bg-1.bmp");
        fs::write(&bitmap, "whole").unwrap();

        let plan = TilePlan::for_size(SizeRecord::new(64, 9000));
        let mut tools = Cropper { count: 5 };
        assert!(split_bitmap(&mut tools, &bitmap, &plan).unwrap());

        assert_eq!(fs::read_to_string(&bitmap).unwrap(), "band0");
        assert!(band_bitmap(&bitmap, 1).exists());
        assert!(band_bitmap(&bitmap, 2).exists());
        assert!(!crop_output(&bitmap, 0).exists());
        assert!(!crop_output(&bitmap, 3).exists());
        assert!(!crop_output(&bitmap, 4).exists());
    }

    /// Crop tool that writes the first band, then fails.
    struct FailingCrop;

    impl Toolchain for FailingCrop {
        fn execute(&mut self, op: &Operation) -> Result<ToolOutput, ConvertError> {
            if let Operation::CropBands { bitmap, .. } = op {
                fs::write(crop_output(bitmap, 0), "partial")?;
            }
            Ok(ToolOutput::failure(1, "no memory"))
        }
    }

    #[test]
    fn test_split_failure_keeps_bitmap() {
        let dir = tempfile::tempdir().unwrap();
        let bitmap = dir.path().join("bg-1.bmp");
        fs::write(&bitmap, "whole").unwrap();

        let plan = TilePlan::for_size(SizeRecord::new(64, 3000));
        assert!(!split_bitmap(&mut FailingCrop, &bitmap, &plan).unwrap());
        assert_eq!(fs::read_to_string(&bitmap).unwrap(), "whole");
        assert!(!crop_output(&bitmap, 0).exists());
        assert!(!crop_output(&bitmap, 1).exists());
    }
}
