//! `graphics.list` load lists.
//!
//! After conversion every directory holding listed size side-files gets a
//! load list naming each texture, its unit path and its dimensions, so the
//! runtime can register textures without opening them. The top-level
//! `graphics` directory instead lists the textures of its subdirectories.

use crate::error::ConvertError;
use crate::identifier::{is_tile_unit, listed_display_name};
use crate::types::{ManifestEntry, SizeRecord, MANIFEST_NAME, SIZE_SUFFIX};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory whose load list aggregates its subdirectories.
pub const AGGREGATE_DIR: &str = "graphics";

/// Subdirectories of `graphics` the runtime never loads from a list.
pub const EXCLUDED_SUBDIRS: [&str; 2] = ["touchscreen", "ui"];

/// Longest unit path the runtime reader accepts (its buffer is 256 bytes).
pub const MAX_PATH_LEN: usize = 254;

/// Largest dimension the runtime accepts from a load list.
pub const MAX_DIMENSION: i64 = 8192;

/// Manifest entry for a size side-file, or `None` if it is not listed.
///
/// `prefix` is the subdirectory name when aggregating into `graphics`.
pub fn entry_for(
    side_file_name: &str,
    prefix: Option<&str>,
    size_text: String,
) -> Option<ManifestEntry> {
    let unit = side_file_name.strip_suffix(SIZE_SUFFIX)?;
    if is_tile_unit(unit) {
        return None;
    }
    let display_name = listed_display_name(side_file_name)?;
    let asset_path = match prefix {
        Some(prefix) => format!("{prefix}/{unit}"),
        None => unit.to_string(),
    };
    Some(ManifestEntry {
        display_name,
        asset_path,
        size_text,
    })
}

/// Entries for size side-files directly inside `dir`, in listing order.
fn collect_entries(dir: &Path, prefix: Option<&str>) -> Result<Vec<ManifestEntry>, ConvertError> {
    let mut entries = Vec::new();

    for item in fs::read_dir(dir)? {
        let item = item?;
        if !item.file_type()?.is_file() {
            continue;
        }
        let file_name = item.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        // Check the name before touching the file.
        if entry_for(name, prefix, String::new()).is_none() {
            continue;
        }
        let size_text = fs::read_to_string(item.path())?;
        if let Some(entry) = entry_for(name, prefix, size_text) {
            entries.push(entry);
        }
    }

    Ok(entries)
}

/// Entries the load list of `dir` should contain.
pub fn entries_for_dir(dir: &Path) -> Result<Vec<ManifestEntry>, ConvertError> {
    let is_aggregate = dir.file_name().is_some_and(|n| n == AGGREGATE_DIR);
    if !is_aggregate {
        return collect_entries(dir, None);
    }

    let mut entries = Vec::new();
    for item in fs::read_dir(dir)? {
        let item = item?;
        if !item.file_type()?.is_dir() {
            continue;
        }
        let file_name = item.file_name();
        let Some(sub) = file_name.to_str() else {
            continue;
        };
        if EXCLUDED_SUBDIRS.contains(&sub) {
            continue;
        }
        entries.extend(collect_entries(&item.path(), Some(sub))?);
    }
    Ok(entries)
}

/// Serialize entries in load-list format.
pub fn render_manifest(entries: &[ManifestEntry]) -> String {
    entries.iter().map(ManifestEntry::to_record).collect()
}

/// Write a load list into every eligible directory under `out_root`.
///
/// Returns the paths of the lists written. Directories without entries are
/// left untouched, including any `graphics.list` copied from the source tree.
pub fn write_manifests(out_root: &Path) -> Result<Vec<PathBuf>, ConvertError> {
    let mut written = Vec::new();

    for dir in WalkDir::new(out_root) {
        let dir = dir?;
        if !dir.file_type().is_dir() {
            continue;
        }

        let entries = entries_for_dir(dir.path())?;
        if entries.is_empty() {
            continue;
        }

        let list_path = dir.path().join(MANIFEST_NAME);
        log::info!("{} ({} entries)", list_path.display(), entries.len());
        fs::write(&list_path, render_manifest(&entries))?;
        written.push(list_path);
    }

    Ok(written)
}

/// Parse a load list with the same limits the runtime applies.
pub fn read_manifest(path: &Path, text: &str) -> Result<Vec<ManifestEntry>, ConvertError> {
    let error = |line: usize, message: String| ConvertError::Manifest {
        path: path.to_path_buf(),
        line,
        message,
    };

    let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l));
    let mut entries = Vec::new();

    loop {
        let Some((name_line, display_name)) = lines.find(|(_, l)| !l.trim().is_empty()) else {
            break;
        };

        let (path_line, asset_path) = lines
            .next()
            .ok_or_else(|| error(name_line, "record ends after the name".to_string()))?;
        if asset_path.is_empty() {
            return Err(error(path_line, "empty image path".to_string()));
        }
        if asset_path.len() > MAX_PATH_LEN {
            return Err(error(
                path_line,
                format!("image path longer than {MAX_PATH_LEN} bytes"),
            ));
        }

        let mut dimension = |what: &str| -> Result<i64, ConvertError> {
            let (line, text) = lines
                .next()
                .ok_or_else(|| error(path_line, format!("missing {what}")))?;
            let value: i64 = text
                .trim()
                .parse()
                .map_err(|_| error(line, format!("{what} {text:?} is not a number")))?;
            if !(0..=MAX_DIMENSION).contains(&value) {
                return Err(error(line, format!("{what} {value} outside 0..={MAX_DIMENSION}")));
            }
            Ok(value)
        };
        let width = dimension("width")?;
        let height = dimension("height")?;

        entries.push(ManifestEntry {
            display_name: display_name.to_string(),
            asset_path: asset_path.to_string(),
            size_text: SizeRecord::new(width as u32, height as u32).to_side_file(),
        });
    }

    Ok(entries)
}

/// Read back a written load list and check it against the runtime's limits.
pub fn verify_manifest(path: &Path) -> Result<Vec<ManifestEntry>, ConvertError> {
    let text = fs::read_to_string(path)?;
    read_manifest(path, &text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_entry_for_listed_file() {
        let entry = entry_for("block-red.png.size", Some("level1"), "  64\n  64\n".into()).unwrap();
        assert_eq!(entry.display_name, "block red");
        assert_eq!(entry.asset_path, "level1/block-red.png");
        assert_eq!(entry.size_text, "  64\n  64\n");

        let entry = entry_for("npc-5.t3x.size", None, String::new()).unwrap();
        assert_eq!(entry.asset_path, "npc-5.t3x");
    }

    #[test]
    fn test_entry_for_rejects() {
        assert!(entry_for("block-red.t3x", None, String::new()).is_none());
        assert!(entry_for("background.t3x.size", None, String::new()).is_none());
        assert!(entry_for("a-b-c.t3x.size", None, String::new()).is_none());
        assert!(entry_for("coin-1.t3x.size", None, String::new()).is_none());
        assert!(entry_for("block-1.t3x1.size", None, String::new()).is_none());
    }

    #[test]
    fn test_graphics_aggregates_subdirs() {
        let out = tempfile::tempdir().unwrap();
        let graphics = out.path().join("graphics");
        write(&graphics.join("level1/block-red.png.size"), "  64\n  64\n");
        write(&graphics.join("ui/block-ui.t3x.size"), "  16\n  16\n");
        write(&graphics.join("touchscreen/npc-1.t3x.size"), "  16\n  16\n");
        write(&graphics.join("npc-9.t3x.size"), "  16\n  16\n");

        let entries = entries_for_dir(&graphics).unwrap();
        assert_eq!(
            entries,
            [ManifestEntry {
                display_name: "block red".to_string(),
                asset_path: "level1/block-red.png".to_string(),
                size_text: "  64\n  64\n".to_string(),
            }]
        );
    }

    #[test]
    fn test_plain_dir_lists_own_files() {
        let out = tempfile::tempdir().unwrap();
        let world = out.path().join("worlds/w1");
        write(&world.join("npc-5.t3x.size"), "  32\n  64\n");
        write(&world.join("background.t3x.size"), "  32\n  64\n");
        write(&world.join("sub/npc-6.t3x.size"), "  32\n  64\n");

        let entries = entries_for_dir(&world).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].asset_path, "npc-5.t3x");
        assert_eq!(entries[0].display_name, "npc 5");
    }

    #[test]
    fn test_write_manifests() {
        let out = tempfile::tempdir().unwrap();
        write(&out.path().join("graphics/block/block-1.t3x.size"), "  64\n  64\n");
        write(&out.path().join("graphics/block/block-1.t3x1.size"), "  64\n 128\n");
        write(&out.path().join("graphics/ui/block-2.t3x.size"), "  64\n  64\n");
        write(&out.path().join("worlds/readme.txt"), "hello");
        write(&out.path().join("worlds/graphics.list"), "copied from source\n");

        let mut written = write_manifests(out.path()).unwrap();
        written.sort();
        assert_eq!(
            written,
            [
                out.path().join("graphics/block/graphics.list"),
                out.path().join("graphics/graphics.list"),
                out.path().join("graphics/ui/graphics.list"),
            ]
        );

        let top = fs::read_to_string(out.path().join("graphics/graphics.list")).unwrap();
        assert_eq!(top, "block 1\nblock/block-1.t3x\n  64\n  64\n\n");

        let sub = fs::read_to_string(out.path().join("graphics/block/graphics.list")).unwrap();
        assert_eq!(sub, "block 1\nblock-1.t3x\n  64\n  64\n\n");

        // `ui` is left out of the aggregate list but keeps a list of its own.
        assert!(!top.contains("block-2"));
        assert_eq!(
            fs::read_to_string(out.path().join("worlds/graphics.list")).unwrap(),
            "copied from source\n"
        );
    }

    #[test]
    fn test_read_manifest_round_trip() {
        let entries = vec![
            entry_for("block-1.t3x.size", Some("block"), "  64\n  64\n".into()).unwrap(),
            entry_for("npc-2.t3x.size", Some("npc"), "  32\n1280\n".into()).unwrap(),
        ];
        let text = render_manifest(&entries);
        assert_eq!(read_manifest(Path::new("graphics.list"), &text).unwrap(), entries);
    }

    #[test]
    fn test_read_manifest_limits() {
        let path = Path::new("graphics.list");

        let err = read_manifest(path, "npc 1\nnpc-1.t3x\n  64\n9000\n\n").unwrap_err();
        assert!(matches!(err, ConvertError::Manifest { line: 4, .. }));

        let err = read_manifest(path, "npc 1\nnpc-1.t3x\nwide\n  64\n").unwrap_err();
        assert!(matches!(err, ConvertError::Manifest { line: 3, .. }));

        let err = read_manifest(path, "npc 1\nnpc-1.t3x\n  64\n").unwrap_err();
        assert!(matches!(err, ConvertError::Manifest { .. }));

        let long = format!("npc 1\n{}\n  1\n  1\n", "x".repeat(300));
        let err = read_manifest(path, &long).unwrap_err();
        assert!(matches!(err, ConvertError::Manifest { line: 2, .. }));

        assert!(read_manifest(path, "").unwrap().is_empty());
    }
}
