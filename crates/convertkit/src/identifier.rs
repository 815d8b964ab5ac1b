use crate::types::PACKED_EXT;

/// Splits an asset family prefix from its qualifier (`block-red`).
pub const KIND_SEPARATOR: char = '-';

/// Asset families the runtime loads from `graphics.list`.
pub const LISTED_FAMILIES: [&str; 17] = [
    "background",
    "background2",
    "block",
    "effect",
    "level",
    "link",
    "luigi",
    "mario",
    "npc",
    "path",
    "peach",
    "player",
    "scene",
    "tile",
    "toad",
    "yoshib",
    "yoshit",
];

/// File name up to (not including) its first `.`.
pub fn base_name(file_name: &str) -> &str {
    match file_name.find('.') {
        Some(dot) => &file_name[..dot],
        None => file_name,
    }
}

/// File name without its final extension (`npc-1.gif` → `npc-1`).
pub fn stem(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => &file_name[..dot],
        _ => file_name,
    }
}

/// Same file name with the final extension swapped (`npc-1.gif` → `npc-1.bmp`).
pub fn with_extension(file_name: &str, ext: &str) -> String {
    format!("{}.{}", stem(file_name), ext)
}

/// Asset family directory a file belongs to: the name truncated at its last
/// kind-separator (`npc-12.gif` → `npc`).
pub fn asset_family(file_name: &str) -> Option<&str> {
    let cut = file_name.rfind(KIND_SEPARATOR)?;
    let family = &file_name[..cut];
    (!family.is_empty()).then_some(family)
}

/// Display name used in load lists, or `None` when the file is not listed.
///
/// The base name must contain exactly one kind-separator and its first
/// segment must be a listed family.
pub fn listed_display_name(file_name: &str) -> Option<String> {
    let base = base_name(file_name);
    let mut parts = base.split(KIND_SEPARATOR);
    let family = parts.next()?;
    let _qualifier = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    if !LISTED_FAMILIES.contains(&family) {
        return None;
    }
    Some(base.replace(KIND_SEPARATOR, " "))
}

/// Whether a unit name is an extra tile of a split texture (`foo.t3x1`).
pub fn is_tile_unit(unit_name: &str) -> bool {
    let Some(dot) = unit_name.rfind('.') else {
        return false;
    };
    let ext = &unit_name[dot + 1..];
    match ext.strip_prefix(PACKED_EXT) {
        Some(digits) => !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("block-red.t3x.size"), "block-red");
        assert_eq!(base_name("README"), "README");
    }

    #[test]
    fn test_with_extension() {
        assert_eq!(with_extension("npc-1.gif", "bmp"), "npc-1.bmp");
        assert_eq!(with_extension("font1.png", "t3x"), "font1.t3x");
    }

    #[test]
    fn test_asset_family() {
        assert_eq!(asset_family("npc-12.gif"), Some("npc"));
        assert_eq!(asset_family("yoshib-3.gif"), Some("yoshib"));
        assert_eq!(asset_family("a-b-c.gif"), Some("a-b"));
        assert_eq!(asset_family("background.gif"), None);
        assert_eq!(asset_family("-1.gif"), None);
    }

    #[test]
    fn test_listed_display_name() {
        assert_eq!(
            listed_display_name("block-red.t3x.size").as_deref(),
            Some("block red")
        );
        assert_eq!(
            listed_display_name("background2-7.t3x.size").as_deref(),
            Some("background2 7")
        );
    }

    #[test]
    fn test_separator_count_excludes() {
        assert_eq!(listed_display_name("background.t3x.size"), None);
        assert_eq!(listed_display_name("a-b-c.t3x.size"), None);
        assert_eq!(listed_display_name("block-red-2.t3x.size"), None);
    }

    #[test]
    fn test_unlisted_family_excluded() {
        assert_eq!(listed_display_name("hud-coin.t3x.size"), None);
        assert_eq!(listed_display_name("Block-red.t3x.size"), None);
    }

    #[test]
    fn test_tile_unit() {
        assert!(is_tile_unit("block-1.t3x1"));
        assert!(is_tile_unit("block-1.t3x2"));
        assert!(!is_tile_unit("block-1.t3x"));
        assert!(!is_tile_unit("block-1.png"));
        assert!(!is_tile_unit("block-1.t3xa"));
        assert!(!is_tile_unit("noext"));
    }
}
