//! Native-resolution font textures.
//!
//! A `fonts` directory's descriptors are scanned before any of its images is
//! converted. The resulting registry lives for that one directory only.

use crate::error::ConvertError;
use crate::types::Scale;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Texture names inside one `fonts` directory that must not be downscaled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FontScaleRegistry {
    native: HashSet<String>,
}

impl FontScaleRegistry {
    /// Empty registry: every texture downscales.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse every `*.ini` directly inside `dir`.
    pub fn scan(dir: &Path) -> Result<Self, ConvertError> {
        let mut registry = Self::empty();

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_ini = path.is_file() && path.extension().is_some_and(|ext| ext == "ini");
            if !is_ini {
                continue;
            }
            // Descriptors are not guaranteed to be UTF-8; keys and texture names are ASCII.
            let bytes = fs::read(&path)?;
            let text = String::from_utf8_lossy(&bytes);
            if let Some(texture) = native_texture(strip_bom(&text)) {
                log::info!("{texture} is 1x ({})", path.display());
                registry.native.insert(texture);
            }
        }

        Ok(registry)
    }

    pub fn insert(&mut self, texture: impl Into<String>) {
        self.native.insert(texture.into());
    }

    pub fn is_native(&self, file_name: &str) -> bool {
        self.native.contains(file_name)
    }

    pub fn scale_for(&self, file_name: &str) -> Scale {
        if self.is_native(file_name) {
            Scale::Native
        } else {
            Scale::Half
        }
    }

    pub fn len(&self) -> usize {
        self.native.len()
    }

    pub fn is_empty(&self) -> bool {
        self.native.is_empty()
    }
}

/// Texture named by a descriptor whose `texture-scale` is not `1`.
fn native_texture(descriptor: &str) -> Option<String> {
    let sections = parse_ini(descriptor);
    let font_map = sections.get("font-map")?;

    let scale = font_map.get("texture-scale")?;
    if scale == "1" {
        return None;
    }

    let texture = font_map.get("texture")?.trim().trim_matches('"');
    Some(texture.to_string())
}

fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{FEFF}').unwrap_or(text)
}

/// Minimal INI reader: lowercase section and key names, trimmed values,
/// `;`/`#` full-line comments and `;` inline comments.
fn parse_ini(text: &str) -> HashMap<String, HashMap<String, String>> {
    let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut section = String::new();

    for raw in text.lines() {
        let line = raw.strip_suffix('\r').unwrap_or(raw).trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            section = name.trim().to_ascii_lowercase();
            continue;
        }

        let Some(split) = line.find(|c: char| c == '=' || c == ':') else {
            continue;
        };
        let key = line[..split].trim().to_ascii_lowercase();
        let mut value = &line[split + 1..];
        if let Some(comment) = value.find(';') {
            value = &value[..comment];
        }

        sections
            .entry(section.clone())
            .or_default()
            .insert(key, value.trim().to_string());
    }

    sections
}
