/// Error types for asset conversion.
pub mod error;

/// Core type definitions: configuration, asset kinds, size records.
pub mod types;

/// Asset naming conventions (families, display names, unit names).
pub mod identifier;

/// Per-file classification.
pub mod classify;

/// Native-resolution font texture registry.
pub mod fonts;

/// Alpha mask lookup for GIF sprites.
pub mod mask;

/// Splitting of oversized textures.
pub mod tiler;

/// Typed external tool invocations.
pub mod tools;

/// Load list generation and checking.
pub mod manifest;

/// Two-pass tree conversion.
pub mod driver;

pub use driver::{ConversionDriver, Outcome};
pub use error::ConvertError;
pub use tools::{ExternalTools, Operation, ToolOutput, Toolchain};
pub use types::{AssetKind, ConvertConfig, ManifestEntry, RunSummary, SizeRecord, ToolPaths};

/// Convert `config.source_dir` into `config.out_dir` with the real tools.
///
/// Runs the conversion pass followed by the load list pass.
pub fn convert_tree(config: &ConvertConfig) -> Result<RunSummary, ConvertError> {
    let tools = ExternalTools::new(config.tools.clone(), config.builtin_probe);
    ConversionDriver::new(config.clone(), tools).run()
}
