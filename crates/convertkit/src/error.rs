use std::path::PathBuf;

/// Errors that abort a conversion run.
///
/// Failures of individual external tool invocations are not represented
/// here: a non-zero exit is reported through [`crate::tools::ToolOutput`]
/// and only marks the affected asset as failed.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// I/O error reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory traversal failed.
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// An external program could not be started at all.
    #[error("Failed to launch {program}: {source}")]
    ToolLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The dimension probe printed something other than `W,H`.
    #[error("Malformed dimension probe output for {path}: {output:?}")]
    ProbeParse { path: PathBuf, output: String },

    /// The built-in probe could not read an image header.
    #[error("Image decode error for {path}: {message}")]
    ImageDecode { path: PathBuf, message: String },

    /// A load list does not satisfy the runtime's reader.
    #[error("Load list {path} line {line}: {message}")]
    Manifest {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Input validation failed (missing directories, bad arguments).
    #[error("Validation error: {0}")]
    Validation(String),
}
