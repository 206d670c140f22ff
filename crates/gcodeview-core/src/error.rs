//! Error types for program loading.

use thiserror::Error;

/// Errors raised while reading or assembling a G-code program.
#[derive(Error, Debug)]
pub enum ProgramError {
    /// The file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input contained no motion commands at all.
    #[error("program contains no motion commands")]
    NoMotion,
}

/// Result type using [`ProgramError`].
pub type Result<T> = std::result::Result<T, ProgramError>;
