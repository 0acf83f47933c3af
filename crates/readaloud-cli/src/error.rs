//! CLI-specific error types and exit codes.

use readaloud_core::ReaderError;
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Reader domain error.
    #[error("{0}")]
    Reader(#[from] ReaderError),

    /// Argument validation error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// Reading the input file failed.
    #[error("IO error: {0}")]
    Io(String),
}

impl CliError {
    /// Map error to an exit code.
    ///
    /// - 1: reader error
    /// - 2: invalid arguments (`EX_USAGE`)
    /// - 66: input file missing or unreadable (`EX_NOINPUT`)
    /// - 69: speech unavailable (`EX_UNAVAILABLE`)
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Reader(err) if err.is_environmental() => 69,
            Self::Reader(_) => 1,
            Self::Arguments(_) => 2,
            Self::Io(_) => 66,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(CliError::Arguments("x".into()).exit_code(), 2);
        assert_eq!(CliError::Io("gone".into()).exit_code(), 66);
        assert_eq!(CliError::from(ReaderError::NoContentFound).exit_code(), 1);
        assert_eq!(
            CliError::from(ReaderError::VoiceNotAvailable).exit_code(),
            69
        );
    }
}
