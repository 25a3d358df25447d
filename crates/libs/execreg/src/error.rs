//! Registry error types.

use std::io;

/// Process registry errors.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Wiring the child's streams or starting it failed.
    #[error("Failed to launch process: {0}")]
    Launch(io::Error),

    /// No process is registered under this identifier.
    #[error("Process '{0}' does not exist")]
    NotFound(u64),

    /// The process scope expired before data arrived.
    #[error("Timed out waiting for process output")]
    Timeout,

    /// The stream is closed and fully drained.
    #[error("End of stream")]
    Eof,

    /// Reading from a stream failed.
    #[error("Failed to read process output: {0}")]
    Read(io::Error),

    /// The termination request failed.
    #[error("Failed to kill process: {0}")]
    Kill(io::Error),

    /// Writing to the child's stdin failed.
    #[error("Failed to write to process stdin: {0}")]
    Stdin(io::Error),

    /// Every identifier has been handed out.
    #[error("No process identifiers left")]
    IdsExhausted,

    /// The registry configuration is invalid.
    #[error(transparent)]
    Config(#[from] execreg_config::error::Error),

    /// The child's stdin has already been closed.
    #[error("Process stdin is closed")]
    StdinClosed,
}

impl From<execreg_io::error::Error> for Error {
    fn from(value: execreg_io::error::Error) -> Self {
        match value {
            execreg_io::error::Error::Timeout => Self::Timeout,
            execreg_io::error::Error::Eof => Self::Eof,
            execreg_io::error::Error::IO(err) => Self::Read(err),
        }
    }
}
