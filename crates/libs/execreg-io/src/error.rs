//! Stream read error types.

/// Errors returned by a bounded read.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The cancellation scope expired before any data arrived.
    #[error("Timed out waiting for data")]
    Timeout,

    /// The stream is closed and fully drained.
    #[error("End of stream")]
    Eof,

    /// I/O operation failed.
    #[error(transparent)]
    IO(#[from] std::io::Error),
}
