//! Accumulated output of a process.

use std::io;

/// Why accumulating a stream stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The stream was closed and fully drained.
    Closed,
    /// The process scope expired first.
    TimedOut,
    /// Reading failed with an I/O error.
    Failed(io::ErrorKind),
}

impl From<&execreg_io::error::Error> for StreamEnd {
    fn from(value: &execreg_io::error::Error) -> Self {
        match value {
            execreg_io::error::Error::Eof => Self::Closed,
            execreg_io::error::Error::Timeout => Self::TimedOut,
            execreg_io::error::Error::IO(err) => Self::Failed(err.kind()),
        }
    }
}

/// Everything read from a process's stdout and stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOutput {
    /// Bytes read from stdout.
    pub stdout: Vec<u8>,
    /// Bytes read from stderr.
    pub stderr: Vec<u8>,
    /// Why reading stdout stopped.
    pub stdout_end: StreamEnd,
    /// Why reading stderr stopped.
    pub stderr_end: StreamEnd,
}

impl WaitOutput {
    /// Whether both streams were read to their end.
    pub fn is_complete(&self) -> bool {
        self.stdout_end == StreamEnd::Closed && self.stderr_end == StreamEnd::Closed
    }

    /// Whether either stream stopped because the scope expired.
    pub fn timed_out(&self) -> bool {
        self.stdout_end == StreamEnd::TimedOut || self.stderr_end == StreamEnd::TimedOut
    }

    /// Stdout decoded as UTF-8, replacing invalid sequences.
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Stderr decoded as UTF-8, replacing invalid sequences.
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}
