//! Runtime record of one spawned process.

use std::{
    io,
    process::ExitStatus,
    sync::{Mutex, MutexGuard, PoisonError},
};

use execreg_io::{
    process::{ProcessStatus, get_process_status, stop_child},
    reader::read_chunk_locked,
    scope::Scope,
};
use tokio::{
    io::AsyncWriteExt,
    process::{Child, ChildStderr, ChildStdin, ChildStdout},
    sync::Mutex as AsyncMutex,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{info::ProcessInfo, prelude::*};

/// Output stream of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

/// OS child together with the exit status observed for it so far.
struct ChildState {
    child: Child,
    exit_status: Option<ExitStatus>,
}

/// A spawned process with its streams and cancellation scope.
///
/// Each stream sits behind its own async mutex, so concurrent reads of the
/// same stream are served one after the other. The OS child sits behind a
/// blocking mutex that is never held across an `.await`.
pub struct ProcessHandle {
    info: ProcessInfo,
    child: Mutex<ChildState>,
    stdout: AsyncMutex<ChildStdout>,
    stderr: AsyncMutex<ChildStderr>,
    stdin: AsyncMutex<Option<ChildStdin>>,
    scope: Scope,
    chunk_size: usize,
    closed: CancellationToken,
}

impl ProcessHandle {
    /// Take ownership of `child` and its three pipes.
    ///
    /// Fails if any pipe is missing; the child is then dropped, which kills
    /// it.
    pub fn new(info: ProcessInfo, mut child: Child, scope: Scope, chunk_size: usize) -> io::Result<Self> {
        let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;
        let stdin = child.stdin.take().ok_or_else(|| missing_pipe("stdin"))?;

        Ok(Self {
            info,
            child: Mutex::new(ChildState {
                child,
                exit_status: None,
            }),
            stdout: AsyncMutex::new(stdout),
            stderr: AsyncMutex::new(stderr),
            stdin: AsyncMutex::new(Some(stdin)),
            scope,
            chunk_size,
            closed: CancellationToken::new(),
        })
    }

    /// Launch metadata.
    pub fn info(&self) -> &ProcessInfo {
        &self.info
    }

    /// Scope bounding every read on this handle.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Token cancelled when this handle is dropped.
    pub fn closed(&self) -> CancellationToken {
        self.closed.clone()
    }

    /// Perform one bounded read from `stream`.
    pub async fn read(&self, stream: Stream) -> execreg_io::prelude::Result<Vec<u8>> {
        match stream {
            Stream::Stdout => read_chunk_locked(&self.stdout, &self.scope, self.chunk_size).await,
            Stream::Stderr => read_chunk_locked(&self.stderr, &self.scope, self.chunk_size).await,
        }
    }

    /// Read `stream` until a read fails, returning the bytes and why it stopped.
    pub async fn drain(&self, stream: Stream) -> (Vec<u8>, crate::output::StreamEnd) {
        let mut output = Vec::new();
        loop {
            match self.read(stream).await {
                Ok(chunk) => output.extend_from_slice(&chunk),
                Err(err) => {
                    debug!("{:?} of '{}' stopped: {}", stream, self.info.command, err);
                    return (output, (&err).into());
                }
            }
        }
    }

    /// Exit status of the process, if it has been observed.
    ///
    /// Performs one non-blocking check when no exit has been observed yet.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        let mut state = self.lock_child();
        if state.exit_status.is_none() {
            match get_process_status(&mut state.child) {
                Ok(ProcessStatus::Done(status)) => {
                    debug!("'{}' exited with {}", self.info.command, status);
                    state.exit_status = Some(status);
                }
                Ok(ProcessStatus::Running) => {}
                Err(err) => warn!("Failed to check status of '{}': {}", self.info.command, err),
            }
        }
        state.exit_status
    }

    /// Whether no exit has been observed for the process yet.
    pub fn running(&self) -> bool {
        self.exit_status().is_none()
    }

    /// Send a kill signal to the process.
    pub fn kill(&self) -> io::Result<()> {
        let mut state = self.lock_child();
        stop_child(&mut state.child)
    }

    /// Write `data` to the process's stdin and flush it.
    pub async fn write_stdin(&self, data: &[u8]) -> Result<()> {
        let mut stdin = self.stdin.lock().await;
        let pipe = stdin.as_mut().ok_or(Error::StdinClosed)?;
        pipe.write_all(data).await.map_err(Error::Stdin)?;
        pipe.flush().await.map_err(Error::Stdin)?;
        Ok(())
    }

    /// Close the process's stdin. Closing twice is a no-op.
    pub async fn close_stdin(&self) {
        if self.stdin.lock().await.take().is_some() {
            debug!("Closed stdin of '{}'", self.info.command);
        }
    }

    fn lock_child(&self) -> MutexGuard<'_, ChildState> {
        self.child.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        self.closed.cancel();
    }
}

fn missing_pipe(name: &str) -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, format!("child {name} is not piped"))
}
