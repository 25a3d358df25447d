//! Low-level async process management utilities.

use std::{
    ffi::OsStr,
    io,
    path::Path,
    process::{ExitStatus, Stdio},
};

use tokio::process::{Child, Command};

/// Errors that can occur while inspecting a child process.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// Failed to query the child's exit status.
    #[error("Failed to wait for child process: {0}")]
    WaitChildFail(io::Error),
}

/// Current status of a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// Process has completed with exit status.
    Done(ExitStatus),
    /// Process is still running.
    Running,
}

/// Spawn a new async process with stdin, stdout and stderr piped.
///
/// The child is killed if its [`Child`] handle is dropped before it exits.
///
/// # Arguments
///
/// * `cmd` - Command to execute
/// * `args` - Command line arguments
/// * `dir` - Working directory, or `None` to inherit the current one
///
/// # Examples
///
/// ```rust
/// use execreg_io::process::spawn_process;
///
/// #[tokio::main]
/// async fn main() {
///     let mut child = spawn_process("echo", vec!["Hello".to_string()], None).unwrap();
///     let output = child.stdout.take().unwrap();
/// }
/// ```
pub fn spawn_process(cmd: &str, args: Vec<String>, dir: Option<&Path>) -> Result<Child, io::Error> {
    let mut command = Command::new(OsStr::new(cmd));
    command
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = dir {
        command.current_dir(dir);
    }
    command.spawn()
}

/// Check process status without blocking.
///
/// Reaps the child if it has exited. Once this has returned
/// `ProcessStatus::Done`, later calls keep returning the same status.
///
/// # Examples
///
/// ```rust
/// use execreg_io::process::{spawn_process, get_process_status, ProcessStatus};
///
/// #[tokio::main]
/// async fn main() {
///     let mut child = spawn_process("true", vec![], None).unwrap();
///     loop {
///         if let ProcessStatus::Done(status) = get_process_status(&mut child).unwrap() {
///             assert!(status.success());
///             break;
///         }
///         tokio::time::sleep(std::time::Duration::from_millis(10)).await;
///     }
/// }
/// ```
pub fn get_process_status(child: &mut Child) -> Result<ProcessStatus, ProcessError> {
    match child.try_wait() {
        Ok(Some(exit_status)) => Ok(ProcessStatus::Done(exit_status)),
        Ok(None) => Ok(ProcessStatus::Running),
        Err(err) => Err(ProcessError::WaitChildFail(err)),
    }
}

/// Send a kill signal to a child process without waiting for it to exit.
///
/// Fails if the child's exit has already been observed.
pub fn stop_child(child: &mut Child) -> Result<(), io::Error> {
    child.start_kill()
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use tokio::io::AsyncReadExt;

    use super::*;

    async fn wait_done(child: &mut Child) -> ExitStatus {
        loop {
            if let ProcessStatus::Done(status) = get_process_status(child).unwrap() {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn spawns_with_all_pipes() {
        let mut child = spawn_process("cat", vec![], None).unwrap();
        assert!(child.stdin.is_some());
        assert!(child.stdout.is_some());
        assert!(child.stderr.is_some());

        drop(child.stdin.take());
        let status = tokio::time::timeout(Duration::from_secs(5), wait_done(&mut child))
            .await
            .unwrap();
        assert!(status.success());
    }

    #[tokio::test]
    async fn applies_working_directory() {
        let dir = std::env::temp_dir().canonicalize().unwrap();
        let mut child = spawn_process("pwd", vec![], Some(&dir)).unwrap();
        let mut output = String::new();
        child
            .stdout
            .take()
            .unwrap()
            .read_to_string(&mut output)
            .await
            .unwrap();
        assert_eq!(output.trim_end(), dir.to_string_lossy());
    }

    #[tokio::test]
    async fn missing_binary_fails_to_spawn() {
        let result = spawn_process("/definitely/not/a/binary", vec![], None);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn stop_child_after_exit_fails() {
        let mut child = spawn_process("sleep", vec!["30".to_string()], None).unwrap();
        assert_eq!(get_process_status(&mut child).unwrap(), ProcessStatus::Running);

        stop_child(&mut child).unwrap();
        let status = tokio::time::timeout(Duration::from_secs(5), wait_done(&mut child))
            .await
            .unwrap();
        assert!(!status.success());
        assert!(stop_child(&mut child).is_err());
    }
}
