//! Registry of spawned processes addressed by integer identifiers.

use std::{
    collections::HashMap,
    path::Path,
    process::ExitStatus,
    sync::{
        Arc, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

use chrono::Utc;
use dashmap::DashMap;
use execreg_config::RegistryConfig;
use execreg_io::{process::spawn_process, scope::Scope};
use tracing::{debug, error, info, warn};

use crate::{
    handle::{ProcessHandle, Stream},
    info::ProcessInfo,
    output::WaitOutput,
    prelude::*,
};

/// Concurrent registry of spawned child processes.
///
/// Identifiers are handed out from an atomic counter and are never reused,
/// not even after [`ProcessRegistry::remove`]. Entries stay registered after
/// their process exits until they are removed explicitly.
///
/// Dropping the registry drops every handle it holds, which kills the
/// children that are still alive.
pub struct ProcessRegistry {
    /// Registry name, only used in log messages.
    name: String,
    config: RegistryConfig,
    next_id: AtomicU64,
    processes: DashMap<u64, Arc<ProcessHandle>>,
}

impl ProcessRegistry {
    /// Create a registry with the default configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_valid_config(name.into(), RegistryConfig::default())
    }

    /// Create a registry with `config`.
    ///
    /// Fails with [`Error::Config`] if `config` does not pass
    /// [`RegistryConfig::validate`].
    pub fn with_config(name: impl Into<String>, config: RegistryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(name.into(), config))
    }

    fn from_valid_config(name: String, config: RegistryConfig) -> Self {
        Self {
            name,
            next_id: AtomicU64::new(config.first_id),
            config,
            processes: DashMap::new(),
        }
    }

    /// Registry name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configuration this registry was created with.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Number of registered processes, exited ones included.
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    /// Whether no process is registered.
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Spawn a process under the configured default scope.
    ///
    /// The default scope is unbounded unless `default_timeout_ms` is set, in
    /// which case it expires that long after the spawn.
    ///
    /// # Arguments
    ///
    /// * `command` - Program to execute
    /// * `args` - Command line arguments
    /// * `working_dir` - Working directory; an empty path inherits the current one
    ///
    /// # Returns
    ///
    /// Returns the identifier of the new process, [`Error::Launch`], or
    /// [`Error::IdsExhausted`] once the counter has reached `u64::MAX`.
    pub fn spawn<I, S>(&self, command: impl Into<String>, args: I, working_dir: impl AsRef<Path>) -> Result<u64>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spawn_with_scope(self.default_scope(), command, args, working_dir)
    }

    /// Spawn a process whose reads are all bounded by `scope`.
    ///
    /// The scope is sticky: once it expires every later read on the process
    /// fails with [`Error::Timeout`] straight away.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use execreg::{ProcessRegistry, Scope, prelude::Error};
    /// use std::time::Duration;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let registry = ProcessRegistry::new("example");
    ///     let scope = Scope::with_timeout(Duration::from_millis(100));
    ///     let id = registry.spawn_with_scope(scope, "sleep", ["5"], "").unwrap();
    ///
    ///     let result = registry.fetch_stdout(id).await;
    ///     assert!(matches!(result, Err(Error::Timeout)));
    /// }
    /// ```
    pub fn spawn_with_scope<I, S>(
        &self,
        scope: Scope,
        command: impl Into<String>,
        args: I,
        working_dir: impl AsRef<Path>,
    ) -> Result<u64>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let command = command.into();
        let args: Vec<String> = args.into_iter().map(|a| a.into()).collect();
        let working_dir = working_dir.as_ref();
        let working_dir = (!working_dir.as_os_str().is_empty()).then(|| working_dir.to_path_buf());

        let child = spawn_process(&command, args.clone(), working_dir.as_deref()).map_err(|err| {
            error!("{} - Failed to launch '{}': {}", self.name, command, err);
            Error::Launch(err)
        })?;

        let info = ProcessInfo {
            pid: child.id(),
            command,
            args,
            working_dir,
            started_at: Utc::now(),
        };
        let handle = ProcessHandle::new(info, child, scope, self.config.chunk_size).map_err(|err| {
            error!("{} - Failed to wire process streams: {}", self.name, err);
            Error::Launch(err)
        })?;
        let handle = Arc::new(handle);

        // Dropping the handle on failure kills the child.
        let id = self.allocate_id()?;
        if self.config.kill_on_scope_expiry {
            self.arm_expiry_kill(id, &handle);
        }
        info!(
            "{} - Spawned process {} (PID: {:?}): {}",
            self.name,
            id,
            handle.info().pid,
            handle.info().command_line()
        );
        self.processes.insert(id, handle);
        Ok(id)
    }

    /// Read one chunk from the stdout of process `id`.
    ///
    /// Fails with [`Error::NotFound`], [`Error::Timeout`], [`Error::Eof`] once
    /// the stream is closed and drained, or [`Error::Read`].
    pub async fn fetch_stdout(&self, id: u64) -> Result<Vec<u8>> {
        self.fetch(id, Stream::Stdout).await
    }

    /// Read one chunk from the stderr of process `id`.
    ///
    /// Fails the same way as [`ProcessRegistry::fetch_stdout`].
    pub async fn fetch_stderr(&self, id: u64) -> Result<Vec<u8>> {
        self.fetch(id, Stream::Stderr).await
    }

    /// Read one chunk from both streams of process `id`.
    ///
    /// A stream whose read fails contributes no bytes. Fails only if both
    /// reads fail, with the stdout error.
    pub async fn fetch_all(&self, id: u64) -> Result<(Vec<u8>, Vec<u8>)> {
        let stdout = self.fetch_stdout(id).await;
        let stderr = self.fetch_stderr(id).await;
        match (stdout, stderr) {
            (Err(err), Err(_)) => Err(err),
            (stdout, stderr) => Ok((stdout.unwrap_or_default(), stderr.unwrap_or_default())),
        }
    }

    /// Read both streams of process `id` until each read fails.
    ///
    /// Both streams are drained at the same time so a child blocked on a
    /// full stderr pipe cannot stall the stdout loop. Stderr is therefore
    /// read while stdout is still open: when the scope expires before
    /// stdout closes, the result still holds the stderr bytes that arrived
    /// up to the expiry, rather than none. Read failures only end
    /// the loop of their stream and are reported through
    /// [`WaitOutput::stdout_end`] and [`WaitOutput::stderr_end`]. With a
    /// bounded scope this returns at the latest when the scope expires.
    ///
    /// Fails only with [`Error::NotFound`].
    pub async fn wait_output(&self, id: u64) -> Result<WaitOutput> {
        let handle = self.get(id)?;
        let ((stdout, stdout_end), (stderr, stderr_end)) =
            tokio::join!(handle.drain(Stream::Stdout), handle.drain(Stream::Stderr));
        debug!(
            "{} - Collected {} stdout and {} stderr bytes from process {}",
            self.name,
            stdout.len(),
            stderr.len(),
            id
        );
        Ok(WaitOutput {
            stdout,
            stderr,
            stdout_end,
            stderr_end,
        })
    }

    /// Whether process `id` exists and no exit has been observed for it.
    ///
    /// Performs one non-blocking status check; there is no background
    /// polling. Unknown identifiers are not running.
    pub fn running(&self, id: u64) -> bool {
        match self.get(id) {
            Ok(handle) => handle.running(),
            Err(_) => false,
        }
    }

    /// Exit status of process `id`, if its exit has been observed.
    pub fn exit_status(&self, id: u64) -> Result<Option<ExitStatus>> {
        Ok(self.get(id)?.exit_status())
    }

    /// Send a kill signal to process `id`.
    ///
    /// Does not wait for the process to exit. Fails with [`Error::Kill`] if
    /// the signal could not be sent, e.g. because the exit was already
    /// observed.
    pub fn kill(&self, id: u64) -> Result<()> {
        let handle = self.get(id)?;
        match handle.kill() {
            Ok(()) => {
                info!("{} - Sent kill signal to process {}", self.name, id);
                Ok(())
            }
            Err(err) => {
                warn!("{} - Failed to kill process {}: {}", self.name, id, err);
                Err(Error::Kill(err))
            }
        }
    }

    /// Write `data` to the stdin of process `id`.
    pub async fn write_stdin(&self, id: u64, data: impl AsRef<[u8]>) -> Result<()> {
        let handle = self.get(id)?;
        let data = data.as_ref();
        handle.write_stdin(data).await?;
        debug!("{} - Wrote {} bytes to stdin of process {}", self.name, data.len(), id);
        Ok(())
    }

    /// Close the stdin of process `id`, signalling end of input.
    pub async fn close_stdin(&self, id: u64) -> Result<()> {
        self.get(id)?.close_stdin().await;
        Ok(())
    }

    /// Launch metadata of process `id`.
    pub fn info(&self, id: u64) -> Result<ProcessInfo> {
        Ok(self.get(id)?.info().clone())
    }

    /// Snapshot of the launch metadata of every registered process.
    pub fn list(&self) -> HashMap<u64, ProcessInfo> {
        self.processes
            .iter()
            .map(|entry| (*entry.key(), entry.value().info().clone()))
            .collect()
    }

    /// Remove process `id` from the registry.
    ///
    /// The child is killed if still alive once the last outstanding
    /// operation on it has finished. The identifier is not reused.
    pub fn remove(&self, id: u64) -> Option<ProcessInfo> {
        let (_, handle) = self.processes.remove(&id)?;
        info!("{} - Removed process {}", self.name, id);
        Some(handle.info().clone())
    }

    /// Remove every process whose exit has been observed.
    ///
    /// Returns the removed identifiers.
    pub fn prune_exited(&self) -> Vec<u64> {
        let exited: Vec<u64> = self
            .processes
            .iter()
            .filter(|entry| !entry.value().running())
            .map(|entry| *entry.key())
            .collect();

        for id in &exited {
            self.processes.remove(id);
        }
        if !exited.is_empty() {
            info!("{} - Pruned {} exited processes", self.name, exited.len());
        }
        exited
    }

    async fn fetch(&self, id: u64, stream: Stream) -> Result<Vec<u8>> {
        let handle = self.get(id)?;
        Ok(handle.read(stream).await?)
    }

    /// Hand out the next identifier. `u64::MAX` is never handed out; the
    /// counter stops there instead of wrapping.
    fn allocate_id(&self) -> Result<u64> {
        self.next_id
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |id| id.checked_add(1))
            .map_err(|_| {
                error!("{} - Process identifiers exhausted", self.name);
                Error::IdsExhausted
            })
    }

    fn get(&self, id: u64) -> Result<Arc<ProcessHandle>> {
        self.processes
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(Error::NotFound(id))
    }

    fn default_scope(&self) -> Scope {
        match self.config.default_timeout() {
            Some(timeout) => Scope::with_timeout(timeout),
            None => Scope::unbounded(),
        }
    }

    fn arm_expiry_kill(&self, id: u64, handle: &Arc<ProcessHandle>) {
        let scope = handle.scope().clone();
        let closed = handle.closed();
        let handle: Weak<ProcessHandle> = Arc::downgrade(handle);
        let name = self.name.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = closed.cancelled() => {}
                _ = scope.expired() => {
                    let Some(handle) = handle.upgrade() else {
                        return;
                    };
                    if handle.running() {
                        match handle.kill() {
                            Ok(()) => info!("{} - Scope of process {} expired, killed it", name, id),
                            Err(err) => warn!("{} - Failed to kill expired process {}: {}", name, id, err),
                        }
                    }
                }
            }
        });
    }
}
