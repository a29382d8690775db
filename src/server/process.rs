use crate::error::{Error, Result};
use async_process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use futures_lite::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use futures_lite::stream::StreamExt;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use uuid::Uuid;

/// Console line marking the server as fully booted and joinable.
const READY_MARKER: &str = "INFO]: Done (";
/// Console line indicating the server cannot boot until the license is
/// accepted; the process would otherwise hang, so it is killed outright.
const FATAL_MARKER: &str = "INFO]: You need to agree to the EULA";
/// The console command that shuts the server down cleanly.
const STOP_COMMAND: &str = "stop";
/// Bounded wait for the process to exit after a graceful stop.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Unique identifier for a registered log listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A subscriber to the server's console output.
///
/// Implementations receive every console line in order. `on_message` is
/// called from the dedicated read-loop task, so it must not block; push
/// the line onto a queue and return. A returned error is logged and
/// skipped, it never prevents delivery to other listeners.
pub trait LogListener: Send + Sync {
    /// Called once per console line, in log order.
    fn on_message(&self, line: &str) -> Result<()>;
}

/// Status of the managed server process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    /// No process exists
    Stopped,
    /// Process is being spawned
    Starting,
    /// Process exists but has not finished booting
    Running,
    /// Boot-complete marker observed; the server accepts commands
    Ready,
    /// A stop command has been issued and the process has not yet exited
    Stopping,
}

/// State shared between the process handle and its read-loop task.
struct ProcessShared {
    child: tokio::sync::Mutex<Option<Child>>,
    stdin: tokio::sync::Mutex<Option<ChildStdin>>,
    status: std::sync::Mutex<ServerStatus>,
    active: AtomicBool,
    ready: AtomicBool,
    listeners: std::sync::Mutex<HashMap<ListenerId, Arc<dyn LogListener>>>,
}

impl ProcessShared {
    fn set_status(&self, status: ServerStatus) {
        if let Ok(mut guard) = self.status.lock() {
            *guard = status;
        }
    }

    /// Delivers a line to every current listener.
    ///
    /// The listener set is snapshotted under the lock and released before
    /// delivery, so listeners may subscribe or unsubscribe concurrently
    /// with a broadcast. A failing listener is logged and skipped.
    fn broadcast(&self, line: &str) {
        let snapshot: Vec<(ListenerId, Arc<dyn LogListener>)> = match self.listeners.lock() {
            Ok(guard) => guard
                .iter()
                .map(|(id, listener)| (*id, Arc::clone(listener)))
                .collect(),
            Err(_) => {
                tracing::error!("Listener set lock poisoned, dropping line");
                return;
            }
        };
        for (id, listener) in snapshot {
            if let Err(e) = listener.on_message(line) {
                tracing::warn!(listener_id = %id, error = %e, "Listener rejected console line");
            }
        }
    }
}

/// The managed server process.
///
/// Owns the child process lifecycle: spawn, write console commands, stream
/// console output line-by-line to registered listeners, detect readiness
/// and fatal boot errors, and stop gracefully. The process handle is never
/// shared; the only exit signal the rest of the system sees is the read
/// loop observing the console stream close.
///
/// # Example
///
/// ```no_run
/// use worldsmith::server::ServerProcess;
/// use worldsmith::error::Result;
///
/// #[tokio::main]
/// async fn main() -> Result<()> {
///     let server = ServerProcess::new(
///         "survival".to_string(),
///         "/srv/minecraft",
///         "java".to_string(),
///         vec!["-Xmx2G".to_string(), "-jar".to_string(), "server.jar".to_string()],
///     );
///     server.start().await?;
///     server.write("say hello").await?;
///     server.stop().await?;
///     Ok(())
/// }
/// ```
pub struct ServerProcess {
    /// Server name, used for log context
    name: String,
    /// Working directory containing the server jar
    directory: PathBuf,
    /// Executable used to launch the server
    command: String,
    /// Full argument list passed to the executable
    args: Vec<String>,
    /// State shared with the read-loop task
    shared: Arc<ProcessShared>,
}

impl ServerProcess {
    /// Creates a new server process handle. Nothing is spawned until
    /// [`start`](Self::start) is called.
    pub fn new(
        name: String,
        directory: impl AsRef<Path>,
        command: String,
        args: Vec<String>,
    ) -> Self {
        Self {
            name,
            directory: directory.as_ref().to_path_buf(),
            command,
            args,
            shared: Arc::new(ProcessShared {
                child: tokio::sync::Mutex::new(None),
                stdin: tokio::sync::Mutex::new(None),
                status: std::sync::Mutex::new(ServerStatus::Stopped),
                active: AtomicBool::new(false),
                ready: AtomicBool::new(false),
                listeners: std::sync::Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Get the server name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the current process status
    pub fn status(&self) -> ServerStatus {
        self.shared
            .status
            .lock()
            .map(|guard| *guard)
            .unwrap_or(ServerStatus::Stopped)
    }

    /// True while the process handle exists and the console stream has not
    /// closed.
    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// True once the boot-complete marker has been observed and no stop
    /// has been issued since.
    pub fn is_ready(&self) -> bool {
        self.shared.ready.load(Ordering::SeqCst)
    }

    /// Starts the server process if not already running.
    ///
    /// No-op when a process is already active. Spawns the configured
    /// executable in the server directory with piped console streams and
    /// begins the dedicated read-loop task. The active check and the spawn
    /// happen under the child lock, so concurrent calls start at most one
    /// process.
    #[tracing::instrument(skip(self), fields(server_name = %self.name))]
    pub async fn start(&self) -> Result<()> {
        let mut child_guard = self.shared.child.lock().await;
        if self.is_active() {
            tracing::debug!("Server already active, ignoring start");
            return Ok(());
        }

        self.shared.set_status(ServerStatus::Starting);
        tracing::info!(command = %self.command, "Spawning server process");

        let mut command = Command::new(&self.command);
        command
            .args(&self.args)
            .current_dir(&self.directory)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        let mut child = command.spawn().map_err(|e| {
            self.shared.set_status(ServerStatus::Stopped);
            Error::Process(format!("Failed to start process: {}", e))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Process("Failed to get stdin pipe".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Process("Failed to get stdout pipe".to_string()))?;

        *child_guard = Some(child);
        *self.shared.stdin.lock().await = Some(stdin);
        self.shared.ready.store(false, Ordering::SeqCst);
        self.shared.active.store(true, Ordering::SeqCst);
        self.shared.set_status(ServerStatus::Running);
        drop(child_guard);

        let shared = Arc::clone(&self.shared);
        let name = self.name.clone();
        tokio::spawn(async move {
            read_loop(shared, stdout, name).await;
        });

        Ok(())
    }

    /// Writes a single command line to the server console.
    ///
    /// A newline is appended automatically. Pipe failures come back as
    /// [`Error::ProcessIo`] rather than aborting the caller.
    pub async fn write(&self, command: &str) -> Result<()> {
        let mut stdin_guard = self.shared.stdin.lock().await;
        let stdin = stdin_guard
            .as_mut()
            .ok_or_else(|| Error::ProcessIo("Console input pipe is closed".to_string()))?;
        stdin
            .write_all(format!("{}\n", command).as_bytes())
            .await
            .map_err(|e| Error::ProcessIo(format!("Write failed: {}", e)))?;
        stdin
            .flush()
            .await
            .map_err(|e| Error::ProcessIo(format!("Flush failed: {}", e)))?;
        Ok(())
    }

    /// Stops the server gracefully.
    ///
    /// Sends the console `stop` command and waits up to 5 seconds for the
    /// read loop to observe the process exit. On timeout or a broken pipe
    /// an error is returned, and the server is marked not-ready either way.
    /// This does not guarantee process death; [`kill`](Self::kill) is the
    /// orchestrator's last resort after repeated graceful failures.
    #[tracing::instrument(skip(self), fields(server_name = %self.name))]
    pub async fn stop(&self) -> Result<()> {
        self.shared.set_status(ServerStatus::Stopping);
        let write_result = self.write(STOP_COMMAND).await;
        self.shared.ready.store(false, Ordering::SeqCst);
        if let Err(e) = write_result {
            tracing::warn!(error = %e, "Stop command failed, server may already be offline");
            return Err(e);
        }

        let shared = Arc::clone(&self.shared);
        let exited = tokio::time::timeout(STOP_TIMEOUT, async move {
            while shared.active.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        })
        .await;

        match exited {
            Ok(()) => {
                tracing::info!("Server stopped cleanly");
                Ok(())
            }
            Err(_) => Err(Error::Timeout(format!(
                "Server did not exit within {:?} of stop",
                STOP_TIMEOUT
            ))),
        }
    }

    /// Kills the server process outright.
    ///
    /// Last resort only: world data being written at the moment of death is
    /// not flushed. The orchestrator invokes this after graceful stop fails
    /// repeatedly, or when the fatal license marker appears during boot.
    #[tracing::instrument(skip(self), fields(server_name = %self.name))]
    pub async fn kill(&self) -> Result<()> {
        self.shared.ready.store(false, Ordering::SeqCst);
        let mut child_guard = self.shared.child.lock().await;
        if let Some(child) = child_guard.as_mut() {
            tracing::warn!("Killing server process");
            child
                .kill()
                .map_err(|e| Error::Process(format!("Failed to kill process: {}", e)))?;
            Ok(())
        } else {
            Err(Error::NotRunning)
        }
    }

    /// Registers a listener for console output.
    ///
    /// The listener immediately receives a synthetic "Subscribed to server
    /// logs." notification, delivered to it alone; registration fails if
    /// that delivery fails.
    pub fn add_listener(&self, listener: Arc<dyn LogListener>) -> Result<ListenerId> {
        listener
            .on_message("Subscribed to server logs.")
            .map_err(|e| Error::Listener(format!("Listener rejected subscription: {}", e)))?;
        let id = ListenerId::new();
        let mut listeners = self
            .shared
            .listeners
            .lock()
            .map_err(|_| Error::Other("Failed to lock listener set".to_string()))?;
        listeners.insert(id, listener);
        tracing::debug!(listener_id = %id, "Listener subscribed");
        Ok(id)
    }

    /// Removes a listener.
    ///
    /// If the id was registered, the listener receives a final synthetic
    /// "Unsubscribed from server logs." notification and nothing after it.
    /// Removing an unknown id is a no-op.
    pub fn remove_listener(&self, id: ListenerId) -> Result<()> {
        let removed = {
            let mut listeners = self
                .shared
                .listeners
                .lock()
                .map_err(|_| Error::Other("Failed to lock listener set".to_string()))?;
            listeners.remove(&id)
        };
        if let Some(listener) = removed {
            tracing::debug!(listener_id = %id, "Listener unsubscribed");
            if let Err(e) = listener.on_message("Unsubscribed from server logs.") {
                tracing::warn!(listener_id = %id, error = %e, "Listener rejected unsubscribe notice");
            }
        }
        Ok(())
    }

    /// Delivers a line to every listener, as if it came from the console.
    ///
    /// Used by the orchestrator for its own status notifications.
    pub fn notify_listeners(&self, line: &str) {
        self.shared.broadcast(line);
    }
}

/// Reads console lines for the life of the process.
///
/// This is the dedicated concurrency unit for console output: it blocks on
/// the next line, broadcasts it to all current listeners, and while the
/// server is not yet ready inspects it for the boot-complete and fatal
/// markers. Observing the stream close is the sole authoritative signal of
/// process exit; the loop then reaps the child and clears the active flag.
async fn read_loop(shared: Arc<ProcessShared>, stdout: ChildStdout, name: String) {
    let mut lines = BufReader::new(stdout).lines();
    while let Some(line) = lines.next().await {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(server_name = %name, error = %e, "Console read failed");
                break;
            }
        };
        let line = line.trim();
        shared.broadcast(line);

        if !shared.ready.load(Ordering::SeqCst) {
            if line.contains(READY_MARKER) {
                tracing::info!(server_name = %name, "Server is ready");
                shared.ready.store(true, Ordering::SeqCst);
                shared.set_status(ServerStatus::Ready);
            } else if line.contains(FATAL_MARKER) {
                tracing::error!(server_name = %name, "License not accepted, killing server");
                let mut child_guard = shared.child.lock().await;
                if let Some(child) = child_guard.as_mut() {
                    if let Err(e) = child.kill() {
                        tracing::error!(server_name = %name, error = %e, "Kill failed");
                    }
                }
            }
        }
    }

    // Console stream closed: the process has exited.
    shared.ready.store(false, Ordering::SeqCst);
    shared.set_status(ServerStatus::Stopped);
    *shared.stdin.lock().await = None;
    if let Some(mut child) = shared.child.lock().await.take() {
        match child.status().await {
            Ok(status) => {
                tracing::info!(server_name = %name, exit_status = %status, "Server process exited")
            }
            Err(e) => tracing::warn!(server_name = %name, error = %e, "Failed to reap server"),
        }
    }
    shared.active.store(false, Ordering::SeqCst);
}
