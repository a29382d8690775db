/*!
 # worldsmith

 A Rust library for supervising a single long-running game server process.

 ## Overview

 worldsmith provides functionality to:
 - Start, stop, and supervise a line-oriented console server process
 - Stream the server's console output to any number of subscribers
 - Detect readiness and crashes, respawning per policy
 - Run weekly scheduled restarts with player-facing warnings
 - Create, rotate, list, restore, and delete world backups

 ## Basic Usage

 ```no_run
 use worldsmith::{ServerManager, Result};
 use std::sync::Arc;

 #[tokio::main]
 async fn main() -> Result<()> {
     // Create a manager from a config file
     let manager = Arc::new(ServerManager::from_config_file("worldsmith.json")?);

     // Tail the console from another task
     let mut tail = manager.log_subscription();
     tail.subscribe()?;
     tokio::spawn(async move {
         while let Some(line) = tail.next().await {
             println!("{}", line);
         }
     });

     // Blocks for the whole session: survives restarts, returns on shutdown
     manager.start_server().await?;

     Ok(())
 }
 ```

 ## Features

 - **Process supervision**: crash detection and scheduled restarts
 - **Console streaming**: ordered line delivery to every subscriber
 - **World backups**: timestamped rotation plus named manual snapshots
 - **Configuration**: JSON settings file plus the server's own properties
 - **Async support**: full async/await support

 ## License

 This project is licensed under the terms in the LICENSE file.
*/

pub mod backup;
pub mod config;
pub mod error;
pub mod schedule;
pub mod server;

pub use backup::BackupStore;
pub use config::Config;
pub use error::{Error, Result};
pub use schedule::{ScheduleSpec, seconds_until};
pub use server::{ListenerId, LogListener, LogSubscription, ServerProcess, ServerStatus};

use crate::backup::unix_now;
use crate::config::ServerProperties;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Supervising loop tick. Short enough that shutdown is observed promptly,
/// long enough to avoid busy-polling.
const POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Pause between checks while waiting out an in-flight backup or an
/// unstable process state.
const SETTLE_INTERVAL: Duration = Duration::from_secs(1);

/// Session flags shared between the supervising loop and externally
/// invoked operations.
///
/// Together they disambiguate why the process exited and what happens
/// next. `is_backing_up` gates the restart-completion path so a restart
/// and a backup never manipulate the world directories at once.
struct ManagerFlags {
    should_be_running: AtomicBool,
    sent_stop_signal: AtomicBool,
    is_auto_restarting: AtomicBool,
    is_backing_up: AtomicBool,
    saving_disabled: AtomicBool,
}

impl ManagerFlags {
    fn new() -> Self {
        Self {
            should_be_running: AtomicBool::new(false),
            sent_stop_signal: AtomicBool::new(false),
            is_auto_restarting: AtomicBool::new(false),
            is_backing_up: AtomicBool::new(false),
            saving_disabled: AtomicBool::new(false),
        }
    }
}

/// Configure and supervise a game server process.
///
/// This struct is the main entry point: it composes a [`ServerProcess`]
/// with the restart and backup policies and exposes the public control
/// surface consumed by a UI layer. All methods take `&self`; share the
/// manager behind an [`Arc`] so console commands and backups can be issued
/// while [`start_server`](Self::start_server) blocks in the supervising
/// loop.
pub struct ServerManager {
    /// Loaded configuration
    config: Config,
    /// The supervised process
    server: Arc<ServerProcess>,
    /// Backup filesystem operations
    store: BackupStore,
    /// Session flags
    flags: ManagerFlags,
    /// Parsed restart schedule; `None` disables the policy
    restart_schedule: Option<ScheduleSpec>,
    /// Parsed backup schedule; `None` disables the scheduled backup
    backup_schedule: Option<ScheduleSpec>,
    /// Serializes backup operations
    backup_gate: tokio::sync::Mutex<()>,
    /// Server display name
    name: String,
    /// Server working directory
    directory: PathBuf,
    /// Query port from server.properties, exposed for status probers
    query_port: Option<u16>,
    /// Message of the day from server.properties
    motd: Option<String>,
    /// Unix timestamp of the last spawn, 0 before the first
    started_at: AtomicU64,
}

impl ServerManager {
    /// Creates a manager from a JSON configuration file.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(path), fields(config_path = ?path.as_ref()))]
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        tracing::info!("Loading configuration from file");
        let config = Config::from_file(path)?;
        Self::new(config)
    }

    /// Creates a manager from an already-loaded configuration.
    ///
    /// Reads the server's `server.properties` for world directory names and
    /// the query port, and parses the policy schedules. Malformed
    /// configuration is fatal here rather than silently ignored later.
    #[tracing::instrument(skip(config), fields(server_dir = %config.server.directory))]
    pub fn new(config: Config) -> Result<Self> {
        config::validate_config(&config)?;

        let directory = PathBuf::from(&config.server.directory);
        let properties = ServerProperties::load(directory.join("server.properties"))?;
        let world_names = properties.level_names();
        tracing::debug!(worlds = ?world_names, "Read world directories from server.properties");

        let restart_schedule = if config.restarts.autorestart {
            config
                .restarts
                .schedule
                .as_deref()
                .map(ScheduleSpec::parse)
                .transpose()?
        } else {
            None
        };
        let backup_schedule = if config.backups.enabled {
            config
                .backups
                .schedule
                .as_deref()
                .map(ScheduleSpec::parse)
                .transpose()?
        } else {
            None
        };

        let name = config.server.name.clone().unwrap_or_else(|| {
            directory
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "server".to_string())
        });

        let mut args = config.server.args.clone();
        args.push("-jar".to_string());
        args.push(config.server.jar.clone());
        args.push("-nogui".to_string());

        let server = Arc::new(ServerProcess::new(
            name.clone(),
            &directory,
            config.server.command.clone(),
            args,
        ));
        let store = BackupStore::new(
            &directory,
            &config.backups.folder,
            world_names,
            config.backups.max_backups,
        );

        tracing::info!(server_name = %name, "Created ServerManager");
        Ok(Self {
            config,
            server,
            store,
            flags: ManagerFlags::new(),
            restart_schedule,
            backup_schedule,
            backup_gate: tokio::sync::Mutex::new(()),
            name,
            directory,
            query_port: properties.query_port(),
            motd: properties.motd().map(str::to_string),
            started_at: AtomicU64::new(0),
        })
    }

    /// Starts the server and supervises it until shutdown.
    ///
    /// Blocks for the entire session by design: the supervising loop
    /// survives scheduled and crash restarts and only returns once the
    /// server is down and no policy wants it back up. Run it on a task you
    /// are willing to dedicate for the session's lifetime.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self), fields(server_name = %self.name))]
    pub async fn start_server(&self) -> Result<()> {
        if self.flags.should_be_running.swap(true, Ordering::SeqCst) {
            tracing::warn!("Start requested but the supervisor is already running");
            return Err(Error::AlreadyRunning);
        }
        self.reset_session_flags();

        if let Err(e) = self.spawn_server().await {
            self.flags.should_be_running.store(false, Ordering::SeqCst);
            tracing::error!(error = %e, "Failed to spawn server");
            return Err(e);
        }

        self.supervising_loop().await;
        self.notify("Server shut down");
        tracing::info!("Supervising loop exited");
        Ok(())
    }

    /// Sends a command to the server console.
    ///
    /// A literal `stop` routes through [`stop_server`](Self::stop_server)
    /// so a manually typed stop is never misdiagnosed as a crash by the
    /// restart-on-crash policy.
    pub async fn write(&self, command: &str) -> Result<()> {
        let command = command.trim();
        if command == "stop" {
            self.stop_server().await
        } else {
            self.server.write(command).await
        }
    }

    /// Stops the server cleanly, without respawning.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self), fields(server_name = %self.name))]
    pub async fn stop_server(&self) -> Result<()> {
        self.flags.sent_stop_signal.store(true, Ordering::SeqCst);
        self.server.stop().await
    }

    /// Stops the server and lets the supervising loop respawn it.
    #[tracing::instrument(skip(self), fields(server_name = %self.name))]
    pub async fn restart_server(&self) -> Result<()> {
        self.flags.is_auto_restarting.store(true, Ordering::SeqCst);
        self.server.stop().await
    }

    /// Kills the server process outright.
    ///
    /// Last resort after graceful stops fail repeatedly; see
    /// [`ServerProcess::kill`].
    pub async fn kill_server(&self) -> Result<()> {
        self.flags.sent_stop_signal.store(true, Ordering::SeqCst);
        self.server.kill().await
    }

    /// Creates a backup of the world directories.
    ///
    /// Without a name, the backup is stamped with the current Unix time and
    /// old auto-named backups are rotated out to respect the configured
    /// maximum. With a name, the backup is kept forever and the call fails
    /// if the name is taken.
    ///
    /// Saving is disabled on the live server for the duration of the copy
    /// (a no-op when the server is offline) and always re-enabled
    /// afterwards, even if the server exits mid-backup. If the server is
    /// mid-transition the backup waits for a stable state, notifying
    /// listeners periodically, because world data is unsafe to copy while
    /// booting or stopping.
    ///
    /// Returns the backup's name.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self), fields(server_name = %self.name))]
    pub async fn backup_world(&self, name: Option<&str>) -> Result<String> {
        let _gate = self.backup_gate.lock().await;

        // Raised before the settle wait, not after: the supervising loop's
        // respawn decision must observe the backup from the moment it is
        // committed, including while it waits for a stable process state.
        self.flags.is_backing_up.store(true, Ordering::SeqCst);

        while self.server.is_active() && !self.server.is_ready() {
            self.notify("Waiting for the server to settle before backing up");
            tokio::time::sleep(SETTLE_INTERVAL).await;
        }

        self.notify("Backing up world");

        if self.server.is_ready() {
            match self.server.write("save-off").await {
                Ok(()) => self.flags.saving_disabled.store(true, Ordering::SeqCst),
                Err(e) => tracing::warn!(error = %e, "Could not disable saving before backup"),
            }
        }

        let store = self.store.clone();
        let named = name.map(str::to_string);
        let result = match tokio::task::spawn_blocking(move || match named {
            Some(n) => store.create_named(&n),
            None => store.create_auto(),
        })
        .await
        {
            Ok(result) => result,
            Err(e) => Err(Error::Other(format!("Backup task failed: {}", e))),
        };

        // Re-enable saving even if the process exited mid-backup, so the
        // disabled-save flag can never stick across sessions.
        if self.flags.saving_disabled.swap(false, Ordering::SeqCst) && self.server.is_ready() {
            if let Err(e) = self.server.write("save-on").await {
                tracing::warn!(error = %e, "Could not re-enable saving after backup");
            }
        }

        // The completion notification precedes the flag clearing: anything
        // waiting on is_backing_up observes it strictly after.
        let result = match result {
            Ok(backup_name) => {
                tracing::info!(backup = %backup_name, "Backup completed");
                self.notify("Backup completed");
                Ok(backup_name)
            }
            Err(e) => {
                tracing::error!(error = %e, "Backup failed");
                self.notify(&format!("Failed to back up world: {}", e));
                Err(e)
            }
        };
        self.flags.is_backing_up.store(false, Ordering::SeqCst);
        result
    }

    /// Returns the backup entry names, unsorted.
    ///
    /// Ordering is a presentation concern of the caller.
    pub fn list_backups(&self) -> Vec<String> {
        self.store.list()
    }

    /// Restores a backup over the live world directories.
    ///
    /// Fails with [`Error::StillRunning`] while the server is supposed to
    /// be running and with [`Error::BackupNotFound`] for unknown names,
    /// mutating nothing in either case. Serialized with
    /// [`backup_world`](Self::backup_world): a restore never interleaves
    /// with a backup's copy of the same world directories.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self), fields(backup = %name))]
    pub async fn restore_backup(&self, name: &str) -> Result<()> {
        let _gate = self.backup_gate.lock().await;
        if self.server_should_be_running() {
            tracing::warn!("Restore rejected: server is running");
            return Err(Error::StillRunning);
        }
        let store = self.store.clone();
        let name = name.to_string();
        tokio::task::spawn_blocking(move || store.restore(&name))
            .await
            .map_err(|e| Error::Other(format!("Restore task failed: {}", e)))?
    }

    /// Deletes a backup.
    ///
    /// Fails with [`Error::BackupNotFound`] for unknown names.
    #[tracing::instrument(skip(self), fields(backup = %name))]
    pub async fn delete_backup(&self, name: &str) -> Result<()> {
        let store = self.store.clone();
        let name = name.to_string();
        tokio::task::spawn_blocking(move || store.delete(&name))
            .await
            .map_err(|e| Error::Other(format!("Delete task failed: {}", e)))?
    }

    /// True while the server process exists and its console stream is open.
    pub fn server_active(&self) -> bool {
        self.server.is_active()
    }

    /// True once the server has finished booting and accepts commands.
    pub fn server_ready(&self) -> bool {
        self.server.is_ready()
    }

    /// True while the supervisor wants the server up (it may be mid-restart).
    pub fn server_should_be_running(&self) -> bool {
        self.flags.should_be_running.load(Ordering::SeqCst)
    }

    /// True while a backup is in progress.
    pub fn is_backing_up(&self) -> bool {
        self.flags.is_backing_up.load(Ordering::SeqCst)
    }

    /// Seconds since the server was last spawned, or 0 when down.
    pub fn uptime(&self) -> u64 {
        if !self.server.is_active() {
            return 0;
        }
        unix_now().saturating_sub(self.started_at.load(Ordering::SeqCst))
    }

    /// The server's display name.
    pub fn server_name(&self) -> &str {
        &self.name
    }

    /// The query port from `server.properties`, for status probers.
    pub fn query_port(&self) -> Option<u16> {
        self.query_port
    }

    /// The server's message of the day, if set.
    pub fn motd(&self) -> Option<&str> {
        self.motd.as_deref()
    }

    /// Returns the console lines of the latest server session log.
    pub fn get_latest_log(&self) -> Result<Vec<String>> {
        let path = self.directory.join("logs").join("latest.log");
        let contents = std::fs::read_to_string(&path)
            .map_err(|_| Error::Other("No latest log found".to_string()))?;
        Ok(contents.lines().map(str::to_string).collect())
    }

    /// Registers a console listener; see [`ServerProcess::add_listener`].
    pub fn add_listener(&self, listener: Arc<dyn LogListener>) -> Result<ListenerId> {
        self.server.add_listener(listener)
    }

    /// Removes a console listener; see [`ServerProcess::remove_listener`].
    pub fn remove_listener(&self, id: ListenerId) -> Result<()> {
        self.server.remove_listener(id)
    }

    /// Creates an unregistered pull-style subscription to the console.
    pub fn log_subscription(&self) -> LogSubscription {
        LogSubscription::new(Arc::clone(&self.server))
    }

    /// Spawns the process and records the session start time.
    async fn spawn_server(&self) -> Result<()> {
        self.started_at.store(unix_now(), Ordering::SeqCst);
        self.server.start().await
    }

    /// Flags that must reset every time the server is launched.
    fn reset_session_flags(&self) {
        self.flags.sent_stop_signal.store(false, Ordering::SeqCst);
        self.flags.is_auto_restarting.store(false, Ordering::SeqCst);
    }

    /// Seconds until the next restart trigger, or `i64::MAX` when the
    /// policy is disabled (a disabled offset never rolls over, so it never
    /// fires).
    fn seconds_until_restart(&self) -> i64 {
        self.restart_schedule
            .as_ref()
            .map(|spec| seconds_until(spec, chrono::Local::now().naive_local()))
            .unwrap_or(i64::MAX)
    }

    /// Seconds until the next scheduled backup, or `i64::MAX` when disabled.
    fn seconds_until_backup(&self) -> i64 {
        self.backup_schedule
            .as_ref()
            .map(|spec| seconds_until(spec, chrono::Local::now().naive_local()))
            .unwrap_or(i64::MAX)
    }

    /// The supervising loop.
    ///
    /// Keeps the process alive per policy: polls it on a fixed tick,
    /// recomputes both schedule offsets each wake, fires the restart and
    /// backup triggers when an offset rolls over to its next occurrence,
    /// and decides after every process exit whether to respawn.
    async fn supervising_loop(&self) {
        while self.server_should_be_running() {
            let mut until_restart = self.seconds_until_restart();
            let mut until_backup = self.seconds_until_backup();

            while self.server.is_active() {
                tokio::time::sleep(POLL_INTERVAL).await;

                let new_until_restart = self.seconds_until_restart();
                if new_until_restart > until_restart {
                    // The offset grew: the target timestamp was just
                    // crossed and the schedule rolled to next week.
                    self.trigger_restart().await;
                } else if new_until_restart <= 60 && until_restart > 60 {
                    self.send_console("say Restarting in 60 seconds!").await;
                } else if new_until_restart <= 300 && until_restart > 300 {
                    self.send_console("say Restarting in 5 minutes.").await;
                } else if new_until_restart <= 900 && until_restart > 900 {
                    self.send_console("say Restarting in 15 minutes.").await;
                }
                until_restart = new_until_restart;

                let new_until_backup = self.seconds_until_backup();
                if new_until_backup > until_backup {
                    if let Err(e) = self.backup_world(None).await {
                        tracing::warn!(error = %e, "Scheduled backup failed");
                    }
                }
                until_backup = new_until_backup;
            }

            // The process exited. A backup may still be copying world data;
            // no restart decision is made until it finishes.
            while self.is_backing_up() {
                tokio::time::sleep(SETTLE_INTERVAL).await;
            }

            if self.flags.is_auto_restarting.load(Ordering::SeqCst) {
                self.notify("Automatically restarting");
                self.respawn().await;
            } else if self.config.restarts.restart_on_crash
                && !self.flags.sent_stop_signal.load(Ordering::SeqCst)
            {
                self.notify("Detected server crash: Restarting");
                self.respawn().await;
            } else {
                self.flags.should_be_running.store(false, Ordering::SeqCst);
            }
        }
    }

    /// Fires the scheduled restart, deferred while a backup is running.
    async fn trigger_restart(&self) {
        while self.is_backing_up() {
            tokio::time::sleep(SETTLE_INTERVAL).await;
        }
        self.send_console("say Restarting now!").await;
        self.flags.is_auto_restarting.store(true, Ordering::SeqCst);
        if let Err(e) = self.server.stop().await {
            tracing::warn!(error = %e, "Graceful stop for scheduled restart failed");
        }
    }

    /// Respawns the process after an automatic or crash restart.
    async fn respawn(&self) {
        self.reset_session_flags();
        if let Err(e) = self.spawn_server().await {
            tracing::error!(error = %e, "Respawn failed, shutting the supervisor down");
            self.notify(&format!("Failed to restart server: {}", e));
            self.flags.should_be_running.store(false, Ordering::SeqCst);
        }
    }

    /// Writes a console command from inside the supervising loop.
    ///
    /// Failures are logged and swallowed: the loop's job is to keep
    /// supervising regardless of transient command failures.
    async fn send_console(&self, command: &str) {
        if let Err(e) = self.server.write(command).await {
            tracing::warn!(error = %e, command = %command, "Console write from supervisor failed");
        }
    }

    /// Broadcasts a timestamped manager notification to all listeners.
    fn notify(&self, message: &str) {
        let stamped = format!(
            "[{}] [Manager]: {}",
            chrono::Local::now().format("%H:%M:%S"),
            message
        );
        self.server.notify_listeners(&stamped);
    }
}
