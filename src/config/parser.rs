use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Launch settings for the managed server process.
///
/// # Examples
///
/// ```
/// use worldsmith::config::ServerConfig;
///
/// let server_config = ServerConfig {
///     command: "java".to_string(),
///     args: vec!["-Xmx2G".to_string()],
///     jar: "server.jar".to_string(),
///     directory: "/srv/minecraft".to_string(),
///     name: None,
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Executable used to launch the server, e.g. `java`.
    /// This can be an absolute path or a command available in the PATH.
    pub command: String,

    /// Launch arguments inserted before the jar, e.g. `-Xmx2G`.
    #[serde(default)]
    pub args: Vec<String>,

    /// The server jar inside the server directory.
    pub jar: String,

    /// Working directory containing the jar and `server.properties`.
    pub directory: String,

    /// Display name of the server. Falls back to the directory basename
    /// when absent.
    #[serde(default)]
    pub name: Option<String>,
}

/// Restart policy settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestartConfig {
    /// Enables the weekly scheduled restart.
    #[serde(default)]
    pub autorestart: bool,

    /// Schedule string such as `MWF 0300`. Absent disables the policy even
    /// when `autorestart` is set.
    #[serde(default)]
    pub schedule: Option<String>,

    /// Respawn the process when it exits without a stop having been
    /// requested.
    #[serde(default, rename = "restartOnCrash")]
    pub restart_on_crash: bool,
}

/// Backup policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Enables the weekly scheduled backup.
    #[serde(default)]
    pub enabled: bool,

    /// Maximum number of auto-named backups kept before rotation evicts
    /// the oldest. Zero disables rotation. Manually named backups are
    /// never counted or evicted.
    #[serde(default, rename = "maxBackups")]
    pub max_backups: u32,

    /// Schedule string such as `D 0400`. Absent disables the scheduled
    /// backup; on-demand backups still work.
    #[serde(default)]
    pub schedule: Option<String>,

    /// Backup root directory name, resolved under the server directory.
    #[serde(default = "default_backup_folder")]
    pub folder: String,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_backups: 0,
            schedule: None,
            folder: default_backup_folder(),
        }
    }
}

fn default_backup_folder() -> String {
    "backups".to_string()
}

/// Main configuration for the supervisor.
///
/// # JSON Schema
///
/// ```json
/// {
///   "server": {
///     "command": "java",
///     "args": ["-Xmx2G"],
///     "jar": "server.jar",
///     "directory": "/srv/minecraft"
///   },
///   "restarts": {
///     "autorestart": true,
///     "schedule": "MWF 0300",
///     "restartOnCrash": true
///   },
///   "backups": {
///     "enabled": true,
///     "maxBackups": 5,
///     "schedule": "D 0400",
///     "folder": "backups"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Launch settings for the managed process.
    pub server: ServerConfig,

    /// Restart policy. Defaults to everything disabled.
    #[serde(default)]
    pub restarts: RestartConfig,

    /// Backup policy. Defaults to disabled with a `backups` folder.
    #[serde(default)]
    pub backups: BackupConfig,
}

impl Config {
    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigParse`] when the file cannot be read or does
    /// not parse as a valid configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigParse(format!(
                "Failed to read config file {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;
        Self::parse_from_str(&contents)
    }

    /// Parses a configuration from a JSON string.
    pub fn parse_from_str(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).map_err(|e| Error::ConfigParse(e.to_string()))
    }
}
