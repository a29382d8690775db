use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::Path;

/// Parsed view of the server's own `server.properties` file.
///
/// The supervisor reads this once at construction to learn the world
/// directory names and the query port it exposes to status probers. The
/// file is written by the server itself, so absence means the server has
/// never been run in that directory.
#[derive(Debug, Clone)]
pub struct ServerProperties {
    entries: HashMap<String, String>,
}

impl ServerProperties {
    /// Loads and parses a `server.properties` file.
    ///
    /// Lines are `key=value` pairs; `#` comment lines and blanks are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] when the file cannot be read,
    /// since a server directory without properties has never hosted a
    /// server run.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|_| {
            Error::ConfigValidation(format!(
                "Could not read {:?}: run the server once before supervising it",
                path.as_ref()
            ))
        })?;
        Ok(Self::parse(&contents))
    }

    /// Parses properties from a string.
    pub fn parse(contents: &str) -> Self {
        let mut entries = HashMap::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                entries.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        Self { entries }
    }

    /// Returns the raw value for a key, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|v| v.as_str())
    }

    /// World directory names from `level-name`.
    ///
    /// Comma-separated lists are accepted for servers that maintain several
    /// world directories. Defaults to `world` when the key is absent.
    pub fn level_names(&self) -> Vec<String> {
        self.get("level-name")
            .unwrap_or("world")
            .split(',')
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect()
    }

    /// The query port exposed to status probers, falling back from
    /// `query.port` to `server-port`.
    pub fn query_port(&self) -> Option<u16> {
        self.get("query.port")
            .or_else(|| self.get("server-port"))
            .and_then(|port| port.parse().ok())
    }

    /// The server's message of the day.
    pub fn motd(&self) -> Option<&str> {
        self.get("motd")
    }
}
