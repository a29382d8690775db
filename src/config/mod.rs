//! Configuration module for worldsmith.
//!
//! This module handles parsing, validation, and access to configuration
//! settings for the supervised server. The supervisor's own settings load
//! from a JSON file or string; the server's `server.properties` is read
//! separately for world directory names and the query port.
//!
//! # Examples
//!
//! Loading a configuration from a file:
//!
//! ```no_run
//! use worldsmith::config::Config;
//!
//! let config = Config::from_file("worldsmith.json").unwrap();
//! println!("Supervising {}", config.server.jar);
//! ```
//!
//! Creating a configuration programmatically:
//!
//! ```
//! use worldsmith::config::{Config, ServerConfig, RestartConfig, BackupConfig};
//!
//! let config = Config {
//!     server: ServerConfig {
//!         command: "java".to_string(),
//!         args: vec!["-Xmx2G".to_string()],
//!         jar: "server.jar".to_string(),
//!         directory: "/srv/minecraft".to_string(),
//!         name: None,
//!     },
//!     restarts: RestartConfig::default(),
//!     backups: BackupConfig::default(),
//! };
//! ```
mod parser;
mod properties;
pub mod validator;

pub use parser::{BackupConfig, Config, RestartConfig, ServerConfig};
pub use properties::ServerProperties;
pub use validator::validate_config;
