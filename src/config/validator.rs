use crate::config::Config;
use crate::error::{Error, Result};
use crate::schedule::ScheduleSpec;

/// Validates the launch settings.
pub fn validate_server_config(config: &Config) -> Result<()> {
    if config.server.command.is_empty() {
        return Err(Error::ConfigValidation(
            "Server launch command is empty".to_string(),
        ));
    }
    if config.server.jar.is_empty() {
        return Err(Error::ConfigValidation(
            "Server jar name is empty".to_string(),
        ));
    }
    if config.server.directory.is_empty() {
        return Err(Error::ConfigValidation(
            "Server directory is empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates the restart and backup policies.
///
/// A policy that is enabled with a schedule present must have a parseable
/// schedule; a typo here should fail at startup, not silently never fire.
/// An absent schedule merely disables the policy.
pub fn validate_policies(config: &Config) -> Result<()> {
    if config.restarts.autorestart {
        if let Some(spec) = &config.restarts.schedule {
            ScheduleSpec::parse(spec)?;
        }
    }
    if config.backups.enabled {
        if let Some(spec) = &config.backups.schedule {
            ScheduleSpec::parse(spec)?;
        }
    }
    if config.backups.folder.is_empty() {
        return Err(Error::ConfigValidation(
            "Backup folder name is empty".to_string(),
        ));
    }
    Ok(())
}

/// Full configuration validation.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_server_config(config)?;
    validate_policies(config)?;
    Ok(())
}
