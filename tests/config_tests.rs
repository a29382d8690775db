use worldsmith::config::{Config, ServerProperties, validate_config};
use worldsmith::error::Result;

#[test]
fn test_parse_config() -> Result<()> {
    let config_str = r#"{
        "server": {
            "command": "java",
            "args": ["-Xmx2G", "-Xms1G"],
            "jar": "server.jar",
            "directory": "/srv/minecraft",
            "name": "survival"
        },
        "restarts": {
            "autorestart": true,
            "schedule": "MWF 0300",
            "restartOnCrash": true
        },
        "backups": {
            "enabled": true,
            "maxBackups": 5,
            "schedule": "D 0400",
            "folder": "world_backups"
        }
    }"#;

    let config = Config::parse_from_str(config_str)?;

    assert_eq!(config.server.command, "java");
    assert_eq!(config.server.args, vec!["-Xmx2G", "-Xms1G"]);
    assert_eq!(config.server.jar, "server.jar");
    assert_eq!(config.server.name.as_deref(), Some("survival"));

    assert!(config.restarts.autorestart);
    assert_eq!(config.restarts.schedule.as_deref(), Some("MWF 0300"));
    assert!(config.restarts.restart_on_crash);

    assert!(config.backups.enabled);
    assert_eq!(config.backups.max_backups, 5);
    assert_eq!(config.backups.schedule.as_deref(), Some("D 0400"));
    assert_eq!(config.backups.folder, "world_backups");

    validate_config(&config)?;
    Ok(())
}

#[test]
fn test_parse_config_defaults() -> Result<()> {
    // Policies default to disabled when their sections are omitted.
    let config_str = r#"{
        "server": {
            "command": "java",
            "jar": "server.jar",
            "directory": "/srv/minecraft"
        }
    }"#;

    let config = Config::parse_from_str(config_str)?;

    assert!(config.server.args.is_empty());
    assert!(config.server.name.is_none());
    assert!(!config.restarts.autorestart);
    assert!(!config.restarts.restart_on_crash);
    assert!(config.restarts.schedule.is_none());
    assert!(!config.backups.enabled);
    assert_eq!(config.backups.max_backups, 0);
    assert_eq!(config.backups.folder, "backups");

    validate_config(&config)?;
    Ok(())
}

#[test]
fn test_parse_config_rejects_malformed_json() {
    assert!(Config::parse_from_str("not json").is_err());
    assert!(Config::parse_from_str(r#"{"server": {}}"#).is_err());
}

#[test]
fn test_validate_config_rejects_bad_values() -> Result<()> {
    let mut config = Config::parse_from_str(
        r#"{
        "server": {
            "command": "java",
            "jar": "server.jar",
            "directory": "/srv/minecraft"
        }
    }"#,
    )?;

    config.server.command = String::new();
    assert!(validate_config(&config).is_err());
    config.server.command = "java".to_string();

    // A typo in an enabled policy's schedule fails at startup rather than
    // silently never firing.
    config.restarts.autorestart = true;
    config.restarts.schedule = Some("XYZ 9999".to_string());
    assert!(validate_config(&config).is_err());

    // An absent schedule merely disables the policy.
    config.restarts.schedule = None;
    validate_config(&config)?;

    config.backups.enabled = true;
    config.backups.schedule = Some("M 03".to_string());
    assert!(validate_config(&config).is_err());

    config.backups.schedule = Some("M 0300".to_string());
    config.backups.folder = String::new();
    assert!(validate_config(&config).is_err());

    Ok(())
}

#[test]
fn test_server_properties_parsing() {
    let properties = ServerProperties::parse(
        "#Minecraft server properties\n\
         #Mon Jan 01 00:00:00 UTC 2024\n\
         level-name=world\n\
         motd=A Minecraft Server\n\
         server-port=25565\n\
         query.port=25585\n",
    );

    assert_eq!(properties.get("level-name"), Some("world"));
    assert_eq!(properties.level_names(), vec!["world"]);
    assert_eq!(properties.motd(), Some("A Minecraft Server"));
    assert_eq!(properties.query_port(), Some(25585));
}

#[test]
fn test_server_properties_port_falls_back_to_server_port() {
    let properties = ServerProperties::parse("server-port=25565\n");
    assert_eq!(properties.query_port(), Some(25565));

    let properties = ServerProperties::parse("");
    assert_eq!(properties.query_port(), None);
}

#[test]
fn test_server_properties_multiple_worlds() {
    let properties = ServerProperties::parse("level-name=world, world_nether ,world_the_end\n");
    assert_eq!(
        properties.level_names(),
        vec!["world", "world_nether", "world_the_end"]
    );
}

#[test]
fn test_server_properties_default_world() {
    let properties = ServerProperties::parse("motd=hi\n");
    assert_eq!(properties.level_names(), vec!["world"]);
}

#[test]
fn test_server_properties_load_missing_file() {
    assert!(ServerProperties::load("/nonexistent/server.properties").is_err());
}
