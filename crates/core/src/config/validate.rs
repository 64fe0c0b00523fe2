use regex_lite::Regex;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Transmission host is non-empty and port is not 0
/// - Connect retry count is at least 1
/// - Every override pattern compiles as a regex
/// - The three directories are distinct
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.transmission.host.is_empty() {
        return Err(ConfigError::ValidationError(
            "transmission.host cannot be empty".to_string(),
        ));
    }
    if config.transmission.port == 0 {
        return Err(ConfigError::ValidationError(
            "transmission.port cannot be 0".to_string(),
        ));
    }
    if config.transmission.connect_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "transmission.connect_attempts must be at least 1".to_string(),
        ));
    }

    for rule in &config.overrides {
        if Regex::new(&rule.pattern).is_err() {
            return Err(ConfigError::ValidationError(format!(
                "invalid override pattern: {}",
                rule.pattern
            )));
        }
        if rule.series.is_none() && rule.destination.is_none() {
            return Err(ConfigError::ValidationError(format!(
                "override '{}' sets neither series nor destination",
                rule.pattern
            )));
        }
    }

    let dirs = &config.directories;
    if dirs.seeding == dirs.destination
        || dirs.seeding == dirs.extracted
        || dirs.extracted == dirs.destination
    {
        return Err(ConfigError::ValidationError(
            "directories.seeding, directories.extracted and directories.destination must be distinct"
                .to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    fn valid_toml() -> String {
        r#"
[directories]
seeding = "/srv/seeding"
extracted = "/srv/extracted"
destination = "/srv/tv"

[transmission]
host = "localhost"
"#
        .to_string()
    }

    #[test]
    fn test_validate_valid_config() {
        let config = load_config_from_str(&valid_toml()).unwrap();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = load_config_from_str(&valid_toml()).unwrap();
        config.transmission.port = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_zero_attempts_fails() {
        let mut config = load_config_from_str(&valid_toml()).unwrap();
        config.transmission.connect_attempts = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_bad_override_pattern_fails() {
        let toml = format!(
            "{}\n[[overrides]]\npattern = '('\nseries = \"X\"\n",
            valid_toml()
        );
        let config = load_config_from_str(&toml).unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_empty_override_fails() {
        let toml = format!(
            "{}\n[[overrides]]\npattern = 'foo'\n",
            valid_toml()
        );
        let config = load_config_from_str(&toml).unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_same_directories_fails() {
        let mut config = load_config_from_str(&valid_toml()).unwrap();
        config.directories.destination = config.directories.seeding.clone();
        assert!(validate_config(&config).is_err());
    }
}
