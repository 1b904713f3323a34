use std::env;
use serde::Deserialize;
use crate::error::ConfigError;
use crate::funcs::datetime::Zone;


/// Environment variable overriding [`Config::default_timezone`].
pub const TIMEZONE_VAR: &str = "GOTMPL_TIMEZONE";

/// Zone used when a datetime function receives no explicit zone.
pub const DEFAULT_TIMEZONE: &str = "Europe/Stockholm";


/// Settings the function library is built from.
///
/// `default_timezone` accepts anything a template may pass as a zone
/// argument: a zone database name (`America/New_York`) or a numeric offset
/// (`UTC+2`, `-0800`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_timezone: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_timezone: DEFAULT_TIMEZONE.to_owned(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        match env::var(TIMEZONE_VAR) {
            Ok(zone) if !zone.trim().is_empty() => Config {
                default_timezone: zone.trim().to_owned(),
            },
            _ => Config::default(),
        }
    }

    pub fn with_timezone(mut self, zone: &str) -> Self {
        self.default_timezone = zone.trim().to_owned();
        self
    }

    pub(crate) fn default_zone(&self) -> Result<Zone, ConfigError> {
        Zone::resolve(&self.default_timezone).ok_or_else(
            || ConfigError::UnknownTimezone(self.default_timezone.clone())
        )
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_zone_resolves() {
        assert!(Config::default().default_zone().is_ok());
    }

    #[test]
    fn offset_zone_resolves() {
        let config = Config::default().with_timezone("UTC+2");
        assert!(config.default_zone().is_ok());
    }

    #[test]
    fn unknown_zone_is_rejected() {
        let config = Config::default().with_timezone("Mars/Olympus");
        assert!(matches!(
            config.default_zone(),
            Err(ConfigError::UnknownTimezone(zone)) if zone == "Mars/Olympus"
        ));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        let config: Config = serde_yaml::from_str("default_timezone: UTC").unwrap();
        assert_eq!(config.default_timezone, "UTC");
    }
}
