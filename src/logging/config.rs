use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

/// Settings read before anything else so startup errors are logged.
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    pub environment: String,
    pub level: LogLevel,
    pub directory: PathBuf,
}

impl LogConfig {
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unparseable LOG_LEVEL values fall back to the environment default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());
        let default_level = if environment == "production" {
            LogLevel::Info
        } else {
            LogLevel::Debug
        };
        let level = lookup("LOG_LEVEL")
            .and_then(|s| s.parse().ok())
            .unwrap_or(default_level);
        let directory = lookup("LOG_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("logs"));

        Self {
            environment,
            level,
            directory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_for_development() {
        let config = LogConfig::from_lookup(lookup(&[]));
        assert_eq!(config.environment, "development");
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.directory, PathBuf::from("logs"));
        assert!(!config.is_production());
    }

    #[test]
    fn test_production_defaults_to_info() {
        let config = LogConfig::from_lookup(lookup(&[("ENVIRONMENT", "production")]));
        assert_eq!(config.level, LogLevel::Info);
        assert!(config.is_production());
    }

    #[test]
    fn test_explicit_level_and_directory() {
        let config = LogConfig::from_lookup(lookup(&[
            ("LOG_LEVEL", "WARN"),
            ("LOG_DIR", "/var/log/hvac"),
        ]));
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.directory, PathBuf::from("/var/log/hvac"));
    }

    #[test]
    fn test_bad_level_falls_back() {
        let config = LogConfig::from_lookup(lookup(&[("LOG_LEVEL", "loud")]));
        assert_eq!(config.level, LogLevel::Debug);
    }
}
