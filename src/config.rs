//! Application configuration read from the environment.

use std::net::SocketAddr;

use chrono::Duration;
use url::Url;

use crate::db::DbConfig;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Hosted OpenID Connect provider settings.
#[derive(Debug, Clone, PartialEq)]
pub struct OidcConfig {
    pub issuer: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub authorize_url: Url,
    pub token_url: Url,
    pub end_session_url: Option<Url>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthMode {
    /// Username/password accounts stored in `admin_users`.
    Local,
    Hosted(OidcConfig),
}

/// Local admin created at startup when no account with that username exists.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminSeed {
    pub username: String,
    pub password: AdminSeedPassword,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdminSeedPassword {
    Plain(String),
    /// Already a bcrypt hash.
    Hash(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub database: Option<DbConfig>,
    pub allowed_origins: Vec<String>,
    pub auth: AuthMode,
    pub session_ttl: Duration,
    pub secure_cookies: bool,
    pub admin_seed: Option<AdminSeed>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3001,
            database: None,
            allowed_origins: default_origins(),
            auth: AuthMode::Local,
            session_ttl: Duration::hours(168),
            secure_cookies: false,
            admin_seed: None,
        }
    }
}

fn default_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        }),
    }
}

/// Wraps an env lookup with the parse helpers every setting needs.
struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn require(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key).ok_or(ConfigError::Missing(key))
    }

    fn parsed<T: std::str::FromStr>(&self, key: &'static str) -> Result<Option<T>, ConfigError> {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::Invalid { key, value: raw }),
            None => Ok(None),
        }
    }

    fn url(&self, key: &'static str) -> Result<Option<Url>, ConfigError> {
        match self.get(key) {
            Some(raw) => Url::parse(raw.trim())
                .map(Some)
                .map_err(|_| ConfigError::Invalid { key, value: raw }),
            None => Ok(None),
        }
    }

    fn require_url(&self, key: &'static str) -> Result<Url, ConfigError> {
        self.url(key)?.ok_or(ConfigError::Missing(key))
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env { lookup };
        let defaults = Self::default();

        let environment = env.get("ENVIRONMENT").unwrap_or(defaults.environment);
        let is_production = environment == "production";

        let database = match env.get("DATABASE_URL") {
            Some(url) => {
                let mut db = DbConfig::new(url);
                if let Some(v) = env.parsed("DB_POOL_MAX")? {
                    db.max_connections = v;
                }
                if let Some(v) = env.parsed("DB_POOL_MIN")? {
                    db.min_connections = v;
                }
                if let Some(v) = env.parsed("DB_CONNECT_TIMEOUT")? {
                    db.connect_timeout_secs = v;
                }
                if let Some(v) = env.parsed("DB_IDLE_TIMEOUT")? {
                    db.idle_timeout_secs = v;
                }
                Some(db)
            }
            None => None,
        };

        let allowed_origins = env
            .get("ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .or_else(|| env.get("FRONTEND_ORIGIN").map(|o| vec![o.trim().to_string()]))
            .unwrap_or(defaults.allowed_origins);

        let auth = match env.get("AUTH_MODE").as_deref().map(str::trim) {
            None | Some("local") => AuthMode::Local,
            Some("hosted") => AuthMode::Hosted(OidcConfig {
                issuer: env.require("OIDC_ISSUER")?,
                client_id: env.require("OIDC_CLIENT_ID")?,
                client_secret: env.require("OIDC_CLIENT_SECRET")?,
                redirect_uri: env.require("OIDC_REDIRECT_URI")?,
                authorize_url: env.require_url("OIDC_AUTHORIZE_URL")?,
                token_url: env.require_url("OIDC_TOKEN_URL")?,
                end_session_url: env.url("OIDC_END_SESSION_URL")?,
            }),
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "AUTH_MODE",
                    value: other.to_string(),
                })
            }
        };

        let ttl_hours: i64 = env.parsed("SESSION_TTL_HOURS")?.unwrap_or(168);
        if ttl_hours <= 0 {
            return Err(ConfigError::Invalid {
                key: "SESSION_TTL_HOURS",
                value: ttl_hours.to_string(),
            });
        }

        let secure_cookies = match env.get("SECURE_COOKIES") {
            Some(raw) => parse_bool("SECURE_COOKIES", &raw)?,
            None => is_production,
        };

        let admin_seed = match env.get("ADMIN_USERNAME") {
            Some(username) => {
                let password = match (env.get("ADMIN_PASSWORD_HASH"), env.get("ADMIN_PASSWORD")) {
                    (Some(hash), _) => AdminSeedPassword::Hash(hash),
                    (None, Some(plain)) => AdminSeedPassword::Plain(plain),
                    (None, None) => return Err(ConfigError::Missing("ADMIN_PASSWORD")),
                };
                Some(AdminSeed {
                    username,
                    password,
                    email: env.get("ADMIN_EMAIL"),
                })
            }
            None => None,
        };

        Ok(Self {
            environment,
            host: env.get("HOST").unwrap_or(defaults.host),
            port: env.parsed("PORT")?.unwrap_or(defaults.port),
            database,
            allowed_origins,
            auth,
            session_ttl: Duration::hours(ttl_hours),
            secure_cookies,
            admin_seed,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| ConfigError::Invalid {
            key: "HOST",
            value: raw,
        })
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

    const HOSTED: &[(&str, &str)] = &[
        ("AUTH_MODE", "hosted"),
        ("OIDC_ISSUER", "https://id.example.com"),
        ("OIDC_CLIENT_ID", "site"),
        ("OIDC_CLIENT_SECRET", "shh"),
        ("OIDC_REDIRECT_URI", "https://hvac.example.com/api/callback"),
        ("OIDC_AUTHORIZE_URL", "https://id.example.com/authorize"),
        ("OIDC_TOKEN_URL", "https://id.example.com/token"),
    ];

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.socket_addr().unwrap().port(), 3001);
        assert_eq!(config.session_ttl, Duration::days(7));
    }

    #[test]
    fn test_database_pool_settings() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/hvac"),
            ("DB_POOL_MAX", "25"),
        ]))
        .unwrap();
        let db = config.database.unwrap();
        assert_eq!(db.max_connections, 25);
        assert_eq!(db.min_connections, 2);
    }

    #[test]
    fn test_invalid_number_is_reported() {
        let err = AppConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "PORT",
                value: "eighty".into()
            }
        );
    }

    #[test]
    fn test_origins_prefer_allowed_list() {
        let config = AppConfig::from_lookup(lookup(&[
            ("ALLOWED_ORIGINS", "https://a.example, https://b.example"),
            ("FRONTEND_ORIGIN", "https://ignored.example"),
        ]))
        .unwrap();
        assert_eq!(
            config.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );

        let config =
            AppConfig::from_lookup(lookup(&[("FRONTEND_ORIGIN", "https://site.example")])).unwrap();
        assert_eq!(config.allowed_origins, vec!["https://site.example"]);
    }

    #[test]
    fn test_secure_cookies_default_follows_environment() {
        let config = AppConfig::from_lookup(lookup(&[("ENVIRONMENT", "production")])).unwrap();
        assert!(config.secure_cookies);

        let config = AppConfig::from_lookup(lookup(&[
            ("ENVIRONMENT", "production"),
            ("SECURE_COOKIES", "false"),
        ]))
        .unwrap();
        assert!(!config.secure_cookies);
    }

    #[test]
    fn test_hosted_mode_reads_provider_settings() {
        let config = AppConfig::from_lookup(lookup(HOSTED)).unwrap();
        match config.auth {
            AuthMode::Hosted(oidc) => {
                assert_eq!(oidc.client_id, "site");
                assert!(oidc.end_session_url.is_none());
            }
            AuthMode::Local => panic!("expected hosted mode"),
        }
    }

    #[test]
    fn test_hosted_mode_missing_setting_is_error() {
        let partial: Vec<(&str, &str)> = HOSTED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "OIDC_TOKEN_URL")
            .collect();
        let err = AppConfig::from_lookup(lookup(&partial)).unwrap_err();
        assert_eq!(err, ConfigError::Missing("OIDC_TOKEN_URL"));
    }

    #[test]
    fn test_unknown_auth_mode_rejected() {
        assert!(AppConfig::from_lookup(lookup(&[("AUTH_MODE", "saml")])).is_err());
    }

    #[test]
    fn test_admin_seed_prefers_hash() {
        let config = AppConfig::from_lookup(lookup(&[
            ("ADMIN_USERNAME", "owner"),
            ("ADMIN_PASSWORD", "plain"),
            ("ADMIN_PASSWORD_HASH", "$2b$12$abc"),
        ]))
        .unwrap();
        let seed = config.admin_seed.unwrap();
        assert_eq!(seed.password, AdminSeedPassword::Hash("$2b$12$abc".into()));

        let err = AppConfig::from_lookup(lookup(&[("ADMIN_USERNAME", "owner")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("ADMIN_PASSWORD"));
    }
}
