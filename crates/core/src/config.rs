use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";
const DEFAULT_SCHEMA: &str = "voicehook";
const DEFAULT_PORT: u16 = 4000;
const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_TRELLO_API_BASE: &str = "https://api.trello.com";
const DEFAULT_OUTBOUND_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_schema")]
    pub schema: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MailConfig {
    pub user: String,
    pub password: String,
    pub recipient: String,
    pub smtp_host: String,
    pub smtp_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrelloCredentials {
    pub token: String,
    pub key: String,
    pub id_list: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: Option<DatabaseConfig>,
    pub mail: Option<MailConfig>,
    pub trello: Option<TrelloCredentials>,
    #[serde(default = "default_trello_api_base")]
    pub trello_api_base: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub enable_tunnel: bool,
    #[serde(default = "default_outbound_timeout_secs")]
    pub outbound_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: None,
            mail: None,
            trello: None,
            trello_api_base: default_trello_api_base(),
            port: default_port(),
            enable_tunnel: false,
            outbound_timeout_secs: default_outbound_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Load `.env` files, then build configuration from well-known environment variables.
    pub fn load_from_env() -> Result<Self> {
        preload_env_files();
        Self::from_env()
    }

    /// Build configuration from the current process environment only.
    pub fn from_env() -> Result<Self> {
        let database = match env_var_non_empty("DATABASE_URL")
            .or_else(|_| env_var_non_empty("MONGODB_URI"))
        {
            Ok(url) => Some(DatabaseConfig {
                url,
                schema: env_var_non_empty("DATABASE_SCHEMA").unwrap_or_else(|_| default_schema()),
            }),
            Err(_) => load_database_from_file(),
        };

        let mail = match (
            env_var_non_empty("EMAIL_USER"),
            env_var_non_empty("EMAIL_PASS"),
            env_var_non_empty("EMAIL_RECIPIENT"),
        ) {
            (Ok(user), Ok(password), Ok(recipient)) => Some(MailConfig {
                user,
                password,
                recipient,
                smtp_host: env_var_non_empty("SMTP_HOST")
                    .unwrap_or_else(|_| DEFAULT_SMTP_HOST.to_string()),
                smtp_port: parse_var("SMTP_PORT")?.unwrap_or(DEFAULT_SMTP_PORT),
            }),
            _ => None,
        };

        let trello = match (
            env_var_non_empty("TRELLO_TOKEN"),
            env_var_non_empty("TRELLO_KEY"),
            env_var_non_empty("TRELLO_ID_LIST"),
        ) {
            (Ok(token), Ok(key), Ok(id_list)) => Some(TrelloCredentials {
                token,
                key,
                id_list,
            }),
            _ => None,
        };

        let trello_api_base =
            env_var_non_empty("TRELLO_API_BASE").unwrap_or_else(|_| default_trello_api_base());

        Ok(Self {
            database,
            mail,
            trello,
            trello_api_base,
            port: parse_var("PORT")?.unwrap_or(DEFAULT_PORT),
            enable_tunnel: env_var_non_empty("ENABLE_NGROK")
                .map(|value| value.trim() == "true")
                .unwrap_or(false),
            outbound_timeout_secs: parse_var("OUTBOUND_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_OUTBOUND_TIMEOUT_SECS),
        })
    }

    pub fn require_trello(&self) -> Result<&TrelloCredentials> {
        self.trello.as_ref().context(
            "Trello configuration is missing. Please check your .env file (TRELLO_TOKEN, TRELLO_KEY, TRELLO_ID_LIST).",
        )
    }

    pub fn outbound_timeout(&self) -> Duration {
        Duration::from_secs(self.outbound_timeout_secs)
    }
}

fn env_var_non_empty(key: &str) -> Result<String, env::VarError> {
    let value = env::var(key)?;
    if value.trim().is_empty() {
        return Err(env::VarError::NotPresent);
    }
    Ok(value)
}

fn parse_var<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env_var_non_empty(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("{key} has an invalid value `{raw}`")),
        Err(_) => Ok(None),
    }
}

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_trello_api_base() -> String {
    DEFAULT_TRELLO_API_BASE.to_string()
}

fn default_outbound_timeout_secs() -> u64 {
    DEFAULT_OUTBOUND_TIMEOUT_SECS
}

fn load_database_from_file() -> Option<DatabaseConfig> {
    #[derive(Debug, Deserialize)]
    struct DbSection {
        url: Option<String>,
        schema: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    struct FileConfig {
        db: Option<DbSection>,
    }

    let config_path =
        env::var("VOICEHOOK_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut path = PathBuf::from(&config_path);
    if !path.is_absolute() {
        if let Ok(current_dir) = env::current_dir() {
            path = current_dir.join(path);
        }
    }

    let contents = fs::read_to_string(&path).ok()?;
    let config: FileConfig = serde_yaml::from_str(&contents).ok()?;
    let section = config.db?;
    let url = non_empty(section.url)?;
    info!(path = %path.display(), "loaded database configuration from file");

    Some(DatabaseConfig {
        url,
        schema: non_empty(section.schema).unwrap_or_else(default_schema),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn preload_env_files() {
    // .env in the working directory wins, then the workspace root
    let _ = dotenv();

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let candidate_files = [manifest_dir.join(".env"), manifest_dir.join("../../.env")];

    for path in candidate_files {
        load_env_file(&path);
    }
}

fn load_env_file(path: &Path) {
    if path.exists() {
        if let Err(err) = dotenvy::from_path(path) {
            debug!(path = %path.display(), %err, "skipping unreadable env file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "DATABASE_URL",
        "MONGODB_URI",
        "DATABASE_SCHEMA",
        "EMAIL_USER",
        "EMAIL_PASS",
        "EMAIL_RECIPIENT",
        "SMTP_HOST",
        "SMTP_PORT",
        "TRELLO_TOKEN",
        "TRELLO_KEY",
        "TRELLO_ID_LIST",
        "TRELLO_API_BASE",
        "PORT",
        "ENABLE_NGROK",
        "OUTBOUND_TIMEOUT_SECS",
        "VOICEHOOK_CONFIG_PATH",
    ];

    fn clear_env() {
        for key in KEYS {
            env::remove_var(key);
        }
        env::set_var("VOICEHOOK_CONFIG_PATH", "/nonexistent/voicehook.yaml");
    }

    #[test]
    #[serial]
    fn defaults_apply_when_environment_is_empty() {
        clear_env();
        let config = AppConfig::from_env().unwrap();
        assert!(config.database.is_none());
        assert!(config.mail.is_none());
        assert!(config.trello.is_none());
        assert_eq!(config.port, 4000);
        assert!(!config.enable_tunnel);
        assert_eq!(config.trello_api_base, "https://api.trello.com");
        assert_eq!(config.outbound_timeout(), Duration::from_secs(10));
    }

    #[test]
    #[serial]
    fn partial_trello_credentials_are_treated_as_missing() {
        clear_env();
        env::set_var("TRELLO_TOKEN", "token");
        env::set_var("TRELLO_KEY", "key");
        env::set_var("TRELLO_ID_LIST", "   ");
        let config = AppConfig::from_env().unwrap();
        assert!(config.trello.is_none());
        assert!(config.require_trello().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn full_environment_is_loaded() {
        clear_env();
        env::set_var("MONGODB_URI", "postgres://localhost/tasks");
        env::set_var("EMAIL_USER", "bot@example.com");
        env::set_var("EMAIL_PASS", "secret");
        env::set_var("EMAIL_RECIPIENT", "ops@example.com");
        env::set_var("TRELLO_TOKEN", "token");
        env::set_var("TRELLO_KEY", "key");
        env::set_var("TRELLO_ID_LIST", "list");
        env::set_var("PORT", "8080");
        env::set_var("ENABLE_NGROK", "true");

        let config = AppConfig::from_env().unwrap();
        let database = config.database.as_ref().unwrap();
        assert_eq!(database.url, "postgres://localhost/tasks");
        assert_eq!(database.schema, "voicehook");
        let mail = config.mail.as_ref().unwrap();
        assert_eq!(mail.smtp_host, "smtp.gmail.com");
        assert_eq!(mail.smtp_port, 587);
        assert_eq!(config.require_trello().unwrap().id_list, "list");
        assert_eq!(config.port, 8080);
        assert!(config.enable_tunnel);
        clear_env();
    }

    #[test]
    #[serial]
    fn invalid_port_is_an_error() {
        clear_env();
        env::set_var("PORT", "not-a-port");
        assert!(AppConfig::from_env().is_err());
        clear_env();
    }
}
