use std::net::SocketAddr;
use std::path::PathBuf;

use ::config::{Config, ConfigError as BuilderError, Environment, File};
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_TUNNEL_COMMAND: &str = "ngrok";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServerSection {
    #[serde(default)]
    pub bind: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingSection {
    #[serde(default)]
    pub dir: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TunnelSection {
    #[serde(default)]
    pub command: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServerSettings {
    #[serde(default)]
    pub server: Option<ServerSection>,
    #[serde(default)]
    pub logging: Option<LoggingSection>,
    #[serde(default)]
    pub tunnel: Option<TunnelSection>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid socket address: {0}")]
    InvalidAddr(String),
    #[error("configuration load failed: {0}")]
    Load(#[from] BuilderError),
}

impl ServerSettings {
    /// `server.bind` wins; otherwise listen on all interfaces at `port`.
    pub fn bind_addr(&self, port: u16) -> Result<SocketAddr, ConfigError> {
        if let Some(bind) = self.server.as_ref().and_then(|server| server.bind.as_ref()) {
            return bind
                .parse()
                .map_err(|_| ConfigError::InvalidAddr(bind.clone()));
        }

        let fallback = format!("0.0.0.0:{port}");
        fallback
            .parse()
            .map_err(|_| ConfigError::InvalidAddr(fallback))
    }

    pub fn log_dir(&self) -> PathBuf {
        self.logging
            .as_ref()
            .and_then(|logging| logging.dir.as_deref())
            .unwrap_or(DEFAULT_LOG_DIR)
            .into()
    }

    pub fn tunnel_command(&self) -> &str {
        self.tunnel
            .as_ref()
            .and_then(|tunnel| tunnel.command.as_deref())
            .unwrap_or(DEFAULT_TUNNEL_COMMAND)
    }
}

pub fn load_server_settings() -> Result<ServerSettings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name(DEFAULT_CONFIG_PATH).required(false));

    builder = builder.add_source(Environment::with_prefix("VOICEHOOK").separator("__"));

    let settings: ServerSettings = builder.build()?.try_deserialize()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_falls_back_to_port() {
        let settings = ServerSettings::default();
        let addr = settings.bind_addr(4000).unwrap();
        assert_eq!(addr, "0.0.0.0:4000".parse().unwrap());
        assert_eq!(settings.log_dir(), PathBuf::from("logs"));
        assert_eq!(settings.tunnel_command(), "ngrok");
    }

    #[test]
    fn explicit_bind_wins_over_port() {
        let settings = ServerSettings {
            server: Some(ServerSection {
                bind: Some("127.0.0.1:9000".into()),
            }),
            ..ServerSettings::default()
        };
        assert_eq!(
            settings.bind_addr(4000).unwrap(),
            "127.0.0.1:9000".parse().unwrap()
        );
    }

    #[test]
    fn invalid_bind_is_reported() {
        let settings = ServerSettings {
            server: Some(ServerSection {
                bind: Some("localhost".into()),
            }),
            ..ServerSettings::default()
        };
        assert!(matches!(
            settings.bind_addr(4000),
            Err(ConfigError::InvalidAddr(addr)) if addr == "localhost"
        ));
    }
}
