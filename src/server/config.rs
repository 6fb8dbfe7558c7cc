use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::accounting::parser::InterfaceStatsLayout;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path:?}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("Failed to parse TOML from config file at {path:?}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
    #[error("Failed to load config from environment: {0}")]
    Env(#[from] envy::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_address: String,
    pub data_dir: String,
    pub state_file: String,
    pub log_dir: String,
    pub poll_interval_seconds: u64,

    pub router_host: String,
    pub router_port: u16,
    pub router_username: String,
    pub router_password: Option<String>,
    pub router_command: String,
    pub router_timeout_seconds: u64,
    pub wan_interfaces: Vec<String>,
    pub rx_field: usize,
    pub tx_field: usize,

    pub dish_host: String,
    pub dish_path: String,
    pub dish_timeout_seconds: u64,

    pub system_stats: bool,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    listen_address: Option<String>,
    data_dir: Option<String>,
    state_file: Option<String>,
    log_dir: Option<String>,
    poll_interval_seconds: Option<u64>,
    router_host: Option<String>,
    router_port: Option<u16>,
    router_username: Option<String>,
    router_password: Option<String>,
    router_command: Option<String>,
    router_timeout_seconds: Option<u64>,
    wan_interfaces: Option<Vec<String>>,
    rx_field: Option<usize>,
    tx_field: Option<usize>,
    dish_host: Option<String>,
    dish_path: Option<String>,
    dish_timeout_seconds: Option<u64>,
    system_stats: Option<bool>,
}

// Variable names used by earlier deployments.
#[derive(Deserialize, Default, Debug)]
struct LegacyEnv {
    asus_host: Option<String>,
    asus_user: Option<String>,
    asus_pass: Option<String>,
    starlink_host: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let layout = InterfaceStatsLayout::default();
        Self {
            listen_address: "0.0.0.0:3001".to_string(),
            data_dir: "data".to_string(),
            state_file: "usage-history.json".to_string(),
            log_dir: "logs".to_string(),
            poll_interval_seconds: 60,
            router_host: "192.168.50.1".to_string(),
            router_port: 22,
            router_username: "admin".to_string(),
            router_password: None,
            router_command: "cat /proc/net/dev".to_string(),
            router_timeout_seconds: 15,
            wan_interfaces: layout.interfaces,
            rx_field: layout.rx_field,
            tx_field: layout.tx_field,
            dish_host: "192.168.100.1".to_string(),
            dish_path: "/support/debug".to_string(),
            dish_timeout_seconds: 5,
            system_stats: true,
        }
    }
}

impl ServerConfig {
    /// Defaults, then the TOML file, then `.env` and process environment.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let file_config = match config_path {
            Some(path_str) => read_file_config(Path::new(path_str))?,
            None => PartialServerConfig::default(),
        };
        let env_config: PartialServerConfig = envy::from_env()?;
        let legacy_env: LegacyEnv = envy::from_env()?;

        let config = Self::merge(env_config, legacy_env, file_config);
        config.validate()?;
        Ok(config)
    }

    fn merge(env: PartialServerConfig, legacy: LegacyEnv, file: PartialServerConfig) -> Self {
        let defaults = ServerConfig::default();
        ServerConfig {
            listen_address: env.listen_address.or(file.listen_address)
                .unwrap_or(defaults.listen_address),
            data_dir: env.data_dir.or(file.data_dir)
                .unwrap_or(defaults.data_dir),
            state_file: env.state_file.or(file.state_file)
                .unwrap_or(defaults.state_file),
            log_dir: env.log_dir.or(file.log_dir)
                .unwrap_or(defaults.log_dir),
            poll_interval_seconds: env.poll_interval_seconds.or(file.poll_interval_seconds)
                .unwrap_or(defaults.poll_interval_seconds),
            router_host: env.router_host.or(legacy.asus_host).or(file.router_host)
                .unwrap_or(defaults.router_host),
            router_port: env.router_port.or(file.router_port)
                .unwrap_or(defaults.router_port),
            router_username: env.router_username.or(legacy.asus_user).or(file.router_username)
                .unwrap_or(defaults.router_username),
            router_password: env.router_password.or(legacy.asus_pass).or(file.router_password)
                .filter(|password| !password.is_empty()),
            router_command: env.router_command.or(file.router_command)
                .unwrap_or(defaults.router_command),
            router_timeout_seconds: env.router_timeout_seconds.or(file.router_timeout_seconds)
                .unwrap_or(defaults.router_timeout_seconds),
            wan_interfaces: env.wan_interfaces.or(file.wan_interfaces)
                .unwrap_or(defaults.wan_interfaces),
            rx_field: env.rx_field.or(file.rx_field)
                .unwrap_or(defaults.rx_field),
            tx_field: env.tx_field.or(file.tx_field)
                .unwrap_or(defaults.tx_field),
            dish_host: env.dish_host.or(legacy.starlink_host).or(file.dish_host)
                .unwrap_or(defaults.dish_host),
            dish_path: env.dish_path.or(file.dish_path)
                .unwrap_or(defaults.dish_path),
            dish_timeout_seconds: env.dish_timeout_seconds.or(file.dish_timeout_seconds)
                .unwrap_or(defaults.dish_timeout_seconds),
            system_stats: env.system_stats.or(file.system_stats)
                .unwrap_or(defaults.system_stats),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_seconds == 0 {
            return Err(ConfigError::Invalid("poll_interval_seconds must be greater than 0".to_string()));
        }
        if self.router_timeout_seconds == 0 || self.dish_timeout_seconds == 0 {
            return Err(ConfigError::Invalid("timeouts must be greater than 0".to_string()));
        }
        if self.wan_interfaces.iter().all(|name| name.trim().is_empty()) {
            return Err(ConfigError::Invalid("wan_interfaces must name at least one interface".to_string()));
        }
        if self.rx_field == 0 || self.tx_field == 0 {
            return Err(ConfigError::Invalid(
                "rx_field and tx_field count from 1; position 0 is the interface label".to_string(),
            ));
        }
        if self.rx_field == self.tx_field {
            return Err(ConfigError::Invalid("rx_field and tx_field must differ".to_string()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn state_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.state_file)
    }

    pub fn interface_layout(&self) -> InterfaceStatsLayout {
        InterfaceStatsLayout {
            interfaces: self
                .wan_interfaces
                .iter()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect(),
            rx_field: self.rx_field,
            tx_field: self.tx_field,
        }
    }

    pub fn dish_url(&self) -> String {
        let path = if self.dish_path.starts_with('/') {
            self.dish_path.clone()
        } else {
            format!("/{}", self.dish_path)
        };
        format!("http://{}{}", self.dish_host, path)
    }
}

fn read_file_config(path: &Path) -> Result<PartialServerConfig, ConfigError> {
    if !path.exists() {
        return Ok(PartialServerConfig::default());
    }
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
