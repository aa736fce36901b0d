//! Runtime configuration, loaded from `~/.freeslot/config.json`.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::locale::WeekdayLocale;
use crate::schedule::MAX_HORIZON_DAYS;
use crate::services::ScheduleSettings;

/// Env var overriding the config file location.
pub const CONFIG_ENV: &str = "FREESLOT_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// IANA zone free slots are expressed in
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Language tag for weekday labels
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Defaults to `<config dir>/google/token.json`
    #[serde(default)]
    pub token_path: Option<PathBuf>,
    /// Defaults to `<config dir>/google/credentials.json`
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,
    /// Open the browser for consent when no token is stored
    #[serde(default = "default_true")]
    pub interactive_auth: bool,
    #[serde(default = "default_true")]
    pub save_token: bool,
}

fn default_timezone() -> String {
    "Europe/Warsaw".to_string()
}

fn default_locale() -> String {
    "pl-PL".to_string()
}

fn default_calendar_id() -> String {
    "primary".to_string()
}

fn default_horizon_days() -> u32 {
    crate::schedule::HORIZON_DAYS
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            locale: default_locale(),
            calendar_id: default_calendar_id(),
            horizon_days: default_horizon_days(),
            bind_address: default_bind_address(),
            port: default_port(),
            token_path: None,
            credentials_path: None,
            interactive_auth: true,
            save_token: true,
        }
    }
}

impl Config {
    /// Resolve zone and locale names into the settings the service runs with.
    pub fn settings(&self) -> Result<ScheduleSettings, String> {
        let timezone = self
            .timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| format!("Unknown timezone: {}", self.timezone))?;
        let locale = self.locale.parse::<WeekdayLocale>()?;
        if !(1..=MAX_HORIZON_DAYS).contains(&self.horizon_days) {
            return Err(format!(
                "horizonDays must be between 1 and {}, got {}",
                MAX_HORIZON_DAYS, self.horizon_days
            ));
        }
        Ok(ScheduleSettings {
            timezone,
            locale,
            horizon_days: self.horizon_days,
        })
    }

    pub fn token_path(&self, config_dir: &Path) -> PathBuf {
        self.token_path
            .clone()
            .unwrap_or_else(|| config_dir.join("google").join("token.json"))
    }

    pub fn credentials_path(&self, config_dir: &Path) -> PathBuf {
        self.credentials_path
            .clone()
            .unwrap_or_else(|| config_dir.join("google").join("credentials.json"))
    }

    pub fn bind_addr(&self, port_override: Option<u16>) -> Result<SocketAddr, String> {
        let port = port_override.unwrap_or(self.port);
        format!("{}:{}", self.bind_address, port)
            .parse()
            .map_err(|e| format!("Invalid bind address {}:{}: {}", self.bind_address, port, e))
    }
}

/// The config directory (`~/.freeslot`)
pub fn config_dir() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or("Could not find home directory")?;
    Ok(home.join(".freeslot"))
}

/// Explicit path, then `$FREESLOT_CONFIG`, then `~/.freeslot/config.json`.
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf, String> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    Ok(config_dir()?.join("config.json"))
}

/// Load configuration. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<Config, String> {
    if !path.exists() {
        log::debug!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path).map_err(|e| format!("Failed to read config: {}", e))?;
    let config: Config =
        serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))?;
    log::debug!("Loaded config from {}", path.display());
    Ok(config)
}
