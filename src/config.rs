use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DATA_DIR_KEY: &str = "DASHBOARD_DATA_DIR";
pub const HOST_KEY: &str = "DASHBOARD_HOST";
pub const PORT_KEY: &str = "DASHBOARD_PORT";
pub const MARKET_DATA_BASE_URL_KEY: &str = "MARKET_DATA_BASE_URL";
pub const MARKET_DATA_TIMEOUT_KEY: &str = "MARKET_DATA_TIMEOUT_SECS";

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8501;
const DEFAULT_MARKET_DATA_BASE_URL: &str = "https://query1.finance.yahoo.com";
const DEFAULT_MARKET_DATA_TIMEOUT_SECS: u64 = 30;

const MARKET_SNAPSHOT_FILE: &str = "market_snapshot.json";
const MARKET_INSTRUMENTS_FILE: &str = "market_instruments.json";
const MACRO_RELEASES_FILE: &str = "macro_releases.json";
const EVENTS_FILE: &str = "events.json";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Setting {key} must be an integer (value: {value})")]
    NotAnInteger { key: String, value: String },
    #[error("Setting {key} must be >= {min} (value: {value})")]
    BelowMinimum { key: String, min: u64, value: String },
    #[error("Setting {key} must be <= {max} (value: {value})")]
    AboveMaximum { key: String, max: u64, value: String },
    #[error("Setting {key} must be an http(s) URL (value: {value})")]
    InvalidUrl { key: String, value: String },
}

/// Runtime settings shared by the updater and the dashboard server.
#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub market_data_base_url: String,
    pub market_data_timeout: Duration,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            market_data_base_url: DEFAULT_MARKET_DATA_BASE_URL.to_string(),
            market_data_timeout: Duration::from_secs(DEFAULT_MARKET_DATA_TIMEOUT_SECS),
        }
    }
}

impl DashboardSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        let settings: HashMap<String, String> = std::env::vars().collect();
        Self::from_settings_map(&settings)
    }

    pub fn from_settings_map(settings: &HashMap<String, String>) -> Result<Self, SettingsError> {
        let defaults = Self::default();

        let data_dir = optional_setting(settings, DATA_DIR_KEY)
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let host = optional_setting(settings, HOST_KEY)
            .map(str::to_string)
            .unwrap_or(defaults.host);
        let port = match optional_setting(settings, PORT_KEY) {
            Some(_) => setting_u64(settings, PORT_KEY, 1, u16::MAX as u64)? as u16,
            None => defaults.port,
        };
        let market_data_base_url = match optional_setting(settings, MARKET_DATA_BASE_URL_KEY) {
            Some(raw) => normalize_base_url(MARKET_DATA_BASE_URL_KEY, raw)?,
            None => defaults.market_data_base_url,
        };
        let market_data_timeout = match optional_setting(settings, MARKET_DATA_TIMEOUT_KEY) {
            Some(_) => Duration::from_secs(setting_u64(
                settings,
                MARKET_DATA_TIMEOUT_KEY,
                1,
                u64::MAX,
            )?),
            None => defaults.market_data_timeout,
        };

        Ok(Self {
            data_dir,
            host,
            port,
            market_data_base_url,
            market_data_timeout,
        })
    }

    pub fn with_data_dir(mut self, data_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        self
    }

    pub fn paths(&self) -> DataPaths {
        DataPaths::new(&self.data_dir)
    }
}

/// Well-known data files, all rooted at the data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub data_dir: PathBuf,
    pub market_snapshot: PathBuf,
    pub market_instruments: PathBuf,
    pub macro_releases: PathBuf,
    pub events: PathBuf,
}

impl DataPaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            market_snapshot: data_dir.join(MARKET_SNAPSHOT_FILE),
            market_instruments: data_dir.join(MARKET_INSTRUMENTS_FILE),
            macro_releases: data_dir.join(MACRO_RELEASES_FILE),
            events: data_dir.join(EVENTS_FILE),
            data_dir,
        }
    }
}

fn optional_setting<'a>(settings: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    settings
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn setting_u64(
    settings: &HashMap<String, String>,
    key: &str,
    min: u64,
    max: u64,
) -> Result<u64, SettingsError> {
    let raw = optional_setting(settings, key).unwrap_or_default();
    let value = raw
        .parse::<u64>()
        .map_err(|_| SettingsError::NotAnInteger {
            key: key.to_string(),
            value: raw.to_string(),
        })?;
    if value < min {
        return Err(SettingsError::BelowMinimum {
            key: key.to_string(),
            min,
            value: raw.to_string(),
        });
    }
    if value > max {
        return Err(SettingsError::AboveMaximum {
            key: key.to_string(),
            max,
            value: raw.to_string(),
        });
    }
    Ok(value)
}

fn normalize_base_url(key: &str, raw: &str) -> Result<String, SettingsError> {
    let lower = raw.to_ascii_lowercase();
    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        return Err(SettingsError::InvalidUrl {
            key: key.to_string(),
            value: raw.to_string(),
        });
    }
    Ok(raw.trim_end_matches('/').to_string())
}
