use crate::chart::{ChannelSelection, DEFAULT_MAX_POINTS};
use dirs_next::config_dir;
use log::debug;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "BCI_PANEL_CONFIG";
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5001";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// `channels = "all"` or `channels = ["C3", "Cz", "C4"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelsSetting {
    Keyword(String),
    List(Vec<String>),
}

impl Default for ChannelsSetting {
    fn default() -> Self {
        ChannelsSetting::Keyword("all".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub backend_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub batch_timeout_secs: u64,
    pub max_chart_points: usize,
    pub channels: ChannelsSetting,
    pub discard_stale_responses: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            batch_timeout_secs: 600,
            max_chart_points: DEFAULT_MAX_POINTS,
            channels: ChannelsSetting::default(),
            discard_stale_responses: false,
        }
    }
}

impl PanelConfig {
    /// Explicit path, then `$BCI_PANEL_CONFIG`, then the per-user config file if present.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = env::var_os(CONFIG_ENV).map(PathBuf::from);
        match resolve_path(explicit, env_path, default_path()) {
            Some(path) => Self::from_file(&path),
            None => {
                debug!("no config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.backend_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "backend_url must be an http(s) URL, got '{}'",
                self.backend_url
            )));
        }
        if self.connect_timeout_secs == 0
            || self.request_timeout_secs == 0
            || self.batch_timeout_secs == 0
        {
            return Err(ConfigError::Invalid("timeouts must be positive".into()));
        }
        if self.max_chart_points < 2 {
            return Err(ConfigError::Invalid(
                "max_chart_points must be at least 2".into(),
            ));
        }
        if let ChannelsSetting::Keyword(word) = &self.channels {
            if !word.eq_ignore_ascii_case("all") {
                return Err(ConfigError::Invalid(format!(
                    "channels must be \"all\" or a list of names, got '{word}'"
                )));
            }
        }
        Ok(())
    }

    pub fn channel_selection(&self) -> ChannelSelection {
        match &self.channels {
            ChannelsSetting::Keyword(_) => ChannelSelection::All,
            ChannelsSetting::List(names) => ChannelSelection::from_names(Some(names.clone())),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs)
    }
}

pub fn default_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("bci-panel").join("config.toml"))
}

fn resolve_path(
    explicit: Option<&Path>,
    env_path: Option<PathBuf>,
    default: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env_path.filter(|path| !path.as_os_str().is_empty()) {
        return Some(path);
    }
    default.filter(|path| path.is_file())
}
